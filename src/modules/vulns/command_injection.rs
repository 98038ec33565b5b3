//! 命令注入：拼接 shell 命令，检查输出特征

use async_trait::async_trait;

use super::{Payload, check_requests};
use crate::error::RwsResult;
use crate::http::HttpResponse;
use crate::modules::{Finding, Probe, ScanContext};
use crate::sitemap::SiteMap;

const PAYLOADS: &[(&str, &[&str])] = &[
    (";cat /etc/passwd", &["root:x:0:0"]),
    ("|cat /etc/passwd", &["root:x:0:0"]),
    (";id", &[") gid="]),
    ("|id", &[") gid="]),
    ("$(id)", &[") gid="]),
    ("`id`", &[") gid="]),
    ("& type C:\\windows\\win.ini", &["[fonts]"]),
];

pub struct CommandInjection;

fn executed(response: &HttpResponse, payload: &Payload) -> bool {
    payload.matches(&response.text_lossy())
}

#[async_trait]
impl Probe for CommandInjection {
    fn name(&self) -> &str {
        "command-injection"
    }

    async fn run(&self, ctx: &ScanContext, sitemap: &SiteMap) -> RwsResult<Vec<Finding>> {
        let payloads: Vec<Payload> = PAYLOADS
            .iter()
            .map(|(value, markers)| Payload::with_markers(*value, *markers))
            .collect();
        Ok(check_requests(ctx, sitemap, "Command Injection", &payloads, executed).await)
    }
}
