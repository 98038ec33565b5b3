//! 反射型XSS：载荷原样出现在 text/html 响应中

use async_trait::async_trait;

use super::{Payload, check_requests};
use crate::error::RwsResult;
use crate::http::HttpResponse;
use crate::modules::{Finding, Probe, ScanContext};
use crate::sitemap::SiteMap;

const PAYLOADS: &[&str] = &[
    "<script>alert(1)</script>",
    "\"><svg onload=alert(1)>",
    "'><img src=x onerror=alert(1)>",
    "<details open ontoggle=alert(1)>",
];

pub struct CrossSiteScripting;

fn reflected(response: &HttpResponse, payload: &Payload) -> bool {
    response.media_type().as_deref() == Some("text/html")
        && response.text_lossy().contains(payload.value.as_str())
}

#[async_trait]
impl Probe for CrossSiteScripting {
    fn name(&self) -> &str {
        "xss"
    }

    async fn run(&self, ctx: &ScanContext, sitemap: &SiteMap) -> RwsResult<Vec<Finding>> {
        let payloads: Vec<Payload> = PAYLOADS.iter().map(|p| Payload::new(*p)).collect();
        Ok(check_requests(ctx, sitemap, "XSS", &payloads, reflected).await)
    }
}
