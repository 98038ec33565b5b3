//! 服务端模板注入：提交 x*x 表达式，检查响应中是否出现乘积

use async_trait::async_trait;
use rand::Rng;

use super::{Payload, check_requests};
use crate::error::RwsResult;
use crate::http::HttpResponse;
use crate::modules::{Finding, Probe, ScanContext};
use crate::sitemap::SiteMap;

// x 会被替换为随机数
const TEMPLATES: &[&str] = &[
    "{{x*x}}",
    "${x*x}",
    "<%= x*x %>",
    "#{x*x}",
    "{x*x}",
    "[[${x*x}]]",
];

pub struct TemplateInjection {
    num: u64,
}

impl TemplateInjection {
    pub fn new() -> Self {
        Self::with_number(rand::thread_rng().gen_range(1_000..100_000))
    }

    pub fn with_number(num: u64) -> Self {
        Self { num }
    }

    /// 载荷及其期望的乘积标记
    pub fn payloads(&self) -> Vec<Payload> {
        let num = self.num.to_string();
        let product = (self.num * self.num).to_string();
        TEMPLATES
            .iter()
            .map(|template| Payload::with_markers(template.replace('x', &num), &[product.as_str()]))
            .collect()
    }
}

impl Default for TemplateInjection {
    fn default() -> Self {
        Self::new()
    }
}

fn evaluated(response: &HttpResponse, payload: &Payload) -> bool {
    payload.matches(&response.text_lossy())
}

#[async_trait]
impl Probe for TemplateInjection {
    fn name(&self) -> &str {
        "ssti"
    }

    async fn run(&self, ctx: &ScanContext, sitemap: &SiteMap) -> RwsResult<Vec<Finding>> {
        Ok(check_requests(ctx, sitemap, "SSTI", &self.payloads(), evaluated).await)
    }
}
