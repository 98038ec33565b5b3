//! 内置漏洞探测模块：对站点地图中的每个参数逐一注入载荷并检查响应

pub mod command_injection;
pub mod lfi;
pub mod sqli;
pub mod ssti;
pub mod xss;

pub use self::command_injection::CommandInjection;
pub use self::lfi::LocalFileInclusion;
pub use self::sqli::SqlInjection;
pub use self::ssti::TemplateInjection;
pub use self::xss::CrossSiteScripting;

use futures::stream::{self, StreamExt};
use reqwest::Method;
use tracing::debug;

use super::{Finding, ModuleRegistry, Probe, ScanContext};
use crate::error::RwsResult;
use crate::http::{HttpResponse, RequestOptions};
use crate::sitemap::{ProbeRequest, SiteMap};

/// 单个模块内同时在途的请求数（全局速率仍由执行器限制）
const CONCURRENCY: usize = 16;

/// 注入载荷及其命中标记
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub value: String,
    /// 响应中出现任一标记即视为命中；为空时由判定函数自行处理
    pub markers: Vec<String>,
}

impl Payload {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            markers: Vec::new(),
        }
    }

    pub fn with_markers<S: AsRef<str>>(value: impl Into<String>, markers: &[S]) -> Self {
        Self {
            value: value.into(),
            markers: markers.iter().map(|m| m.as_ref().to_string()).collect(),
        }
    }

    /// 文本中是否出现任一标记
    pub fn matches(&self, text: &str) -> bool {
        self.markers.iter().any(|marker| text.contains(marker.as_str()))
    }
}

/// 发送替换了目标参数的请求：POST 走表单，其余走查询串
pub async fn send_mutation(ctx: &ScanContext, request: &ProbeRequest, payload: &str) -> RwsResult<HttpResponse> {
    let url = ctx.resolve(&request.path)?;
    let params = request.with_payload(payload);
    let options = if request.method == Method::POST {
        RequestOptions::new().form(params)
    } else {
        RequestOptions::new().query(params)
    };
    ctx.executor.execute(request.method.clone(), url.as_str(), &options).await
}

/// 对 (请求模板 x 载荷) 的全部组合发送请求
///
/// `confirms` 判定命中时记录 `kind` 类型的发现；未命中但状态码 >= 500 时记录 `ERROR`。
/// 单个请求失败只记日志。
pub async fn check_requests<F>(
    ctx: &ScanContext,
    sitemap: &SiteMap,
    kind: &str,
    payloads: &[Payload],
    confirms: F,
) -> Vec<Finding>
where
    F: Fn(&HttpResponse, &Payload) -> bool + Sync,
{
    let requests: Vec<ProbeRequest> = sitemap.probe_requests(ctx.config.fill).collect();
    let confirms = &confirms;
    let mut checks = Vec::with_capacity(requests.len() * payloads.len());
    for request in &requests {
        for payload in payloads {
            checks.push(async move {
                let response = match send_mutation(ctx, request, &payload.value).await {
                    Ok(response) => response,
                    Err(e) => {
                        debug!("{} 检查请求失败：{} {}，错误：{}", kind, request.method, request.path, e);
                        return None;
                    }
                };

                let kind = if confirms(&response, payload) {
                    kind.to_string()
                } else if response.status >= 500 {
                    "ERROR".to_string()
                } else {
                    return None;
                };
                let status = (kind == "ERROR").then_some(response.status);

                Some(Finding {
                    kind,
                    method: request.method.to_string(),
                    path: request.path.clone(),
                    param: Some(request.target.clone()),
                    payload: Some(payload.value.clone()),
                    status,
                })
            });
        }
    }

    stream::iter(checks)
        .buffer_unordered(CONCURRENCY)
        .filter_map(|finding| async move { finding })
        .collect()
        .await
}

/// 注册全部内置探测模块
pub fn default_probes() -> ModuleRegistry<dyn Probe> {
    ModuleRegistry::<dyn Probe>::new()
        .with("xss", || Box::new(CrossSiteScripting))
        .with("sqli", || Box::new(SqlInjection))
        .with("ssti", || Box::new(TemplateInjection::new()))
        .with("lfi", || Box::new(LocalFileInclusion))
        .with("command-injection", || Box::new(CommandInjection))
}
