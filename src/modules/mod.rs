//! 扩展模块：信息收集模块与漏洞探测模块的接口、注册表和内置实现
pub mod registry;
pub mod info;
pub mod techs;
pub mod vulns;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::ScanConfig;
use crate::detector::TechnologyReport;
use crate::error::RwsResult;
use crate::http::RequestExecutor;
use crate::sitemap::SiteMap;

pub use self::info::default_info_modules;
pub use self::registry::{ModuleFactory, ModuleRegistry};
pub use self::vulns::default_probes;

/// 模块运行上下文（所有模块共享同一个请求执行器）
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub config: Arc<ScanConfig>,
    pub executor: Arc<RequestExecutor>,
}

impl ScanContext {
    pub fn new(config: Arc<ScanConfig>, executor: Arc<RequestExecutor>) -> Self {
        Self { config, executor }
    }

    /// 相对种子URL解析路径
    pub fn resolve(&self, path: &str) -> RwsResult<url::Url> {
        Ok(self.config.url.join(path)?)
    }
}

/// 信息收集模块
#[async_trait]
pub trait InfoModule: Send + Sync {
    fn name(&self) -> &str;

    /// 技术专属模块：仅在技术识别完成且检测到该技术后运行（不区分大小写）
    fn technology(&self) -> Option<&str> {
        None
    }

    /// 返回 None 表示没有可报告的信息
    async fn run(&self, ctx: &ScanContext) -> RwsResult<Option<Value>>;
}

/// 漏洞探测模块：消费爬取得到的站点地图
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &str;

    /// 仅当检测到该技术时运行（不区分大小写）
    fn technology(&self) -> Option<&str> {
        None
    }

    async fn run(&self, ctx: &ScanContext, sitemap: &SiteMap) -> RwsResult<Vec<Finding>>;
}

/// 技术门控：未声明技术时总是放行
pub fn technology_detected(required: Option<&str>, technologies: &TechnologyReport) -> bool {
    let Some(required) = required else {
        return true;
    };
    technologies
        .values()
        .flat_map(|techs| techs.keys())
        .any(|name| name.eq_ignore_ascii_case(required))
}

/// 探测模块是否应当运行
pub fn probe_enabled(probe: &dyn Probe, technologies: &TechnologyReport) -> bool {
    technology_detected(probe.technology(), technologies)
}

/// 探测发现
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: String,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}
