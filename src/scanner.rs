//! 扫描编排：爬虫、技术识别、信息模块并发运行；技术专属模块在识别完成后运行，最后按技术门控运行探测模块

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ScanConfig;
use crate::crawler::{CrawlReport, Crawler};
use crate::detector::{TechDetector, TechnologyReport};
use crate::error::RwsResult;
use crate::http::RequestExecutor;
use crate::modules::{probe_enabled, technology_detected, Finding, InfoModule, Probe, ScanContext};
use crate::rule::TechnologyDatabase;
use crate::sitemap::SiteMap;

/// 扫描报告
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub crawler: CrawlReport,
    pub technology: TechnologyReport,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub info: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<Finding>,
}

/// 扫描器
pub struct Scanner {
    context: ScanContext,
    detector: TechDetector,
    info_modules: Vec<Box<dyn InfoModule>>,
    probes: Vec<Box<dyn Probe>>,
}

impl Scanner {
    /// 校验配置并创建共享的请求执行器，任何网络活动之前失败
    pub fn new(
        config: ScanConfig,
        database: Arc<TechnologyDatabase>,
        info_modules: Vec<Box<dyn InfoModule>>,
        probes: Vec<Box<dyn Probe>>,
    ) -> RwsResult<Self> {
        config.validate()?;
        let executor = Arc::new(RequestExecutor::new(&config)?);
        let detector = TechDetector::new(database, config.confidence_threshold);

        Ok(Self {
            context: ScanContext::new(Arc::new(config), executor),
            detector,
            info_modules,
            probes,
        })
    }

    pub fn context(&self) -> &ScanContext {
        &self.context
    }

    /// 执行完整扫描；单个组件失败只会让对应部分为空
    pub async fn run(&self) -> ScanReport {
        let crawler = Crawler::new(Arc::clone(&self.context.executor), &self.context.config);

        let (crawler, (technology, gated), mut info) = tokio::join!(
            crawler.run(),
            async {
                let technology = self.detect_technology().await;
                let gated = self.run_info_modules(Some(&technology)).await;
                (technology, gated)
            },
            self.run_info_modules(None),
        );
        info.extend(gated);

        let vulnerabilities = if self.context.config.probe {
            self.run_probes(&crawler.sitemap, &technology).await
        } else {
            Vec::new()
        };

        info!(
            "扫描完成：{} 个路径，{} 个技术分类，{} 个发现",
            crawler.sitemap.len(),
            technology.len(),
            vulnerabilities.len()
        );

        ScanReport {
            crawler,
            technology,
            info,
            vulnerabilities,
        }
    }

    async fn detect_technology(&self) -> TechnologyReport {
        let url = self.context.config.url.as_str();
        match self.detector.detect(&self.context.executor, url).await {
            Ok(report) => report,
            Err(e) => {
                warn!("技术检测失败：{}，错误：{}", url, e);
                TechnologyReport::new()
            }
        }
    }

    /// `technology` 为 None 时运行通用模块，否则运行已检测到对应技术的专属模块
    async fn run_info_modules(&self, technology: Option<&TechnologyReport>) -> BTreeMap<String, Value> {
        let selected = self.info_modules.iter().filter(|module| match technology {
            None => module.technology().is_none(),
            Some(report) => module.technology().is_some() && technology_detected(module.technology(), report),
        });

        let runs = selected.map(|module| async move {
            match module.run(&self.context).await {
                Ok(Some(value)) if has_content(&value) => Some((module.name().to_string(), value)),
                Ok(_) => None,
                Err(e) => {
                    warn!("信息模块 {} 执行失败：{}", module.name(), e);
                    None
                }
            }
        });

        join_all(runs).await.into_iter().flatten().collect()
    }

    async fn run_probes(&self, sitemap: &SiteMap, technology: &TechnologyReport) -> Vec<Finding> {
        let runs = self
            .probes
            .iter()
            .filter(|&probe| probe_enabled(&**probe, technology))
            .map(|probe| async move {
                match probe.run(&self.context, sitemap).await {
                    Ok(findings) => findings,
                    Err(e) => {
                        warn!("探测模块 {} 执行失败：{}", probe.name(), e);
                        Vec::new()
                    }
                }
            });

        join_all(runs).await.into_iter().flatten().collect()
    }
}

/// 空对象、空数组和 null 不计入报告
fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
