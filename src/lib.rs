//! rswebscan - 网站侦察引擎：带重试与限速的HTTP执行层、并发爬虫、技术栈识别

// 导出全局错误类型
pub use self::error::{NetworkErrorKind, RswebscanError, RwsResult};

// 导出配置模块
pub use self::config::{BasicAuth, ScanConfig, ScanConfigBuilder, DEFAULT_USER_AGENT};

// 导出HTTP执行层
pub use self::http::{HttpResponse, Method, SetCookie, RateLimiter, RequestExecutor, RequestOptions, RetryPolicy};

// 导出站点地图与探测请求
pub use self::sitemap::{fill_param, Directory, DirectoryExport, ParamSet, ParamValues, ProbeRequest, SiteMap};

// 导出爬虫与提取器
pub use self::crawler::{ContentScanner, CrawlReport, Crawler};
pub use self::extractor::{HtmlExtractor, PageDocument, ParsedForm};

// 导出规则模块核心接口
pub use self::rule::{CategoryRule, RuleCacheManager, RuleLoader, StringList, TechnologyDatabase, TechnologySpec};

// 导出编译模块核心接口
pub use self::compiler::{CompiledDatabase, CompiledPattern, CompiledTechnology, RuleCompiler};

// 导出工具模块核心接口
pub use self::utils::{DetectionEntry, DetectionUpdater, HeaderConverter, VersionExtractor};

// 导出检测模块核心接口
pub use self::detector::{DetectedTechnology, TechDetector, TechnologyReport};

// 导出扩展模块与扫描编排
pub use self::modules::{
    default_info_modules, default_probes, probe_enabled, technology_detected, Finding, InfoModule, ModuleRegistry,
    Probe, ScanContext,
};
pub use self::scanner::{ScanReport, Scanner};

// 声明所有子模块
pub mod error;
pub mod config;
pub mod http;
pub mod sitemap;
pub mod extractor;
pub mod crawler;
pub mod rule;
pub mod compiler;
pub mod utils;
pub mod detector;
pub mod modules;
pub mod scanner;
