//! 扫描配置：调用方持有，所有组件只读

use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use crate::error::{RswebscanError, RwsResult};
use crate::http::RetryPolicy;

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("rswebscan/", env!("CARGO_PKG_VERSION"));

/// Basic 认证凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    /// 解析 `<username>:<password>` 形式的凭据
    pub fn parse(raw: &str) -> RwsResult<Self> {
        let (username, password) = raw
            .split_once(':')
            .ok_or_else(|| RswebscanError::Config(format!("认证格式应为 <username>:<password>：{}", raw)))?;
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// 扫描配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    // 种子URL
    pub url: Url,
    // 最大爬取深度（种子为第1层）
    pub max_depth: u32,
    // 忽略的路径（精确匹配）
    pub ignore_paths: Vec<String>,
    // 单次请求超时
    pub timeout: Duration,
    pub retry_policy: RetryPolicy,
    // 每秒请求数上限，None 表示不限速
    pub rate_limit: Option<u32>,
    // 技术识别置信度阈值（0-100）
    pub confidence_threshold: u8,
    pub headers: BTreeMap<String, String>,
    pub user_agent: String,
    pub cookie: Option<String>,
    pub auth: Option<BasicAuth>,
    pub proxy: Option<String>,
    // 探测请求是否填充参数值
    pub fill: bool,
    // 是否运行漏洞探测模块
    pub probe: bool,
    // 路径穿越载荷的最大 `../` 层数
    pub lfi_depth: u32,
    // WordPress 作者枚举使用的用户ID
    pub wordpress_user_ids: Vec<u32>,
}

impl ScanConfig {
    /// 以默认配置扫描指定URL
    pub fn new(url: &str) -> RwsResult<Self> {
        ScanConfigBuilder::new(url).build()
    }

    pub fn builder(url: &str) -> ScanConfigBuilder {
        ScanConfigBuilder::new(url)
    }

    /// 校验配置，任何组件启动前调用
    pub fn validate(&self) -> RwsResult<()> {
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(RswebscanError::Config(format!("不支持的协议：{}", self.url.scheme())));
        }
        if self.url.host_str().is_none() {
            return Err(RswebscanError::Config(format!("URL缺少主机名：{}", self.url)));
        }
        if self.confidence_threshold > 100 {
            return Err(RswebscanError::Config(format!(
                "置信度阈值必须在0-100之间：{}",
                self.confidence_threshold
            )));
        }
        if self.rate_limit == Some(0) {
            return Err(RswebscanError::Config("限速必须大于0".to_string()));
        }
        if let Some(proxy) = &self.proxy {
            Url::parse(proxy).map_err(|e| RswebscanError::Config(format!("代理地址无效：{}，错误：{}", proxy, e)))?;
        }
        Ok(())
    }
}

/// 配置构建器（链式调用）
#[derive(Debug, Clone)]
pub struct ScanConfigBuilder {
    url: String,
    max_depth: u32,
    ignore_paths: Vec<String>,
    timeout: Duration,
    retry_policy: RetryPolicy,
    rate_limit: Option<u32>,
    confidence_threshold: u8,
    headers: BTreeMap<String, String>,
    user_agent: String,
    cookie: Option<String>,
    auth: Option<BasicAuth>,
    proxy: Option<String>,
    fill: bool,
    probe: bool,
    lfi_depth: u32,
    wordpress_user_ids: Vec<u32>,
}

impl ScanConfigBuilder {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_depth: 3,
            ignore_paths: vec!["/logout".to_string()],
            timeout: Duration::from_secs(60),
            retry_policy: RetryPolicy::default(),
            rate_limit: None,
            confidence_threshold: 80,
            headers: BTreeMap::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie: None,
            auth: None,
            proxy: None,
            fill: true,
            probe: false,
            lfi_depth: 5,
            wordpress_user_ids: (1..20).collect(),
        }
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn ignore_paths(mut self, paths: Vec<String>) -> Self {
        self.ignore_paths = paths;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn rate_limit(mut self, rate: Option<u32>) -> Self {
        self.rate_limit = rate;
        self
    }

    pub fn confidence_threshold(mut self, threshold: u8) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// 追加自定义请求头（名称统一小写）
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        self
    }

    pub fn user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie.filter(|c| !c.is_empty());
        self
    }

    pub fn auth(mut self, auth: Option<BasicAuth>) -> Self {
        self.auth = auth;
        self
    }

    pub fn proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    pub fn probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    pub fn lfi_depth(mut self, depth: u32) -> Self {
        self.lfi_depth = depth;
        self
    }

    pub fn wordpress_user_ids(mut self, ids: Vec<u32>) -> Self {
        self.wordpress_user_ids = ids;
        self
    }

    pub fn build(self) -> RwsResult<ScanConfig> {
        let url = Url::parse(&self.url)
            .map_err(|e| RswebscanError::Config(format!("种子URL无效：{}，错误：{}", self.url, e)))?;

        let config = ScanConfig {
            url,
            max_depth: self.max_depth,
            ignore_paths: self.ignore_paths,
            timeout: self.timeout,
            retry_policy: self.retry_policy,
            rate_limit: self.rate_limit,
            confidence_threshold: self.confidence_threshold,
            headers: self.headers,
            user_agent: self.user_agent,
            cookie: self.cookie,
            auth: self.auth,
            proxy: self.proxy,
            fill: self.fill,
            probe: self.probe,
            lfi_depth: self.lfi_depth,
            wordpress_user_ids: self.wordpress_user_ids,
        };
        config.validate()?;
        Ok(config)
    }
}
