//! 请求执行器
//! 单次HTTP请求 + 有界重试 + 可选限速。
//! 任何收到的HTTP响应（包括4xx/5xx）都直接返回，只有拿不到响应时才重试。

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Proxy};
use tracing::{debug, warn};

use super::rate_limit::RateLimiter;
use super::response::HttpResponse;
use super::retry::RetryPolicy;
use crate::config::{BasicAuth, ScanConfig};
use crate::error::{NetworkErrorKind, RswebscanError, RwsResult};

/// 单次请求选项
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// 追加到URL的查询参数
    pub query: Vec<(String, String)>,
    /// 表单请求体（application/x-www-form-urlencoded）
    pub form: Option<Vec<(String, String)>>,
    pub follow_redirects: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            query: Vec::new(),
            form: None,
            follow_redirects: true,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn form(mut self, form: Vec<(String, String)>) -> Self {
        self.form = Some(form);
        self
    }

    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }
}

/// 请求执行器（爬虫、技术识别、探测模块共享同一实例）
#[derive(Debug)]
pub struct RequestExecutor {
    client: Client,
    no_redirect_client: Client,
    retry_policy: RetryPolicy,
    limiter: Option<RateLimiter>,
    auth: Option<BasicAuth>,
}

impl RequestExecutor {
    /// 按扫描配置创建执行器
    pub fn new(config: &ScanConfig) -> RwsResult<Self> {
        let limiter = config.rate_limit.map(RateLimiter::new).transpose()?;

        Ok(Self {
            client: Self::build_client(config, Policy::default())?,
            no_redirect_client: Self::build_client(config, Policy::none())?,
            retry_policy: config.retry_policy.clone(),
            limiter,
            auth: config.auth.clone(),
        })
    }

    fn build_client(config: &ScanConfig, redirect: Policy) -> RwsResult<Client> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| RswebscanError::Config(format!("无效Header名称：{}，错误：{}", key, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| RswebscanError::Config(format!("无效Header值：{}，错误：{}", value, e)))?;
            headers.insert(header_name, header_value);
        }
        if let Some(cookie) = &config.cookie {
            let cookie_value = HeaderValue::from_str(cookie)
                .map_err(|e| RswebscanError::Config(format!("无效Cookie：{}，错误：{}", cookie, e)))?;
            headers.insert(COOKIE, cookie_value);
        }

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(redirect)
            .danger_accept_invalid_certs(true);

        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy.as_str())
                .map_err(|e| RswebscanError::Config(format!("代理地址无效：{}，错误：{}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| RswebscanError::Config(format!("HTTP客户端初始化失败：{}", e)))
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// 执行请求：最多尝试 `attempts + 1` 次，全部失败时返回最后一次的网络错误
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> RwsResult<HttpResponse> {
        let max_attempts = self.retry_policy.attempts().saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }

            match self.send_once(method.clone(), url, options, attempt).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_network() && attempt < max_attempts => {
                    let delay = self.retry_policy.delay(attempt - 1);
                    warn!(
                        "请求失败，{:?}后重试（{}/{}）：{} {}，错误：{}",
                        delay, attempt, max_attempts, method, url, e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// GET 请求（跟随重定向）
    pub async fn get(&self, url: &str) -> RwsResult<HttpResponse> {
        self.execute(Method::GET, url, &RequestOptions::default()).await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
        attempt: u32,
    ) -> RwsResult<HttpResponse> {
        let client = if options.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        let mut request = client.request(method, url);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(form) = &options.form {
            request = request.form(form);
        }
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::map_error(e, attempt, None))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(e, attempt, Some(NetworkErrorKind::Disconnected)))?;

        debug!("{} {} -> {}（{}字节）", url, final_url, status, body.len());

        Ok(HttpResponse {
            status,
            url: final_url,
            headers,
            body: body.to_vec(),
        })
    }

    /// 将reqwest错误归类：构造请求失败不可重试，其余都是瞬时网络错误
    fn map_error(e: reqwest::Error, attempt: u32, fallback: Option<NetworkErrorKind>) -> RswebscanError {
        if e.is_builder() {
            return RswebscanError::InvalidInput(format!("请求构造失败：{}", e));
        }

        let kind = if e.is_timeout() {
            NetworkErrorKind::Timeout
        } else if e.is_connect() {
            NetworkErrorKind::Connect
        } else if let Some(kind) = fallback {
            kind
        } else if e.is_body() || e.is_decode() {
            NetworkErrorKind::Disconnected
        } else {
            NetworkErrorKind::Transport
        };

        RswebscanError::Network {
            kind,
            attempt,
            message: e.to_string(),
        }
    }
}
