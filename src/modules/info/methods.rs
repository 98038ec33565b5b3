//! 支持的HTTP方法探测

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::error::RwsResult;
use crate::http::RequestOptions;
use crate::modules::{InfoModule, ScanContext};

const METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
];

pub struct HttpMethods;

#[async_trait]
impl InfoModule for HttpMethods {
    fn name(&self) -> &str {
        "methods"
    }

    async fn run(&self, ctx: &ScanContext) -> RwsResult<Option<Value>> {
        let url = ctx.config.url.as_str();
        let options = RequestOptions::new();

        let checks = METHODS.into_iter().map(|method| {
            let options = &options;
            async move {
                match ctx.executor.execute(method.clone(), url, options).await {
                    Ok(response) if !matches!(response.status, 405 | 501) => {
                        Some(method.as_str().to_ascii_lowercase())
                    }
                    Ok(_) => None,
                    Err(e) => {
                        debug!("方法探测失败：{} {}，错误：{}", method, url, e);
                        None
                    }
                }
            }
        });

        let allowed: Vec<String> = join_all(checks).await.into_iter().flatten().collect();
        Ok(Some(Value::from(allowed)))
    }
}
