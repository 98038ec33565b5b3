//! 首页 Set-Cookie 的 Secure / HttpOnly 标志

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RwsResult;
use crate::http::SetCookie;
use crate::modules::{InfoModule, ScanContext};

pub struct CookieFlags;

#[async_trait]
impl InfoModule for CookieFlags {
    fn name(&self) -> &str {
        "cookies"
    }

    async fn run(&self, ctx: &ScanContext) -> RwsResult<Option<Value>> {
        let response = ctx.executor.get(ctx.config.url.as_str()).await?;
        let cookies: BTreeMap<String, SetCookie> = response
            .set_cookies()
            .into_iter()
            .map(|cookie| (cookie.name.clone(), cookie))
            .collect();

        if cookies.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_value(cookies)?))
    }
}
