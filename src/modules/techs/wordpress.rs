//! WordPress：版本、插件、XML-RPC、作者枚举

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::page_references;
use crate::error::RwsResult;
use crate::extractor::{HtmlExtractor, PageDocument};
use crate::modules::{InfoModule, ScanContext};

static GENERATOR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)wordpress(?: ([\d.]+))?").unwrap());

const PLUGIN_PREFIX: &str = "/wp-content/plugins/";

#[derive(Debug, Serialize)]
struct WordPressReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    plugins: BTreeMap<String, String>,
    #[serde(rename = "xml-rpc")]
    xml_rpc: &'static str,
    users: BTreeMap<u32, String>,
}

/// generator 中的版本号
pub fn generator_version(document: &PageDocument) -> Option<String> {
    document
        .meta_tags
        .iter()
        .filter(|(name, _)| name == "generator")
        .find_map(|(_, content)| GENERATOR_REGEX.captures(content))
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

/// 插件名 -> 版本（`ver` 查询参数）；先出现的空版本会被后出现的非空版本替换
pub fn plugins(references: &[Url]) -> BTreeMap<String, String> {
    let mut plugins = BTreeMap::new();
    for url in references {
        let Some(rest) = url.path().strip_prefix(PLUGIN_PREFIX) else {
            continue;
        };
        let Some(name) = rest.split('/').next().filter(|n| !n.is_empty()) else {
            continue;
        };
        let version = url
            .query_pairs()
            .find(|(key, _)| key == "ver")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        let entry = plugins.entry(name.to_string()).or_insert_with(String::new);
        if entry.is_empty() {
            *entry = version;
        }
    }
    plugins
}

/// 作者页标题去掉站点名后缀
fn author_name(title: &str) -> &str {
    title.rsplit_once(" \u{2013} ").map_or(title, |(name, _)| name).trim()
}

pub struct WordPress;

impl WordPress {
    async fn xml_rpc(ctx: &ScanContext) -> &'static str {
        let Ok(url) = ctx.resolve("/xmlrpc.php") else {
            return "disabled";
        };
        match ctx.executor.get(url.as_str()).await {
            // GET 请求会被 XML-RPC 服务以 405 拒绝
            Ok(response) if response.status == 405 => "enabled",
            Ok(_) => "disabled",
            Err(e) => {
                debug!("xmlrpc.php 请求失败：{}", e);
                "disabled"
            }
        }
    }

    async fn author(ctx: &ScanContext, id: u32) -> Option<(u32, String)> {
        let url = ctx.resolve(&format!("/?author={}", id)).ok()?;
        let response = match ctx.executor.get(url.as_str()).await {
            Ok(response) => response,
            Err(e) => {
                debug!("作者枚举失败：{}，错误：{}", url, e);
                return None;
            }
        };
        if !(response.status == 200 || (300..400).contains(&response.status)) {
            return None;
        }

        let title = HtmlExtractor::extract(&response.text_lossy()).title?;
        let name = author_name(&title);
        (!name.is_empty()).then(|| (id, name.to_string()))
    }
}

#[async_trait]
impl InfoModule for WordPress {
    fn name(&self) -> &str {
        "wordpress"
    }

    fn technology(&self) -> Option<&str> {
        Some("WordPress")
    }

    async fn run(&self, ctx: &ScanContext) -> RwsResult<Option<Value>> {
        let response = ctx.executor.get(ctx.config.url.as_str()).await?;
        let document = HtmlExtractor::extract(&response.text_lossy());
        let references = page_references(&response.url, &document);

        let authors = ctx.config.wordpress_user_ids.iter().map(|&id| Self::author(ctx, id));
        let (xml_rpc, users) = tokio::join!(Self::xml_rpc(ctx), join_all(authors));

        let report = WordPressReport {
            version: generator_version(&document),
            plugins: plugins(&references),
            xml_rpc,
            users: users.into_iter().flatten().collect(),
        };
        Ok(Some(serde_json::to_value(report)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_version() {
        let document = HtmlExtractor::extract(r#"<meta name="generator" content="WordPress 6.4.2">"#);
        assert_eq!(generator_version(&document).as_deref(), Some("6.4.2"));

        let document = HtmlExtractor::extract(r#"<meta name="generator" content="WordPress">"#);
        assert_eq!(generator_version(&document), None);
    }

    #[test]
    fn test_plugins_from_references() {
        let base = Url::parse("https://blog.example.com/").unwrap();
        let document = HtmlExtractor::extract(
            r#"
            <link rel="stylesheet" href="/wp-content/plugins/contact-form-7/style.css">
            <script src="/wp-content/plugins/contact-form-7/index.js?ver=5.8.4"></script>
            <script src="https://blog.example.com/wp-content/plugins/akismet/a.js?ver=5.3"></script>
            <img src="/wp-content/plugins/akismet/logo.png?ver=1.0">
            <a href="/wp-content/themes/twentytwenty/">theme</a>
            "#,
        );

        let found = plugins(&page_references(&base, &document));
        assert_eq!(found.len(), 2);
        assert_eq!(found["contact-form-7"], "5.8.4");
        assert_eq!(found["akismet"], "5.3");
    }

    #[test]
    fn test_author_name() {
        assert_eq!(author_name("admin \u{2013} My Blog"), "admin");
        assert_eq!(author_name("Jane \u{2013} Dev \u{2013} My Blog"), "Jane \u{2013} Dev");
        assert_eq!(author_name("editor"), "editor");
    }
}
