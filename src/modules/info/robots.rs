//! robots.txt 解析

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::RwsResult;
use crate::modules::{InfoModule, ScanContext};

/// robots.txt 中的指令
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RobotsRules {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disallow: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sitemap: Vec<String>,
}

impl RobotsRules {
    pub fn parse(text: &str) -> Self {
        let mut rules = Self::default();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(comment) = line.strip_prefix('#') {
                let comment = comment.trim_start_matches('#').trim();
                if !comment.is_empty() {
                    rules.comments.push(comment.to_string());
                }
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match directive.trim().to_ascii_lowercase().as_str() {
                "allow" => rules.allow.push(value),
                "disallow" => rules.disallow.push(value),
                "sitemap" => rules.sitemap.push(value),
                _ => {}
            }
        }

        rules
    }
}

pub struct RobotsTxt;

#[async_trait]
impl InfoModule for RobotsTxt {
    fn name(&self) -> &str {
        "robots.txt"
    }

    async fn run(&self, ctx: &ScanContext) -> RwsResult<Option<Value>> {
        let url = ctx.resolve("/robots.txt")?;
        let response = ctx.executor.get(url.as_str()).await?;
        if response.status != 200 {
            debug!("robots.txt 不可用：{}（{}）", url, response.status);
            return Ok(None);
        }

        let rules = RobotsRules::parse(&response.text_lossy());
        Ok(Some(serde_json::to_value(rules)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_robots() {
        let text = "# Main rules\nUser-agent: *\nDisallow: /admin/\nDISALLOW: /tmp\nAllow: /admin/public\n\n#\nSitemap: https://example.com/sitemap.xml\nCrawl-delay: 10\n";
        let rules = RobotsRules::parse(text);

        assert_eq!(rules.disallow, vec!["/admin/", "/tmp"]);
        assert_eq!(rules.allow, vec!["/admin/public"]);
        assert_eq!(rules.comments, vec!["Main rules"]);
        assert_eq!(rules.sitemap, vec!["https://example.com/sitemap.xml"]);
    }

    #[test]
    fn test_empty_lists_not_serialized() {
        let rules = RobotsRules::parse("Disallow: /private");
        assert_eq!(serde_json::to_value(rules).unwrap(), serde_json::json!({"disallow": ["/private"]}));
    }
}
