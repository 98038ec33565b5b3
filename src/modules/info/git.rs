//! 暴露的 .git 目录：描述、远程仓库地址、提交记录

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::RwsResult;
use crate::modules::{InfoModule, ScanContext};

/// reflog 中的一条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub hash: String,
    pub author: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct GitReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commits: Option<Vec<Commit>>,
}

/// `[remote "origin"]` 段中的 url
pub fn remote_origin_url(config: &str) -> Option<String> {
    let mut in_origin = false;
    for line in config.lines().map(str::trim) {
        if line.starts_with('[') {
            in_origin = line.trim_start_matches('[').trim_end_matches(']').trim() == "remote \"origin\"";
            continue;
        }
        if !in_origin {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim().eq_ignore_ascii_case("url") {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

/// 解析 `.git/logs/HEAD`：`<旧> <新> 作者 <邮箱> 时间戳 时区\t消息`，格式不符的行跳过
pub fn parse_reflog(text: &str) -> Vec<Commit> {
    text.lines()
        .filter_map(|line| {
            let (header, message) = line.split_once('\t').unwrap_or((line, ""));
            let parts: Vec<&str> = header.split_whitespace().collect();
            let email_at = parts.iter().position(|p| p.starts_with('<'))?;
            // 两个哈希在前，邮箱后还有时间戳与时区
            if email_at < 3 || parts.len() < email_at + 3 {
                return None;
            }
            Some(Commit {
                hash: parts[1].to_string(),
                author: parts[2..email_at].join(" "),
                message: message.trim().to_string(),
            })
        })
        .collect()
}

pub struct GitExposure;

impl GitExposure {
    async fn fetch(ctx: &ScanContext, path: &str) -> Option<String> {
        let url = ctx.resolve(path).ok()?;
        match ctx.executor.get(url.as_str()).await {
            Ok(response) if response.status == 200 => Some(response.text_lossy().into_owned()),
            Ok(_) => None,
            Err(e) => {
                debug!("读取 {} 失败：{}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl InfoModule for GitExposure {
    fn name(&self) -> &str {
        "git"
    }

    async fn run(&self, ctx: &ScanContext) -> RwsResult<Option<Value>> {
        let url = ctx.resolve("/.git/")?;
        let response = ctx.executor.get(url.as_str()).await?;
        if response.status != 200 {
            return Ok(None);
        }

        let (description, config, reflog) = tokio::join!(
            Self::fetch(ctx, "/.git/description"),
            Self::fetch(ctx, "/.git/config"),
            Self::fetch(ctx, "/.git/logs/HEAD"),
        );

        let report = GitReport {
            status: "found",
            description: description.map(|d| d.trim().to_string()),
            remote: config.as_deref().and_then(remote_origin_url),
            commits: reflog.as_deref().map(parse_reflog),
        };
        Ok(Some(serde_json::to_value(report)?))
    }
}
