//! 基于报错的SQL注入：响应中出现数据库错误信息

use async_trait::async_trait;

use super::{Payload, check_requests};
use crate::error::RwsResult;
use crate::http::HttpResponse;
use crate::modules::{Finding, Probe, ScanContext};
use crate::sitemap::SiteMap;

const PAYLOADS: &[&str] = &["'", "\"", "')", "';--", "1' OR '1'='1"];

// 全部小写，与小写化后的响应比较
const ERROR_MESSAGES: &[&str] = &[
    "you have an error in your sql syntax",
    "warning: mysql",
    "mysql_fetch",
    "unclosed quotation mark after the character string",
    "quoted string not properly terminated",
    "pg::syntaxerror",
    "syntax error at or near",
    "sqlite3::sqlexception",
    "sqlite_error",
    "ora-00933",
    "ora-01756",
    "microsoft ole db provider for sql server",
    "odbc sql server driver",
    "sqlstate[",
];

pub struct SqlInjection;

fn error_based(response: &HttpResponse, payload: &Payload) -> bool {
    let text = response.text_lossy().to_lowercase();
    payload.matches(&text)
}

#[async_trait]
impl Probe for SqlInjection {
    fn name(&self) -> &str {
        "sqli"
    }

    async fn run(&self, ctx: &ScanContext, sitemap: &SiteMap) -> RwsResult<Vec<Finding>> {
        let payloads: Vec<Payload> = PAYLOADS
            .iter()
            .map(|p| Payload::with_markers(*p, ERROR_MESSAGES))
            .collect();
        Ok(check_requests(
            ctx,
            sitemap,
            "SQL-Injection (error-based)",
            &payloads,
            error_based,
        )
        .await)
    }
}
