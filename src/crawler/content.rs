//! 原始响应体扫描：邮箱地址与HTML注释

use dashmap::DashSet;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}").unwrap()
});

static HTML_COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--(.*?)-->").unwrap()
});

pub struct ContentScanner;

impl ContentScanner {
    pub fn emails(body: &str) -> impl Iterator<Item = &str> {
        EMAIL_REGEX.find_iter(body).map(|m| m.as_str())
    }

    /// 注释内容（去除首尾空白）
    pub fn comments(body: &str) -> impl Iterator<Item = &str> {
        HTML_COMMENT_REGEX
            .captures_iter(body)
            .filter_map(|cap| cap.get(1))
            .map(|m| m.as_str().trim())
    }

    /// 累积到全局集合
    pub fn collect(body: &str, emails: &DashSet<String>, comments: &DashSet<String>) {
        for email in Self::emails(body) {
            emails.insert(email.to_string());
        }
        for comment in Self::comments(body) {
            comments.insert(comment.to_string());
        }
    }
}
