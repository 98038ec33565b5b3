//! HTTP响应快照：在单次尝试内完整读取，之后与连接无关

use std::borrow::Cow;
use std::collections::BTreeMap;

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION, SET_COOKIE};
use serde::Serialize;
use url::Url;

use crate::error::{RswebscanError, RwsResult};

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// 最终URL（跟随重定向后）
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// 一条 Set-Cookie 记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub secure: bool,
    pub httponly: bool,
}

impl SetCookie {
    /// 解析 `name=value; attr; attr=...`，属性名大小写不敏感
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = SetCookie {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            secure: false,
            httponly: false,
        };
        for attr in parts {
            let key = attr.split('=').next().unwrap_or_default().trim();
            if key.eq_ignore_ascii_case("secure") {
                cookie.secure = true;
            } else if key.eq_ignore_ascii_case("httponly") {
                cookie.httponly = true;
            }
        }
        Some(cookie)
    }
}

impl HttpResponse {
    /// 按 BOM、Content-Type charset（缺省UTF-8）严格解码，存在无法解码的字节时视为解析错误
    pub fn text(&self) -> RwsResult<Cow<'_, str>> {
        let (encoding, body) = self.encoding_and_body();
        encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .ok_or_else(|| {
                RswebscanError::Parse(format!("响应体无法按{}解码，URL：{}", encoding.name(), self.url))
            })
    }

    /// 宽松解码（非法字节替换为U+FFFD）
    pub fn text_lossy(&self) -> Cow<'_, str> {
        let (encoding, body) = self.encoding_and_body();
        encoding.decode_without_bom_handling(body).0
    }

    fn encoding_and_body(&self) -> (&'static Encoding, &[u8]) {
        if let Some((encoding, bom_len)) = Encoding::for_bom(&self.body) {
            return (encoding, &self.body[bom_len..]);
        }
        let encoding = self
            .header(CONTENT_TYPE.as_str())
            .and_then(charset_label)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        (encoding, &self.body)
    }

    /// 获取首个同名Header值（名称大小写不敏感）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Content-Type 的媒体类型部分（小写，不含参数）
    pub fn media_type(&self) -> Option<String> {
        self.header(CONTENT_TYPE.as_str())
            .and_then(|ct| ct.split(';').next())
            .map(|mt| mt.trim().to_ascii_lowercase())
    }

    /// 全部 Set-Cookie 记录（保留顺序）
    pub fn set_cookies(&self) -> Vec<SetCookie> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|raw| raw.to_str().ok())
            .filter_map(SetCookie::parse)
            .collect()
    }

    /// Cookie 名称与值（同名时后者覆盖前者）
    pub fn cookies(&self) -> BTreeMap<String, String> {
        self.set_cookies()
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect()
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}
