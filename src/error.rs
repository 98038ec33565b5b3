//! 全局错误类型定义

use std::fmt;
use thiserror::Error;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

/// 瞬时网络故障分类（可重试）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// 请求超时
    Timeout,
    /// 建连失败
    Connect,
    /// 传输层错误
    Transport,
    /// 读取响应时连接意外断开
    Disconnected,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Connect => "connect",
            NetworkErrorKind::Transport => "transport",
            NetworkErrorKind::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum RswebscanError {
    // 网络相关错误
    #[error("网络请求失败（第{attempt}次尝试，{kind}）：{message}")]
    Network {
        kind: NetworkErrorKind,
        attempt: u32,
        message: String,
    },

    // 响应解析错误
    #[error("响应解析失败：{0}")]
    Parse(String),

    // 配置错误
    #[error("扫描配置无效：{0}")]
    Config(String),

    // 规则相关错误
    #[error("规则加载失败：{0}")]
    RuleLoadError(String),
    #[error("规则解析失败：{0}")]
    RuleParseError(String),

    // 编译相关错误
    #[error("正则编译失败：{0}")]
    RegexCompileError(#[from] RegexError),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),
    #[error("MessagePack序列化/反序列化失败：{0}")]
    MsgPackError(String),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

impl RswebscanError {
    /// 是否为瞬时网络错误
    pub fn is_network(&self) -> bool {
        matches!(self, RswebscanError::Network { .. })
    }

    /// 网络错误分类（非网络错误返回 None）
    pub fn network_kind(&self) -> Option<NetworkErrorKind> {
        match self {
            RswebscanError::Network { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

// 全局Result类型
pub type RwsResult<T> = Result<T, RswebscanError>;
