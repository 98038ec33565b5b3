//! 提取模块：从HTML中提取链接、表单、脚本和meta标签
pub mod html_extractor;

pub use self::html_extractor::{HtmlExtractor, PageDocument, ParsedForm};
