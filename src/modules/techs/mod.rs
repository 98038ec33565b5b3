//! 技术专属信息模块：仅在识别出对应技术后运行
pub mod joomla;
pub mod wordpress;

pub use self::joomla::Joomla;
pub use self::wordpress::WordPress;

use url::Url;

use crate::extractor::PageDocument;

/// 页面中全部引用（链接、脚本、资源），按出现顺序相对响应URL解析
pub(crate) fn page_references(base: &Url, document: &PageDocument) -> Vec<Url> {
    document
        .anchors
        .iter()
        .chain(&document.script_srcs)
        .chain(&document.resources)
        .filter_map(|reference| base.join(reference).ok())
        .collect()
}
