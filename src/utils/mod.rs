//! 工具模块：Header转换、检测结果累积、版本选择
pub mod header_converter;
pub mod detection_updater;
pub mod version_extractor;

pub use self::header_converter::HeaderConverter;
pub use self::detection_updater::{DetectionEntry, DetectionUpdater};
pub use self::version_extractor::VersionExtractor;
