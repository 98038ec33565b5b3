//! 爬虫模块：页面抓取、链接发现、站点地图构建

mod content;
mod crawler;

pub use self::content::ContentScanner;
pub use self::crawler::{CrawlReport, Crawler};
