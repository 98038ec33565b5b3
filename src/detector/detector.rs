//! 检测器核心：整合各类分析器，输出按分类分组的检测结果
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::analyzer::{CookieAnalyzer, HeaderAnalyzer, HtmlAnalyzer, MetaAnalyzer, ScriptAnalyzer};
use crate::compiler::{CompiledDatabase, RuleCompiler};
use crate::error::RwsResult;
use crate::extractor::{HtmlExtractor, PageDocument};
use crate::http::{HttpResponse, RequestExecutor};
use crate::rule::TechnologyDatabase;
use crate::utils::{DetectionEntry, DetectionUpdater, HeaderConverter, VersionExtractor};

/// 单个技术的输出
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectedTechnology {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 分类名 -> 技术名 -> 详情
pub type TechnologyReport = BTreeMap<String, BTreeMap<String, DetectedTechnology>>;

/// 技术检测器
#[derive(Debug, Clone)]
pub struct TechDetector {
    database: Arc<TechnologyDatabase>,
    compiled: Arc<CompiledDatabase>,
    confidence_threshold: u8,
}

impl TechDetector {
    /// 创建检测器（编译技术库中的全部模式）
    pub fn new(database: Arc<TechnologyDatabase>, confidence_threshold: u8) -> Self {
        let compiled = RuleCompiler::compile(&database);
        Self {
            database,
            compiled: Arc::new(compiled),
            confidence_threshold: confidence_threshold.min(100),
        }
    }

    pub fn confidence_threshold(&self) -> u8 {
        self.confidence_threshold
    }

    /// 抓取页面并检测；抓取失败只影响本次检测
    pub async fn detect(&self, executor: &RequestExecutor, url: &str) -> RwsResult<TechnologyReport> {
        let response = executor.get(url).await?;
        let report = self.detect_response(&response);
        info!("技术检测完成：{}，识别到{}个分类", url, report.len());
        Ok(report)
    }

    /// 对已抓取的响应检测
    pub fn detect_response(&self, response: &HttpResponse) -> TechnologyReport {
        let header_map = HeaderConverter::to_single_value(&HeaderConverter::to_hashmap(&response.headers));
        let cookies = response.cookies();
        let html = response.text_lossy();
        let document = HtmlExtractor::extract(&html);

        self.detect_page(&header_map, &cookies, &html, &document)
    }

    /// 单页扫描：每个技术一个中间结果
    pub fn scan_entries(
        &self,
        headers: &HashMap<String, String>,
        cookies: &BTreeMap<String, String>,
        html: &str,
        document: &PageDocument,
    ) -> HashMap<String, DetectionEntry> {
        let mut detected = HashMap::new();

        HeaderAnalyzer::analyze(&self.compiled, headers, &mut detected);
        CookieAnalyzer::analyze(&self.compiled, cookies, &mut detected);
        HtmlAnalyzer::analyze(&self.compiled, html, &mut detected);
        ScriptAnalyzer::analyze(&self.compiled, &document.script_srcs, &mut detected);
        MetaAnalyzer::analyze(&self.compiled, &document.meta_tags, &mut detected);

        detected
    }

    /// 完整检测流程：阈值过滤 -> implies 闭包 -> requires 过滤 -> 按分类分组
    pub fn detect_page(
        &self,
        headers: &HashMap<String, String>,
        cookies: &BTreeMap<String, String>,
        html: &str,
        document: &PageDocument,
    ) -> TechnologyReport {
        let detected = self.scan_entries(headers, cookies, html, document);

        let mut resolved: BTreeMap<String, Option<String>> = detected
            .into_values()
            .filter(|entry| entry.matched)
            .filter(|entry| {
                let passed = entry.confidence >= self.confidence_threshold;
                if !passed {
                    debug!("置信度不足，忽略：{}（{} < {}）", entry.name, entry.confidence, self.confidence_threshold);
                }
                passed
            })
            .map(|entry| {
                let version = entry.version().map(str::to_string);
                (entry.name, version)
            })
            .collect();

        DetectionUpdater::apply_implies(&self.database, &mut resolved);
        DetectionUpdater::apply_requires(&self.database, &mut resolved);

        self.group_by_category(resolved)
    }

    fn group_by_category(&self, resolved: BTreeMap<String, Option<String>>) -> TechnologyReport {
        let mut report = TechnologyReport::new();

        for (name, version) in resolved {
            let Some(spec) = self.database.technology(&name) else {
                continue;
            };

            let cpe = match (&spec.cpe, &version) {
                (Some(cpe), Some(version)) => Some(VersionExtractor::set_cpe_version(cpe, version)),
                _ => None,
            };
            let details = DetectedTechnology {
                version,
                cpe,
                website: spec.website.clone(),
                description: spec.description.clone(),
            };

            for category_id in &spec.category_ids {
                let Some(category) = self.database.category_name(*category_id) else {
                    debug!("未知分类ID：{}（技术：{}）", category_id, name);
                    continue;
                };
                report
                    .entry(category.to_string())
                    .or_default()
                    .insert(name.clone(), details.clone());
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATEGORIES: &str = r#"{
        "1": {"name": "CMS"},
        "11": {"name": "Blogs"},
        "22": {"name": "Web servers"},
        "27": {"name": "Programming languages"},
        "59": {"name": "JavaScript libraries"}
    }"#;

    fn detector(techs: &str, threshold: u8) -> TechDetector {
        let database = TechnologyDatabase::from_json_str(techs, CATEGORIES).unwrap();
        TechDetector::new(Arc::new(database), threshold)
    }

    fn page(html: &str) -> (HashMap<String, String>, BTreeMap<String, String>, PageDocument) {
        (HashMap::new(), BTreeMap::new(), HtmlExtractor::extract(html))
    }

    #[test]
    fn test_grouping_cpe_and_implies() {
        let detector = detector(
            r#"{
                "WordPress": {
                    "cats": [1, 11],
                    "meta": {"generator": "^WordPress ?([\\d.]+)?\\;version:\\1"},
                    "implies": "PHP",
                    "cpe": "cpe:2.3:a:wordpress:wordpress:*:*:*:*:*:*:*:*",
                    "website": "https://wordpress.org"
                },
                "PHP": {"cats": [27], "website": "https://php.net", "cpe": "cpe:2.3:a:php:php:*:*:*:*:*:*:*:*"}
            }"#,
            80,
        );
        let html = r#"<meta name="generator" content="WordPress 6.4.2">"#;
        let (headers, cookies, document) = page(html);
        let report = detector.detect_page(&headers, &cookies, html, &document);

        let wordpress = &report["CMS"]["WordPress"];
        assert_eq!(wordpress.version.as_deref(), Some("6.4.2"));
        assert_eq!(wordpress.cpe.as_deref(), Some("cpe:2.3:a:wordpress:wordpress:6.4.2:*:*:*:*:*:*:*"));
        assert_eq!(report["Blogs"]["WordPress"], *wordpress);

        // 推导出的技术没有版本，因此也没有CPE
        let php = &report["Programming languages"]["PHP"];
        assert_eq!(php.version, None);
        assert_eq!(php.cpe, None);
        assert_eq!(php.website.as_deref(), Some("https://php.net"));
    }

    #[test]
    fn test_threshold_gates_output_but_not_detection() {
        let techs = r#"{"jQuery": {"cats": [59], "html": ["jquery\\;confidence:30", "\\$\\(document\\)\\;confidence:30"]}}"#;
        let html = "<script>jQuery $(document).ready()</script>";
        let (headers, cookies, document) = page(html);

        let strict = detector(techs, 80);
        let entries = strict.scan_entries(&headers, &cookies, html, &document);
        assert!(entries["jQuery"].matched);
        assert_eq!(entries["jQuery"].confidence, 60);
        assert!(strict.detect_page(&headers, &cookies, html, &document).is_empty());

        let lenient = detector(techs, 60);
        assert!(lenient.detect_page(&headers, &cookies, html, &document)["JavaScript libraries"].contains_key("jQuery"));
    }

    #[test]
    fn test_requires_filter_drops_direct_match() {
        let detector = detector(
            r#"{
                "Plugin": {"cats": [1], "html": "plugin-marker", "requires": "WordPress"},
                "WordPress": {"cats": [1], "html": "wp-content"}
            }"#,
            80,
        );
        let html = "<div>plugin-marker</div>";
        let (headers, cookies, document) = page(html);
        assert!(detector.detect_page(&headers, &cookies, html, &document).is_empty());

        let html = "<div>plugin-marker</div><img src=/wp-content/a.png>";
        let (headers, cookies, document) = page(html);
        let report = detector.detect_page(&headers, &cookies, html, &document);
        assert_eq!(report["CMS"].len(), 2);
    }

    #[test]
    fn test_detect_response_uses_headers_and_cookies() {
        use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};

        let detector = detector(
            r#"{
                "Nginx": {"cats": [22], "headers": {"Server": "nginx(?:/([\\d.]+))?\\;version:\\1"}},
                "PHP": {"cats": [27], "cookies": {"PHPSESSID": ""}}
            }"#,
            80,
        );
        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_static("nginx/1.25.3"));
        headers.insert(SET_COOKIE, HeaderValue::from_static("PHPSESSID=abc; path=/"));
        let response = HttpResponse {
            status: 200,
            url: url::Url::parse("http://example.com/").unwrap(),
            headers,
            body: b"<html></html>".to_vec(),
        };

        let report = detector.detect_response(&response);
        assert_eq!(report["Web servers"]["Nginx"].version.as_deref(), Some("1.25.3"));
        assert!(report["Programming languages"].contains_key("PHP"));
    }
}
