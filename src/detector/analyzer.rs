//! 检测分析器：按响应面（Header/Cookie/HTML/Script/Meta）匹配模式
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::compiler::{CompiledDatabase, CompiledPattern};
use crate::utils::{DetectionEntry, DetectionUpdater};

/// 对一个值逐条尝试模式，每条命中的模式都计入
fn match_all(
    tech_name: &str,
    surface: &str,
    patterns: &[CompiledPattern],
    value: &str,
    detected: &mut HashMap<String, DetectionEntry>,
) {
    for pattern in patterns {
        if let Some(hit) = pattern.search(value) {
            debug!(
                "{}匹配成功：技术={}，版本={:?}，规则={}",
                surface,
                tech_name,
                hit.version,
                pattern.regex.as_str()
            );
            DetectionUpdater::update(detected, tech_name, hit);
        }
    }
}

/// Header分析器
pub struct HeaderAnalyzer;

impl HeaderAnalyzer {
    /// `headers` 键为小写Header名
    pub fn analyze(
        compiled: &CompiledDatabase,
        headers: &HashMap<String, String>,
        detected: &mut HashMap<String, DetectionEntry>,
    ) {
        for tech in &compiled.technologies {
            for (header_name, patterns) in &tech.header_patterns {
                let Some(value) = headers.get(header_name) else {
                    continue;
                };
                match_all(&tech.name, "Header", patterns, value, detected);
            }
        }
    }
}

/// Cookie分析器
pub struct CookieAnalyzer;

impl CookieAnalyzer {
    pub fn analyze(
        compiled: &CompiledDatabase,
        cookies: &BTreeMap<String, String>,
        detected: &mut HashMap<String, DetectionEntry>,
    ) {
        for tech in &compiled.technologies {
            for (cookie_name, patterns) in &tech.cookie_patterns {
                let Some(value) = cookies.get(cookie_name) else {
                    continue;
                };
                match_all(&tech.name, "Cookie", patterns, value, detected);
            }
        }
    }
}

/// HTML分析器
pub struct HtmlAnalyzer;

impl HtmlAnalyzer {
    /// 对整个响应体匹配
    pub fn analyze(
        compiled: &CompiledDatabase,
        html: &str,
        detected: &mut HashMap<String, DetectionEntry>,
    ) {
        for tech in &compiled.technologies {
            if !tech.html_patterns.is_empty() {
                match_all(&tech.name, "HTML", &tech.html_patterns, html, detected);
            }
        }
    }
}

/// Script分析器
pub struct ScriptAnalyzer;

impl ScriptAnalyzer {
    /// 对每个 script 的 src 匹配
    pub fn analyze(
        compiled: &CompiledDatabase,
        script_srcs: &[String],
        detected: &mut HashMap<String, DetectionEntry>,
    ) {
        for tech in &compiled.technologies {
            if tech.script_patterns.is_empty() {
                continue;
            }
            for src in script_srcs {
                match_all(&tech.name, "Script", &tech.script_patterns, src, detected);
            }
        }
    }
}

/// Meta分析器
pub struct MetaAnalyzer;

impl MetaAnalyzer {
    /// `meta_tags` 为 (小写name, content)；同名 meta 以最后一个为准
    pub fn analyze(
        compiled: &CompiledDatabase,
        meta_tags: &[(String, String)],
        detected: &mut HashMap<String, DetectionEntry>,
    ) {
        let meta: HashMap<&str, &str> = meta_tags
            .iter()
            .map(|(name, content)| (name.as_str(), content.as_str()))
            .collect();

        for tech in &compiled.technologies {
            for (meta_name, patterns) in &tech.meta_patterns {
                let Some(content) = meta.get(meta_name.as_str()) else {
                    continue;
                };
                match_all(&tech.name, "Meta", patterns, content, detected);
            }
        }
    }
}
