//! 规则编译器核心
//! 仅负责将技术库中的原始模式编译为可执行的正则模式

use std::collections::BTreeMap;
use std::time::Instant;
use regex::Regex;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use super::pattern::{split_tags, CompiledDatabase, CompiledPattern, CompiledTechnology};
use crate::error::RwsResult;
use crate::rule::{StringList, TechnologyDatabase, TechnologySpec};

/// 环视语法（Rust regex 不支持），编译失败时剥离后重试
static LOOK_AROUND_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\?<?[=!][^()]*\)").unwrap()
});

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译技术库；无法编译的单条模式被跳过，不影响整体
    pub fn compile(database: &TechnologyDatabase) -> CompiledDatabase {
        let start = Instant::now();
        let mut stats = CompileStats::default();

        let technologies: Vec<CompiledTechnology> = database
            .technologies
            .values()
            .map(|spec| Self::compile_technology(spec, &mut stats))
            .filter(|compiled| !compiled.is_empty())
            .collect();

        debug!("规则编译完成，总耗时{:?}", start.elapsed());
        debug!(
            "编译统计：Header模式{}条、Cookie模式{}条、HTML模式{}条、Script模式{}条、Meta模式{}条，跳过{}条",
            stats.header_count,
            stats.cookie_count,
            stats.html_count,
            stats.script_count,
            stats.meta_count,
            stats.skipped
        );

        CompiledDatabase { technologies }
    }

    fn compile_technology(spec: &TechnologySpec, stats: &mut CompileStats) -> CompiledTechnology {
        let header_patterns = Self::compile_keyed(&spec.name, &spec.headers, true, stats);
        stats.header_count += count_keyed(&header_patterns);
        let cookie_patterns = Self::compile_keyed(&spec.name, &spec.cookies, false, stats);
        stats.cookie_count += count_keyed(&cookie_patterns);
        let meta_patterns = Self::compile_keyed(&spec.name, &spec.meta, true, stats);
        stats.meta_count += count_keyed(&meta_patterns);

        let html_patterns = Self::compile_list(&spec.name, &spec.html, stats);
        stats.html_count += html_patterns.len();
        let script_patterns = Self::compile_list(&spec.name, &spec.script_src, stats);
        stats.script_count += script_patterns.len();

        CompiledTechnology {
            name: spec.name.clone(),
            header_patterns,
            cookie_patterns,
            html_patterns,
            script_patterns,
            meta_patterns,
        }
    }

    fn compile_keyed(
        tech_name: &str,
        patterns: &BTreeMap<String, StringList>,
        lowercase_key: bool,
        stats: &mut CompileStats,
    ) -> Vec<(String, Vec<CompiledPattern>)> {
        patterns
            .iter()
            .filter_map(|(key, list)| {
                let compiled = Self::compile_list(tech_name, list, stats);
                if compiled.is_empty() {
                    return None;
                }
                let key = if lowercase_key { key.to_lowercase() } else { key.clone() };
                Some((key, compiled))
            })
            .collect()
    }

    fn compile_list(tech_name: &str, list: &StringList, stats: &mut CompileStats) -> Vec<CompiledPattern> {
        list.iter()
            .filter_map(|raw| match Self::compile_single_pattern(raw) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("跳过无法编译的模式：技术={}，模式={}，错误：{}", tech_name, raw, e);
                    stats.skipped += 1;
                    None
                }
            })
            .collect()
    }

    /// 编译单个模式（忽略大小写）
    pub fn compile_single_pattern(raw_pattern: &str) -> RwsResult<CompiledPattern> {
        let (source, tags) = split_tags(raw_pattern);

        let regex = match Regex::new(&format!("(?i){}", source)) {
            Ok(regex) => regex,
            Err(e) => {
                let stripped = LOOK_AROUND_REGEX.replace_all(source, "");
                if stripped == source {
                    return Err(e.into());
                }
                Regex::new(&format!("(?i){}", stripped))?
            }
        };

        Ok(CompiledPattern {
            regex,
            confidence: tags.confidence,
            version_group: tags.version_group,
        })
    }
}

fn count_keyed(patterns: &[(String, Vec<CompiledPattern>)]) -> usize {
    patterns.iter().map(|(_, list)| list.len()).sum()
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    header_count: usize,
    cookie_count: usize,
    html_count: usize,
    script_count: usize,
    meta_count: usize,
    skipped: usize,
}
