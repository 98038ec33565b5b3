//! 编译后模式模型
//! 正则编译后的结构与标签语法解析

use regex::Regex;

/// 默认置信度
pub const DEFAULT_CONFIDENCE: u8 = 100;

/// 模式后缀标签（`\;version:\1`、`\;confidence:50`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternTags {
    pub version_group: Option<usize>,
    pub confidence: u8,
}

impl Default for PatternTags {
    fn default() -> Self {
        Self {
            version_group: None,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// 拆分原始模式为 (正则, 标签)
/// 标签按出现顺序解析，同名标签后者覆盖前者；无法解析的标签值被忽略
pub fn split_tags(raw_pattern: &str) -> (&str, PatternTags) {
    let mut parts = raw_pattern.split("\\;");
    let regex = parts.next().unwrap_or_default();
    let mut tags = PatternTags::default();

    for tag in parts {
        if let Some(value) = tag.strip_prefix("version:") {
            // 分组引用写作 \1 或 $1
            let value = value.trim_start();
            let value = value
                .strip_prefix('\\')
                .or_else(|| value.strip_prefix('$'))
                .unwrap_or(value);
            if let Some(group) = leading_integer(value) {
                tags.version_group = usize::try_from(group).ok();
            }
        } else if let Some(value) = tag.strip_prefix("confidence:") {
            if let Some(confidence) = leading_integer(value.trim_start()) {
                tags.confidence = confidence.min(DEFAULT_CONFIDENCE as u64) as u8;
            }
        }
    }

    (regex, tags)
}

/// 取前缀数字，容忍尾部杂质
fn leading_integer(s: &str) -> Option<u64> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

/// 单次匹配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub confidence: u8,
    pub version: Option<String>,
}

/// 编译后的正则模式
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub regex: Regex,
    pub confidence: u8,
    pub version_group: Option<usize>,
}

impl CompiledPattern {
    /// 匹配输入；声明了版本分组且该分组参与匹配时带回版本
    pub fn search(&self, input: &str) -> Option<PatternMatch> {
        let version = match self.version_group {
            Some(group) => {
                let captures = self.regex.captures(input)?;
                captures
                    .get(group)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|v| !v.is_empty())
            }
            None => {
                if !self.regex.is_match(input) {
                    return None;
                }
                None
            }
        };

        Some(PatternMatch {
            confidence: self.confidence,
            version,
        })
    }
}

/// 单个技术编译后的规则
#[derive(Debug, Clone, Default)]
pub struct CompiledTechnology {
    pub name: String,
    /// (小写Header名, 模式)
    pub header_patterns: Vec<(String, Vec<CompiledPattern>)>,
    /// (Cookie名, 模式)
    pub cookie_patterns: Vec<(String, Vec<CompiledPattern>)>,
    pub html_patterns: Vec<CompiledPattern>,
    pub script_patterns: Vec<CompiledPattern>,
    /// (小写meta名, 模式)
    pub meta_patterns: Vec<(String, Vec<CompiledPattern>)>,
}

impl CompiledTechnology {
    pub fn is_empty(&self) -> bool {
        self.header_patterns.is_empty()
            && self.cookie_patterns.is_empty()
            && self.html_patterns.is_empty()
            && self.script_patterns.is_empty()
            && self.meta_patterns.is_empty()
    }
}

/// 编译后的技术库（不含任何模式的技术不参与匹配）
#[derive(Debug, Clone, Default)]
pub struct CompiledDatabase {
    pub technologies: Vec<CompiledTechnology>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tags_defaults() {
        let (regex, tags) = split_tags("^nginx$");
        assert_eq!(regex, "^nginx$");
        assert_eq!(tags, PatternTags::default());
    }

    #[test]
    fn test_split_tags_version_and_confidence() {
        let (regex, tags) = split_tags(r"jquery-([\d.]+)\;version:\1\;confidence:50");
        assert_eq!(regex, r"jquery-([\d.]+)");
        assert_eq!(tags.version_group, Some(1));
        assert_eq!(tags.confidence, 50);

        let (_, tags) = split_tags(r"x(\d)\;version:$1");
        assert_eq!(tags.version_group, Some(1));
    }

    #[test]
    fn test_split_tags_tolerates_garbage_and_last_wins() {
        let (_, tags) = split_tags(r"a(b)(c)\;version:\1\;version:\2?beta\;confidence:75abc");
        assert_eq!(tags.version_group, Some(2));
        assert_eq!(tags.confidence, 75);

        let (_, tags) = split_tags(r"a\;confidence:oops\;version:\x");
        assert_eq!(tags, PatternTags::default());

        let (_, tags) = split_tags(r"a\;confidence:250");
        assert_eq!(tags.confidence, 100);
    }

    #[test]
    fn test_search_version_capture() {
        let pattern = CompiledPattern {
            regex: Regex::new(r"(?i)nginx(?:/([\d.]+))?").unwrap(),
            confidence: 100,
            version_group: Some(1),
        };
        let hit = pattern.search("NGINX/1.25.3").unwrap();
        assert_eq!(hit.version.as_deref(), Some("1.25.3"));

        // 分组未参与匹配时仍算命中，但没有版本
        let hit = pattern.search("nginx").unwrap();
        assert_eq!(hit.version, None);
        assert!(pattern.search("apache").is_none());

        let out_of_range = CompiledPattern {
            version_group: Some(5),
            ..pattern
        };
        assert_eq!(out_of_range.search("nginx/1.0").unwrap().version, None);
    }
}
