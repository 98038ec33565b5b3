//! 检测结果更新工具
//! 负责累积命中（叠加置信度、收集版本）以及 implies/requires 闭包

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

use super::version_extractor::VersionExtractor;
use crate::compiler::PatternMatch;
use crate::rule::TechnologyDatabase;

/// 单页扫描期间某个技术的中间结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionEntry {
    pub name: String,
    pub matched: bool,
    /// 累计置信度（整体上限100）
    pub confidence: u8,
    /// 候选版本（按首次出现顺序，去重）
    pub versions: Vec<String>,
}

impl DetectionEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matched: false,
            confidence: 0,
            versions: Vec::new(),
        }
    }

    /// 记录一次命中
    pub fn record(&mut self, hit: PatternMatch) {
        self.matched = true;
        self.confidence = self.confidence.saturating_add(hit.confidence).min(100);
        if let Some(version) = hit.version {
            if !self.versions.contains(&version) {
                self.versions.push(version);
            }
        }
    }

    pub fn version(&self) -> Option<&str> {
        VersionExtractor::select(&self.versions)
    }
}

/// 检测结果更新工具
pub struct DetectionUpdater;

impl DetectionUpdater {
    /// 更新检测结果
    pub fn update(detected: &mut HashMap<String, DetectionEntry>, tech_name: &str, hit: PatternMatch) {
        detected
            .entry(tech_name.to_string())
            .or_insert_with(|| DetectionEntry::new(tech_name))
            .record(hit);
    }

    /// 应用关联推导规则（implies），直到不再产生新技术
    /// `resolved` 为 技术名 -> 版本；推导出的技术没有版本
    pub fn apply_implies(database: &TechnologyDatabase, resolved: &mut BTreeMap<String, Option<String>>) {
        let mut pending: Vec<String> = resolved
            .keys()
            .filter_map(|name| database.technology(name))
            .flat_map(|spec| spec.implies.iter().cloned())
            .collect();

        while let Some(implied) = pending.pop() {
            if resolved.contains_key(&implied) {
                continue;
            }
            let Some(spec) = database.technology(&implied) else {
                warn!("推导出的技术不在技术库中，已忽略：{}", implied);
                continue;
            };
            debug!("推导技术：{}", implied);
            pending.extend(spec.implies.iter().cloned());
            resolved.insert(implied, None);
        }
    }

    /// 应用依赖规则（requires）：依赖不全的技术被移除
    /// 依赖按完整闭包判断，移除不会连锁
    pub fn apply_requires(database: &TechnologyDatabase, resolved: &mut BTreeMap<String, Option<String>>) {
        let closure: BTreeSet<String> = resolved.keys().cloned().collect();

        resolved.retain(|name, _| {
            let Some(spec) = database.technology(name) else {
                return true;
            };
            let satisfied = spec.requires.iter().all(|required| closure.contains(required));
            if !satisfied {
                debug!("依赖不满足，移除技术：{}（requires {:?}）", name, spec.requires.0);
            }
            satisfied
        });
    }
}
