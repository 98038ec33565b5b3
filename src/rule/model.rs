//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化

use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};

use crate::error::RwsResult;

/// 单个字符串或字符串列表（技术库中两种写法都存在）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct StringList(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for StringList {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => StringList(vec![s]),
            OneOrMany::Many(v) => StringList(v),
        }
    }
}

impl StringList {
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }
}

impl<S: Into<String>> FromIterator<S> for StringList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        StringList(iter.into_iter().map(Into::into).collect())
    }
}

/// 技术规则定义（从技术库 JSON 解析）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TechnologySpec {
    /// 技术名称（JSON 中为键名，加载时回填）
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(rename = "cats", default, alias = "categories")]
    pub category_ids: Vec<u32>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cpe: Option<String>,

    // 检测规则
    #[serde(default)]
    pub headers: BTreeMap<String, StringList>,
    #[serde(default)]
    pub cookies: BTreeMap<String, StringList>,
    #[serde(default)]
    pub html: StringList,
    #[serde(rename = "scriptSrc", default)]
    pub script_src: StringList,
    #[serde(default)]
    pub meta: BTreeMap<String, StringList>,

    // 关联规则
    #[serde(default)]
    pub implies: StringList,
    #[serde(default)]
    pub requires: StringList,
}

/// 分类规则定义
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: Option<u32>,
    /// 分类ID（JSON 中为键名，加载时回填）
    #[serde(default)]
    pub id: u32,
}

/// 技术库：加载后只读，按引用传给需要的组件
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TechnologyDatabase {
    pub technologies: BTreeMap<String, TechnologySpec>,
    pub categories: HashMap<u32, CategoryRule>,
}

impl TechnologyDatabase {
    /// 由技术库 JSON 与分类 JSON 构建
    pub fn from_json_str(technologies: &str, categories: &str) -> RwsResult<Self> {
        let technologies: BTreeMap<String, TechnologySpec> = serde_json::from_str(technologies)?;
        let categories: HashMap<String, CategoryRule> = serde_json::from_str(categories)?;
        Ok(Self::from_parts(technologies, categories))
    }

    /// 回填名称与分类ID；无法解析为数字的分类键被忽略
    pub fn from_parts(
        technologies: BTreeMap<String, TechnologySpec>,
        categories: HashMap<String, CategoryRule>,
    ) -> Self {
        let technologies = technologies
            .into_iter()
            .map(|(name, mut spec)| {
                spec.name = name.clone();
                (name, spec)
            })
            .collect();

        let categories = categories
            .into_iter()
            .filter_map(|(key, mut rule)| {
                let id = key.trim().parse::<u32>().ok()?;
                rule.id = id;
                Some((id, rule))
            })
            .collect();

        Self {
            technologies,
            categories,
        }
    }

    pub fn technology(&self, name: &str) -> Option<&TechnologySpec> {
        self.technologies.get(name)
    }

    pub fn category_name(&self, id: u32) -> Option<&str> {
        self.categories.get(&id).map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.technologies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
    }
}
