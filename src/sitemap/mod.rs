//! 站点地图：路径 -> 参数集合
//! 参数值只增不减，同一路径的并发合并通过 DashMap 的分片写锁串行化

use std::collections::{BTreeMap, BTreeSet};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use reqwest::Method;
use serde::Serialize;

pub mod probe;

pub use self::probe::{fill_param, ProbeRequest};

/// 参数名 -> 观测到的全部取值
pub type ParamSet = BTreeMap<String, BTreeSet<String>>;

/// 站点地图节点
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    pub path: String,
    pub url_parameters: ParamSet,
    pub post_parameters: ParamSet,
}

impl Directory {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// 合并查询字符串中的参数，返回是否出现新的参数名或取值
    ///
    /// URL参数的空值不记录（`?a=` 不产生参数 a），请求体参数保留空值
    pub fn add_query_parameters(&mut self, query: &str) -> bool {
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.into_owned(), v.into_owned()));
        merge_into(&mut self.url_parameters, pairs)
    }

    pub fn add_url_parameters(&mut self, params: &[(String, String)]) -> bool {
        let pairs = params.iter().filter(|(_, v)| !v.is_empty()).cloned();
        merge_into(&mut self.url_parameters, pairs)
    }

    pub fn add_post_parameters(&mut self, params: &[(String, String)]) -> bool {
        merge_into(&mut self.post_parameters, params.iter().cloned())
    }

    /// 按请求方法合并参数：GET 记入URL参数，POST 记入请求体参数，其它方法忽略
    pub fn add_parameters(&mut self, method: &Method, params: &[(String, String)]) -> bool {
        if *method == Method::GET {
            self.add_url_parameters(params)
        } else if *method == Method::POST {
            self.add_post_parameters(params)
        } else {
            false
        }
    }

    pub fn export(&self) -> DirectoryExport {
        DirectoryExport {
            url_parameters: export_params(&self.url_parameters),
            post_parameters: export_params(&self.post_parameters),
        }
    }

    /// 转为探测请求序列：先 POST 参数后 URL 参数，每个参数名一条
    pub fn into_probe_requests(self, fill: bool) -> impl Iterator<Item = ProbeRequest> {
        let post_names: Vec<String> = self.post_parameters.into_keys().collect();
        let url_names: Vec<String> = self.url_parameters.into_keys().collect();

        probe::param_requests(Method::POST, self.path.clone(), post_names, fill)
            .chain(probe::param_requests(Method::GET, self.path, url_names, fill))
    }
}

fn merge_into<I>(target: &mut ParamSet, pairs: I) -> bool
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut new_param = false;
    for (name, value) in pairs {
        if target.entry(name).or_default().insert(value) {
            new_param = true;
        }
    }
    new_param
}

/// 导出格式中的参数值：恰好一个取值时为标量，否则为列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValues {
    Single(String),
    Many(Vec<String>),
}

impl ParamValues {
    pub fn values(&self) -> Vec<&str> {
        match self {
            ParamValues::Single(v) => vec![v.as_str()],
            ParamValues::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

fn export_params(params: &ParamSet) -> BTreeMap<String, ParamValues> {
    params
        .iter()
        .map(|(name, values)| {
            let exported = match values.iter().next() {
                Some(only) if values.len() == 1 => ParamValues::Single(only.clone()),
                _ => ParamValues::Many(values.iter().cloned().collect()),
            };
            (name.clone(), exported)
        })
        .collect()
}

/// 单个节点的导出格式
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryExport {
    #[serde(rename = "url-parameters", skip_serializing_if = "BTreeMap::is_empty")]
    pub url_parameters: BTreeMap<String, ParamValues>,
    #[serde(rename = "post-parameters", skip_serializing_if = "BTreeMap::is_empty")]
    pub post_parameters: BTreeMap<String, ParamValues>,
}

/// 站点地图（爬取期间并发写入，爬取结束后只读）
#[derive(Debug, Default)]
pub struct SiteMap {
    directories: DashMap<String, Directory>,
}

impl SiteMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次发现：路径不存在时新建节点（总是视为新信息），
    /// 存在时合并参数，仅当出现新的参数名或取值时返回 true
    pub fn record(
        &self,
        path: &str,
        method: &Method,
        query: Option<&str>,
        params: &[(String, String)],
    ) -> bool {
        match self.directories.entry(path.to_string()) {
            Entry::Occupied(mut entry) => {
                let directory = entry.get_mut();
                let from_query = query.map_or(false, |q| directory.add_query_parameters(q));
                let from_params = directory.add_parameters(method, params);
                from_query || from_params
            }
            Entry::Vacant(entry) => {
                let mut directory = Directory::new(path);
                if let Some(q) = query {
                    directory.add_query_parameters(q);
                }
                directory.add_parameters(method, params);
                entry.insert(directory);
                true
            }
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.directories.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<Directory> {
        self.directories.get(path).map(|d| d.value().clone())
    }

    pub fn len(&self) -> usize {
        self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    /// 按路径排序的快照
    pub fn snapshot(&self) -> BTreeMap<String, Directory> {
        self.directories
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn export(&self) -> BTreeMap<String, DirectoryExport> {
        self.directories
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().export()))
            .collect()
    }

    /// 探测请求惰性序列（基于调用时刻的快照）
    pub fn probe_requests(&self, fill: bool) -> impl Iterator<Item = ProbeRequest> {
        self.snapshot()
            .into_values()
            .flat_map(move |directory| directory.into_probe_requests(fill))
    }
}

impl Serialize for SiteMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.export().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_new_path_is_always_new_information() {
        let sitemap = SiteMap::new();
        assert!(sitemap.record("/", &Method::GET, None, &[]));
        assert!(!sitemap.record("/", &Method::GET, None, &[]));
        assert!(!sitemap.record("/", &Method::GET, Some(""), &[]));
    }

    #[test]
    fn test_merge_reports_only_unseen_values() {
        let sitemap = SiteMap::new();
        sitemap.record("/item", &Method::GET, Some("id=1"), &[]);
        assert!(!sitemap.record("/item", &Method::GET, Some("id=1"), &[]));
        assert!(sitemap.record("/item", &Method::GET, Some("id=2"), &[]));
        assert!(sitemap.record("/item", &Method::GET, Some("sort=asc"), &[]));
        assert!(sitemap.record("/item", &Method::POST, None, &pairs(&[("id", "1")])));

        let directory = sitemap.get("/item").unwrap();
        assert_eq!(directory.url_parameters["id"].len(), 2);
        assert_eq!(directory.url_parameters["sort"].len(), 1);
        assert_eq!(directory.post_parameters["id"].len(), 1);
    }

    #[test]
    fn test_blank_url_values_dropped() {
        let sitemap = SiteMap::new();
        // 只有空值的新路径仍然登记
        assert!(sitemap.record("/find", &Method::GET, Some("q=&page="), &pairs(&[("sort", "")])));
        assert!(sitemap.get("/find").unwrap().url_parameters.is_empty());

        assert!(!sitemap.record("/find", &Method::GET, Some("q="), &[]));
        assert!(sitemap.record("/find", &Method::GET, Some("q=&page=2"), &[]));

        let directory = sitemap.get("/find").unwrap();
        assert!(!directory.url_parameters.contains_key("q"));
        assert_eq!(directory.url_parameters["page"].len(), 1);

        // 请求体参数的空值照常记录
        sitemap.record("/find", &Method::POST, None, &pairs(&[("token", "")]));
        assert!(sitemap.get("/find").unwrap().post_parameters["token"].contains(""));
    }

    #[test]
    fn test_query_and_body_both_merged() {
        let sitemap = SiteMap::new();
        sitemap.record("/search", &Method::GET, None, &[]);
        // 查询参数和请求体参数同时出现新值时都要记录
        assert!(sitemap.record("/search", &Method::POST, Some("q=a"), &pairs(&[("page", "2")])));
        let directory = sitemap.get("/search").unwrap();
        assert!(directory.url_parameters.contains_key("q"));
        assert!(directory.post_parameters.contains_key("page"));
    }

    #[test]
    fn test_monotonic_merge_is_union() {
        let mut directory = Directory::new("/p");
        let observations = [
            vec![("a", "1"), ("b", "x")],
            vec![("a", "2")],
            vec![("a", "1"), ("c", "")],
            vec![("b", "y"), ("b", "x")],
        ];

        let mut expected: ParamSet = BTreeMap::new();
        for observation in &observations {
            let params = pairs(observation);
            directory.add_post_parameters(&params);
            for (k, v) in params {
                expected.entry(k).or_default().insert(v);
            }
            // 任意时刻，已记录的值都不会消失
            for (k, values) in &expected {
                assert!(values.is_subset(&directory.post_parameters[k]));
            }
        }
        assert_eq!(directory.post_parameters, expected);
    }

    #[test]
    fn test_concurrent_merge_keeps_every_value() {
        let sitemap = Arc::new(SiteMap::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let sitemap = Arc::clone(&sitemap);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let query = format!("w{}={}", worker, i);
                        sitemap.record("/shared", &Method::GET, Some(&query), &[]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let directory = sitemap.get("/shared").unwrap();
        assert_eq!(directory.url_parameters.len(), 8);
        assert!(directory.url_parameters.values().all(|values| values.len() == 50));
    }

    #[test]
    fn test_export_single_versus_list() {
        let sitemap = SiteMap::new();
        sitemap.record("/", &Method::GET, None, &[]);
        sitemap.record("/item", &Method::GET, Some("id=1&lang=en"), &[]);
        sitemap.record("/item", &Method::GET, Some("id=2"), &[]);
        sitemap.record("/login", &Method::POST, None, &pairs(&[("user", ""), ("pass", "")]));

        let exported = serde_json::to_value(&sitemap).unwrap();
        assert_eq!(
            exported,
            json!({
                "/": {},
                "/item": {"url-parameters": {"id": ["1", "2"], "lang": "en"}},
                "/login": {"post-parameters": {"pass": "", "user": ""}}
            })
        );
    }

    #[test]
    fn test_probe_requests_order_and_fill() {
        let sitemap = SiteMap::new();
        sitemap.record("/form", &Method::POST, Some("debug=1"), &pairs(&[("email", "a@b.c"), ("id", "7")]));

        let requests: Vec<ProbeRequest> = sitemap.probe_requests(false).collect();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].target, "email");
        assert_eq!(requests[1].target, "id");
        assert_eq!(requests[2].method, Method::GET);
        assert_eq!(requests[2].target, "debug");
        assert!(requests[0].params.values().all(String::is_empty));
        assert_eq!(requests[0].params.len(), 2);

        let filled: Vec<ProbeRequest> = sitemap.probe_requests(true).collect();
        assert_eq!(filled[0].params["email"], "test@example.com");
        assert_eq!(filled[0].params["id"], "1");
    }
}
