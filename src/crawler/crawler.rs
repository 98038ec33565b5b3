//! 站点爬虫
//! 以种子URL（深度1）为根的任务树：每个节点抓取页面、提取链接/表单/重定向、写入站点地图，
//! 只为“带来新信息”的目标派生子任务，并在全部子任务完成后才返回。

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use dashmap::DashSet;
use futures::future::{join_all, BoxFuture, FutureExt};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use super::content::ContentScanner;
use crate::config::ScanConfig;
use crate::extractor::HtmlExtractor;
use crate::http::{RequestExecutor, RequestOptions};
use crate::sitemap::SiteMap;

/// 爬取结果
#[derive(Debug, Default, Serialize)]
pub struct CrawlReport {
    #[serde(rename = "directories")]
    pub sitemap: SiteMap,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub emails: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub comments: BTreeSet<String>,
}

/// 单次爬取期间各分支共享的状态
#[derive(Debug, Default)]
struct CrawlState {
    sitemap: SiteMap,
    emails: DashSet<String>,
    comments: DashSet<String>,
}

#[derive(Debug, Clone)]
struct CrawlTarget {
    method: Method,
    url: Url,
    params: Vec<(String, String)>,
}

/// 站点爬虫
#[derive(Debug, Clone)]
pub struct Crawler {
    executor: Arc<RequestExecutor>,
    seed: Url,
    max_depth: u32,
    ignore_paths: HashSet<String>,
}

impl Crawler {
    pub fn new(executor: Arc<RequestExecutor>, config: &ScanConfig) -> Self {
        Self::with_limits(
            executor,
            config.url.clone(),
            config.max_depth,
            config.ignore_paths.iter().cloned(),
        )
    }

    pub fn with_limits(
        executor: Arc<RequestExecutor>,
        seed: Url,
        max_depth: u32,
        ignore_paths: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            executor,
            seed,
            max_depth,
            ignore_paths: ignore_paths.into_iter().collect(),
        }
    }

    /// 执行完整爬取，返回时整棵任务树已结束
    pub async fn run(&self) -> CrawlReport {
        let state = CrawlState::default();

        // 先登记种子路径
        let seed = self.seed.clone();
        self.admit(&state, &Method::GET, "", &seed, &[]);

        self.visit(
            &state,
            CrawlTarget {
                method: Method::GET,
                url: seed,
                params: Vec::new(),
            },
            1,
        )
        .await;

        info!("爬取完成：{}，共发现{}个路径", self.seed, state.sitemap.len());

        CrawlReport {
            sitemap: state.sitemap,
            emails: state.emails.into_iter().collect(),
            comments: state.comments.into_iter().collect(),
        }
    }

    fn visit<'a>(&'a self, state: &'a CrawlState, target: CrawlTarget, depth: u32) -> BoxFuture<'a, ()> {
        async move {
            if depth > self.max_depth {
                return;
            }

            let options = if target.method == Method::POST {
                RequestOptions::new().form(target.params.clone()).no_redirects()
            } else {
                RequestOptions::new().query(target.params.clone()).no_redirects()
            };

            // 分支内的失败只终止本分支
            let response = match self
                .executor
                .execute(target.method.clone(), target.url.as_str(), &options)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    debug!("分支终止：{} {}，错误：{}", target.method, target.url, e);
                    return;
                }
            };

            if response.is_not_found() {
                debug!("分支终止：{} {} 返回404", target.method, target.url);
                return;
            }

            let html = match response.text() {
                Ok(html) => html,
                Err(e) => {
                    debug!("分支终止：{}", e);
                    return;
                }
            };

            ContentScanner::collect(&html, &state.emails, &state.comments);
            let document = HtmlExtractor::extract(&html);

            let mut children = Vec::new();

            for form in &document.forms {
                let method = form_method(form.method.as_deref());
                let action = form.action.as_deref().unwrap_or("");
                if let Some(url) = self.admit(state, &method, action, &target.url, &form.fields) {
                    children.push(CrawlTarget {
                        method,
                        url,
                        params: form.fields.clone(),
                    });
                }
            }

            if let Some(location) = response.location() {
                if let Some(url) = self.admit(state, &Method::GET, location, &target.url, &[]) {
                    children.push(CrawlTarget {
                        method: Method::GET,
                        url,
                        params: Vec::new(),
                    });
                }
            }

            for href in &document.anchors {
                if let Some(url) = self.admit(state, &Method::GET, href, &target.url, &[]) {
                    children.push(CrawlTarget {
                        method: Method::GET,
                        url,
                        params: Vec::new(),
                    });
                }
            }

            if !children.is_empty() {
                debug!("{} 派生{}个子任务（深度{}）", target.url, children.len(), depth + 1);
            }

            join_all(
                children
                    .into_iter()
                    .map(|child| self.visit(state, child, depth + 1)),
            )
            .await;
        }
        .boxed()
    }

    /// 解析候选目标并写入站点地图；只有同源、未忽略、且带来新信息时返回待爬URL
    fn admit(
        &self,
        state: &CrawlState,
        method: &Method,
        href: &str,
        base: &Url,
        params: &[(String, String)],
    ) -> Option<Url> {
        let mut resolved = base.join(href.trim()).ok()?;

        if !matches!(resolved.scheme(), "http" | "https") {
            return None;
        }
        if resolved.host_str() != self.seed.host_str()
            || resolved.port_or_known_default() != self.seed.port_or_known_default()
        {
            return None;
        }
        if self.ignore_paths.contains(resolved.path()) {
            return None;
        }

        resolved.set_fragment(None);
        if state
            .sitemap
            .record(resolved.path(), method, resolved.query(), params)
        {
            Some(resolved)
        } else {
            None
        }
    }
}

/// 表单方法：只有 POST 按 POST 处理，其余（含缺省）一律 GET
fn form_method(raw: Option<&str>) -> Method {
    match raw {
        Some(m) if m.trim().eq_ignore_ascii_case("post") => Method::POST,
        _ => Method::GET,
    }
}
