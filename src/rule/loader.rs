//! 规则加载管理器
//! 显式加载步骤：从本地 JSON 文件或 MessagePack 缓存构建只读技术库

use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, warn};

use super::cache::RuleCacheManager;
use super::model::TechnologyDatabase;
use crate::error::{RwsResult, RswebscanError};

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 从技术库 JSON 与分类 JSON 文件加载
    pub async fn load_from_files(tech_path: &Path, category_path: &Path) -> RwsResult<TechnologyDatabase> {
        let technologies = Self::read_source(tech_path).await?;
        let categories = Self::read_source(category_path).await?;

        let database = TechnologyDatabase::from_json_str(&technologies, &categories).map_err(|e| {
            RswebscanError::RuleParseError(format!(
                "{} / {}：{}",
                tech_path.display(),
                category_path.display(),
                e
            ))
        })?;

        debug!("技术库加载完成，技术规则数：{}，分类数：{}", database.len(), database.categories.len());
        Ok(database)
    }

    /// 优先使用不早于两个 JSON 源的缓存，否则重新解析并写回缓存
    pub async fn load_cached(
        tech_path: &Path,
        category_path: &Path,
        cache_path: &Path,
    ) -> RwsResult<TechnologyDatabase> {
        if Self::cache_is_fresh(tech_path, category_path, cache_path).await {
            match RuleCacheManager::load_from_cache(cache_path).await {
                Ok(database) => {
                    debug!("从本地缓存加载技术库成功");
                    return Ok(database);
                }
                Err(e) => warn!("本地缓存损坏，将重新解析技术库：{}", e),
            }
        }

        let database = Self::load_from_files(tech_path, category_path).await?;

        if let Err(e) = RuleCacheManager::save_to_cache(cache_path, &database).await {
            warn!("技术库缓存到本地失败：{}", e);
        } else {
            debug!("技术库已缓存到本地：{}", cache_path.display());
        }

        Ok(database)
    }

    async fn read_source(path: &Path) -> RwsResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RswebscanError::RuleLoadError(format!("{}：{}", path.display(), e)))
    }

    async fn cache_is_fresh(tech_path: &Path, category_path: &Path, cache_path: &Path) -> bool {
        let Some(cache_time) = Self::modified(cache_path).await else {
            return false;
        };
        for source in [tech_path, category_path] {
            match Self::modified(source).await {
                Some(source_time) if source_time <= cache_time => {}
                _ => return false,
            }
        }
        true
    }

    async fn modified(path: &Path) -> Option<SystemTime> {
        tokio::fs::metadata(path).await.ok()?.modified().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("rswebscan-{}-{}", std::process::id(), name));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_from_files() {
        let tech = temp_file("load-tech.json", r#"{"Express": {"cats": [18], "headers": {"X-Powered-By": "^Express$"}}}"#);
        let cats = temp_file("load-cats.json", r#"{"18": {"name": "Web frameworks"}}"#);

        let database = RuleLoader::load_from_files(&tech, &cats).await.unwrap();
        assert_eq!(database.len(), 1);
        assert_eq!(database.category_name(18), Some("Web frameworks"));

        let missing = std::env::temp_dir().join("rswebscan-definitely-missing.json");
        let err = RuleLoader::load_from_files(&missing, &cats).await.unwrap_err();
        assert!(matches!(err, RswebscanError::RuleLoadError(_)));

        let broken = temp_file("load-broken.json", "[1, 2");
        let err = RuleLoader::load_from_files(&broken, &cats).await.unwrap_err();
        assert!(matches!(err, RswebscanError::RuleParseError(_)));

        for path in [tech, cats, broken] {
            let _ = std::fs::remove_file(path);
        }
    }

    #[tokio::test]
    async fn test_load_cached_writes_cache() {
        let tech = temp_file("cached-tech.json", r#"{"Varnish": {"cats": [23], "headers": {"Via": "varnish"}}}"#);
        let cats = temp_file("cached-cats.json", r#"{"23": {"name": "Caching"}}"#);
        let cache = std::env::temp_dir().join(format!("rswebscan-{}-cached.mp", std::process::id()));
        let _ = std::fs::remove_file(&cache);

        let first = RuleLoader::load_cached(&tech, &cats, &cache).await.unwrap();
        assert!(cache.exists());
        let second = RuleLoader::load_cached(&tech, &cats, &cache).await.unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(second.category_name(23), Some("Caching"));

        for path in [tech, cats, cache] {
            let _ = std::fs::remove_file(path);
        }
    }
}
