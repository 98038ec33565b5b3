//! 规则缓存管理
//! 仅处理技术库的本地序列化（MessagePack）和反序列化

use std::path::Path;
use rmp_serde::{Serializer, from_slice};
use serde::Serialize;
use tracing::debug;

use super::model::TechnologyDatabase;
use crate::error::{RwsResult, RswebscanError};

/// 规则缓存管理器
pub struct RuleCacheManager;

impl RuleCacheManager {
    /// 从本地缓存加载技术库
    pub async fn load_from_cache(cache_path: &Path) -> RwsResult<TechnologyDatabase> {
        let cache_data = tokio::fs::read(cache_path).await?;

        // MessagePack反序列化
        let database: TechnologyDatabase = from_slice(&cache_data)
            .map_err(|e| RswebscanError::MsgPackError(format!("反序列化失败：{}", e)))?;

        debug!("缓存文件反序列化成功，技术规则数：{}，分类规则数：{}", database.technologies.len(), database.categories.len());

        Ok(database)
    }

    /// 将技术库缓存到本地
    pub async fn save_to_cache(cache_path: &Path, database: &TechnologyDatabase) -> RwsResult<()> {
        let mut cache_data = Vec::new();

        // 以键值形式序列化，字段可省略
        database
            .serialize(&mut Serializer::new(&mut cache_data).with_struct_map())
            .map_err(|e| RswebscanError::MsgPackError(format!("序列化失败：{}", e)))?;

        debug!("技术库序列化成功，序列化后数据大小：{} 字节", cache_data.len());

        tokio::fs::write(cache_path, cache_data).await?;
        Ok(())
    }

    /// 清除本地缓存
    pub async fn clear_cache(cache_path: &Path) -> RwsResult<()> {
        if tokio::fs::try_exists(cache_path).await? {
            tokio::fs::remove_file(cache_path).await?;
        }
        Ok(())
    }
}
