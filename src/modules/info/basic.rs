//! 基础信息：标题、generator、重定向目标

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::RwsResult;
use crate::extractor::HtmlExtractor;
use crate::modules::{InfoModule, ScanContext};

pub struct BasicInfo;

#[async_trait]
impl InfoModule for BasicInfo {
    fn name(&self) -> &str {
        "basic"
    }

    async fn run(&self, ctx: &ScanContext) -> RwsResult<Option<Value>> {
        let response = ctx.executor.get(ctx.config.url.as_str()).await?;
        let document = HtmlExtractor::extract(&response.text_lossy());

        let mut result = Map::new();
        if let Some(title) = document.title.clone() {
            result.insert("title".to_string(), Value::String(title));
        }
        if let Some(generator) = document.meta_content("generator") {
            result.insert("generator".to_string(), Value::String(generator.to_string()));
        }
        if response.url != ctx.config.url {
            result.insert("redirect".to_string(), Value::String(response.url.to_string()));
        }

        Ok(Some(Value::Object(result)))
    }
}
