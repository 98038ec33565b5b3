//! Header格式转换工具
//! 把响应头整理为检测时查询的形式（小写键）

use std::collections::HashMap;
use reqwest::header::HeaderMap;
use tracing::debug;

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 将HeaderMap转换为HashMap<String, Vec<String>>（键小写，非UTF-8值按有损解码）
    pub fn to_hashmap(header_map: &HeaderMap) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();

        for (key, value) in header_map.iter() {
            let value_str = String::from_utf8_lossy(value.as_bytes()).into_owned();
            map.entry(key.as_str().to_lowercase())
                .or_default()
                .push(value_str);
        }

        debug!("Header转换完成，生成{}条记录", map.len());
        map
    }

    /// 将多值Header转换为单值（取同名Header的第一个值）
    pub fn to_single_value(hashmap: &HashMap<String, Vec<String>>) -> HashMap<String, String> {
        hashmap
            .iter()
            .filter_map(|(key, values)| values.first().map(|v| (key.clone(), v.clone())))
            .collect()
    }
}
