//! 版本工具模块
//! 在多个候选版本中选出最终版本，并把版本写入 CPE 模板

/// 版本工具类
pub struct VersionExtractor;

impl VersionExtractor {
    /// 选择最长的候选版本；等长时取最先出现的
    pub fn select<S: AsRef<str>>(candidates: &[S]) -> Option<&str> {
        candidates
            .iter()
            .map(|c| AsRef::<str>::as_ref(c))
            .fold(None, |best: Option<&str>, candidate| match best {
                Some(current) if current.len() >= candidate.len() => Some(current),
                _ => Some(candidate),
            })
    }

    /// 把版本写入 CPE 的版本字段
    ///
    /// - CPE 2.3 格式化字符串（`cpe:2.3:part:vendor:product:version:...`）替换第 6 段
    /// - CPE 2.2 URI（`cpe:/part:vendor:product:version`）替换或补齐第 5 段
    /// - 其它格式原样返回
    pub fn set_cpe_version(cpe: &str, version: &str) -> String {
        let escaped = version.replace(':', "\\:");
        let mut parts: Vec<&str> = cpe.split(':').collect();

        let index = if cpe.starts_with("cpe:2.3:") {
            5
        } else if cpe.starts_with("cpe:/") {
            4
        } else {
            return cpe.to_string();
        };

        if parts.len() > index {
            parts[index] = &escaped;
        } else if parts.len() == index {
            parts.push(&escaped);
        } else {
            return cpe.to_string();
        }
        parts.join(":")
    }
}
