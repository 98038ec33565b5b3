//! 探测请求生成：站点地图节点 -> (method, path, 参数表, 目标参数)

use std::collections::BTreeMap;

use reqwest::Method;

/// 供漏洞探测模块变异后发送的请求模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: Method,
    pub path: String,
    /// 同一方法下该路径的全部参数（填充值或空值）
    pub params: BTreeMap<String, String>,
    /// 本次要变异的参数名
    pub target: String,
}

impl ProbeRequest {
    /// 替换目标参数的值，返回可直接发送的参数列表
    pub fn with_payload(&self, payload: &str) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(name, value)| {
                if *name == self.target {
                    (name.clone(), payload.to_string())
                } else {
                    (name.clone(), value.clone())
                }
            })
            .collect()
    }
}

// 参数名关键字 -> 填充值，按顺序匹配
const FILL_RULES: &[(&[&str], &str)] = &[
    (&["mail"], "test@example.com"),
    (&["pass", "pwd"], "Password123!"),
    (&["url", "link", "redirect", "return", "next", "callback"], "https://example.com/"),
    (&["phone", "tel", "mobile"], "5555555555"),
    (&["date", "birth"], "2000-01-01"),
    (&["zip", "postal"], "10001"),
    (&["page", "num", "count", "qty", "quantity", "amount", "limit", "offset", "age", "year"], "1"),
];

/// 按参数名推测一个合理的填充值
pub fn fill_param(name: &str) -> String {
    let lower = name.to_lowercase();

    for (keywords, value) in FILL_RULES {
        if keywords.iter().any(|k| lower.contains(k)) {
            return value.to_string();
        }
    }

    if lower == "id" || lower.ends_with("_id") || (lower.ends_with("id") && lower.len() <= 4) {
        return "1".to_string();
    }

    "test".to_string()
}

pub(crate) fn param_requests(
    method: Method,
    path: String,
    names: Vec<String>,
    fill: bool,
) -> impl Iterator<Item = ProbeRequest> {
    let params: BTreeMap<String, String> = names
        .iter()
        .map(|name| {
            let value = if fill { fill_param(name) } else { String::new() };
            (name.clone(), value)
        })
        .collect();

    names.into_iter().map(move |target| ProbeRequest {
        method: method.clone(),
        path: path.clone(),
        params: params.clone(),
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_param_heuristics() {
        assert_eq!(fill_param("Email"), "test@example.com");
        assert_eq!(fill_param("user_password"), "Password123!");
        assert_eq!(fill_param("returnUrl"), "https://example.com/");
        assert_eq!(fill_param("id"), "1");
        assert_eq!(fill_param("product_id"), "1");
        assert_eq!(fill_param("page"), "1");
        assert_eq!(fill_param("username"), "test");
    }

    #[test]
    fn test_with_payload_replaces_only_target() {
        let request = ProbeRequest {
            method: Method::GET,
            path: "/search".to_string(),
            params: [("q".to_string(), "test".to_string()), ("page".to_string(), "1".to_string())]
                .into_iter()
                .collect(),
            target: "q".to_string(),
        };
        let sent = request.with_payload("<script>");
        assert!(sent.contains(&("q".to_string(), "<script>".to_string())));
        assert!(sent.contains(&("page".to_string(), "1".to_string())));
    }
}
