//! 派生视图工具
//!
//! 列表页用到的分组、百分比、模糊匹配等纯函数。所有函数只读输入，
//! 每次请求重新计算，不保留任何状态。

use serde::Serialize;

/// 分组结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Group<K, T> {
    pub key: K,
    pub count: usize,
    pub items: Vec<T>,
}

/// 按 key 对输入做划分
///
/// 每个元素恰好落入一个分组；分组按 key 升序，组内保持输入顺序。
pub fn group_by<T, K, F>(items: &[T], key_fn: F) -> Vec<Group<K, T>>
where
    T: Clone,
    K: Ord + Clone,
    F: Fn(&T) -> K,
{
    let mut groups: std::collections::BTreeMap<K, Vec<T>> = std::collections::BTreeMap::new();
    for item in items {
        groups.entry(key_fn(item)).or_default().push(item.clone());
    }

    groups
        .into_iter()
        .map(|(key, items)| Group {
            key,
            count: items.len(),
            items,
        })
        .collect()
}

/// 百分比，保留一位小数，范围 [0, 100]
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 || !part.is_finite() || !whole.is_finite() {
        return 0.0;
    }
    let value = (part / whole * 100.0).clamp(0.0, 100.0);
    (value * 10.0).round() / 10.0
}

/// 金额保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 忽略大小写的子串匹配，空关键字匹配全部
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// 任一字段匹配即可
pub fn any_contains_ci<'a, I>(fields: I, needle: &str) -> bool
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    if needle.trim().is_empty() {
        return true;
    }
    fields
        .into_iter()
        .flatten()
        .any(|field| contains_ci(field, needle))
}

/// 清理字符串列表：去空白、去空项、去重（保持首次出现的顺序）
pub fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}

/// 可选文本字段：去空白，空串视为未填写
pub fn clean_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
