//! 宽松文本字段的显式数值解析。

/// 解析字符串的前导数值 token（如 "15.0 Minutes" → 15.0）。
///
/// 取第一个空白分隔的 token 尝试解析为 f64，失败返回 None。
pub fn leading_number(s: &str) -> Option<f64> {
    let token = s.split_whitespace().next()?;
    token.parse::<f64>().ok()
}

/// 解析完整字符串为 f64（允许首尾空白），失败返回 None。
pub fn to_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}
