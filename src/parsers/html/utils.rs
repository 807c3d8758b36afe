/// ASCII 空白字符
pub const WHITESPACES: &[char] = &[' ', '\t', '\n', '\x0c', '\r'];

/// 检查元素名称是否在列表中（忽略大小写）
pub fn is_one_of(node_name: &str, names: &[&str]) -> bool {
    names.iter().any(|name| name.eq_ignore_ascii_case(node_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_one_of() {
        assert!(is_one_of("PRE", &["code", "pre"]));
        assert!(!is_one_of("precode", &["code", "pre"]));
    }
}
