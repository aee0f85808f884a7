// Names end up in URLs and on disk, so they have to survive both untouched.
const RESERVED_NAMES: &[&str] = &["node_modules", "favicon.ico"];

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'
}

/// Whether `s` is an acceptable package name, independent of case rules and
/// length limits (the guard checks those separately).
pub fn is_valid_name(s: &str) -> bool {
    match s.chars().next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    s.chars().all(is_name_char)
        && !RESERVED_NAMES
            .iter()
            .any(|reserved| s.eq_ignore_ascii_case(reserved))
}
