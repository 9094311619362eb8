//! INI fragment codec
//!
//! Reads and writes the `[section]` / `key = value` dialect produced by
//! Python's `ConfigParser`, so project trees written by earlier ham releases
//! stay readable and files written here stay readable by them.

use crate::error::{ConfigError, Result};
use std::collections::BTreeMap;

/// Section consulted when a key is missing from the requested section
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Merged section -> key -> value table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTable {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ConfigTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(|s| s.as_str())
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Set a value, creating the section if needed. Keys are case-folded.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_lowercase(), value.into());
    }

    /// Raw lookup with `[DEFAULT]` fallback
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.sections
            .get(section)
            .and_then(|s| s.get(&key))
            .or_else(|| {
                self.sections
                    .get(DEFAULT_SECTION)
                    .and_then(|s| s.get(&key))
            })
            .map(|v| v.as_str())
    }

    /// String value, or `""` when absent
    pub fn get_str(&self, section: &str, key: &str) -> String {
        self.get(section, key).unwrap_or_default().to_string()
    }

    /// Integer value, or `0` when absent or unparsable
    pub fn get_int(&self, section: &str, key: &str) -> i64 {
        self.get(section, key)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or_default()
    }

    /// Boolean value, or `false` when absent or unparsable
    pub fn get_bool(&self, section: &str, key: &str) -> bool {
        self.get(section, key)
            .and_then(parse_bool)
            .unwrap_or_default()
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: ConfigTable) {
        for (section, values) in other.sections {
            self.sections.entry(section).or_default().extend(values);
        }
    }
}

/// Boolean spellings accepted by `ConfigParser.getboolean`
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Parse one fragment.
pub fn parse(text: &str) -> Result<ConfigTable> {
    let mut table = ConfigTable::new();
    let mut section: Option<String> = None;
    let mut last_key: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        if raw.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("rem")) && raw[3..].starts_with(' ') {
            continue;
        }

        // continuation line
        if raw.starts_with([' ', '\t']) {
            if let (Some(s), Some(k)) = (&section, &last_key) {
                if let Some(value) = table.sections.get_mut(s).and_then(|m| m.get_mut(k)) {
                    value.push('\n');
                    value.push_str(trimmed);
                }
                continue;
            }
        }

        if let Some(header) = parse_header(raw) {
            table.sections.entry(header.clone()).or_default();
            section = Some(header);
            last_key = None;
            continue;
        }

        let Some(current) = &section else {
            return Err(ConfigError::MissingSectionHeader { line: line_no });
        };

        let (key, value) = parse_option(raw).ok_or_else(|| ConfigError::Parse {
            line: line_no,
            content: raw.to_string(),
        })?;
        table.set(current, &key, value);
        last_key = Some(key.to_lowercase());
    }

    Ok(table)
}

fn parse_header(line: &str) -> Option<String> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    let name = &rest[..end];
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

fn parse_option(line: &str) -> Option<(String, String)> {
    if line.starts_with([':', '=']) || line.starts_with(char::is_whitespace) {
        return None;
    }
    let sep = line.find([':', '='])?;
    let key = line[..sep].trim_end();
    if key.is_empty() {
        return None;
    }

    let value = strip_inline_comment(&line[sep + 1..]).trim();
    let value = if value == QUOTED_EMPTY { "" } else { value };

    Some((key.to_string(), value.to_string()))
}

const QUOTED_EMPTY: &str = "\"\"";

/// Cut an inline comment: the first `;` when it follows whitespace.
fn strip_inline_comment(value: &str) -> &str {
    match value.find(';') {
        Some(pos) if pos > 0 && value[..pos].ends_with(char::is_whitespace) => &value[..pos],
        _ => value,
    }
}

/// Why `value` would not read back unchanged after [`render`], if it would not.
pub fn unrepresentable_reason(value: &str) -> Option<&'static str> {
    let mut lines = value.split('\n');
    let first = lines.next().unwrap_or_default();

    if first == QUOTED_EMPTY {
        return Some("a literal \"\" reads back as empty");
    }
    // rendered as `key = <first>`, so the parser sees a leading space
    let rendered = format!(" {}", first);
    if strip_inline_comment(&rendered) != rendered {
        return Some("' ;' starts an inline comment");
    }
    if first.trim() != first {
        return Some("leading or trailing whitespace is trimmed");
    }
    for line in lines {
        if line.is_empty() {
            return Some("blank continuation lines are dropped");
        }
        if line.trim() != line {
            return Some("leading or trailing whitespace is trimmed");
        }
        if line.starts_with(['#', ';']) {
            return Some("continuation lines starting with '#' or ';' are comments");
        }
    }
    None
}

/// Why `key` cannot be written as an option name, if it cannot.
fn invalid_key_reason(key: &str) -> Option<&'static str> {
    if key.is_empty() {
        Some("empty option name")
    } else if key.contains([':', '=', '\n', '[']) || key.starts_with(['#', ';']) {
        Some("option name contains a delimiter or comment marker")
    } else if key.trim() != key || key.contains(char::is_whitespace) {
        Some("option name contains whitespace")
    } else {
        None
    }
}

/// Check that every option of `section` survives a [`render`] then [`parse`]
/// round trip.
pub fn check_representable(section: &str, options: &[(&str, &str)]) -> Result<()> {
    if section.is_empty() || section.contains([']', '\n']) {
        return Err(ConfigError::Unrepresentable {
            section: section.to_string(),
            key: String::new(),
            reason: "invalid section name",
        });
    }
    for (key, value) in options {
        if let Some(reason) = invalid_key_reason(key).or_else(|| unrepresentable_reason(value)) {
            return Err(ConfigError::Unrepresentable {
                section: section.to_string(),
                key: key.to_string(),
                reason,
            });
        }
    }
    Ok(())
}

/// Render one section in `ConfigParser.write` layout.
pub fn render<'a, I>(section: &str, options: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = format!("[{}]\n", section);
    for (key, value) in options {
        out.push_str(&key.to_lowercase());
        out.push_str(" = ");
        out.push_str(&value.replace('\n', "\n\t"));
        out.push('\n');
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_sections() {
        let table = parse("[boot]\nimage_id = abc\nflavor_id: 2\n\n[cache]\nstatus = ACTIVE\n").unwrap();

        assert_eq!(table.get("boot", "image_id"), Some("abc"));
        assert_eq!(table.get("boot", "flavor_id"), Some("2"));
        assert_eq!(table.get("cache", "status"), Some("ACTIVE"));
        assert_eq!(table.get("cache", "missing"), None);
    }

    #[test]
    fn test_parse_comments_and_inline_comments() {
        let text = "# leading\n; also\n[instance]\nserver_id = 42 ; trailing note\nadmin_pass = a;b\n";
        let table = parse(text).unwrap();

        assert_eq!(table.get("instance", "server_id"), Some("42"));
        // ';' without preceding whitespace is part of the value
        assert_eq!(table.get("instance", "admin_pass"), Some("a;b"));
    }

    #[test]
    fn test_parse_empty_value_and_case_folding() {
        let table = parse("[instance]\nServer_ID =\nip_address = \"\"\n").unwrap();

        assert_eq!(table.get("instance", "server_id"), Some(""));
        assert_eq!(table.get("instance", "SERVER_ID"), Some(""));
        assert_eq!(table.get("instance", "ip_address"), Some(""));
    }

    #[test]
    fn test_parse_continuation_lines() {
        let table = parse("[boot]\nuser_data = line one\n\tline two\n").unwrap();
        assert_eq!(table.get("boot", "user_data"), Some("line one\nline two"));
    }

    #[test]
    fn test_parse_missing_section_header() {
        let err = parse("image_id = abc\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSectionHeader { line: 1 }));
    }

    #[test]
    fn test_parse_garbage_line() {
        let err = parse("[boot]\nthis is not an option\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_default_section_fallback() {
        let table = parse("[DEFAULT]\nflavor_id = 2\n[boot]\nimage_id = x\n").unwrap();
        assert_eq!(table.get("boot", "flavor_id"), Some("2"));
    }

    #[test]
    fn test_typed_accessors_fall_back_to_zero() {
        let table = parse("[wait]\npoll_interval = ten\ntimeout = 30\n[build]\nfail_fast = maybe\nverbose = On\n").unwrap();

        assert_eq!(table.get_int("wait", "poll_interval"), 0);
        assert_eq!(table.get_int("wait", "timeout"), 30);
        assert_eq!(table.get_int("wait", "absent"), 0);
        assert!(!table.get_bool("build", "fail_fast"));
        assert!(table.get_bool("build", "verbose"));
        assert_eq!(table.get_str("nope", "nope"), "");
    }

    #[test]
    fn test_render_matches_configparser_layout() {
        let text = render("boot", [("image_id", "abc"), ("flavor_id", "2")]);
        assert_eq!(text, "[boot]\nimage_id = abc\nflavor_id = 2\n\n");
    }

    #[test]
    fn test_render_multiline_value_round_trips() {
        let text = render("boot", [("user_data", "one\ntwo")]);
        assert_eq!(text, "[boot]\nuser_data = one\n\ttwo\n\n");

        let table = parse(&text).unwrap();
        assert_eq!(table.get("boot", "user_data"), Some("one\ntwo"));
    }

    #[test]
    fn test_merge_later_wins() {
        let mut base = parse("[cache]\nstatus = BUILD\n[boot]\nimage_id = a\n").unwrap();
        base.merge(parse("[cache]\nstatus = ACTIVE\n").unwrap());

        assert_eq!(base.get("cache", "status"), Some("ACTIVE"));
        assert_eq!(base.get("boot", "image_id"), Some("a"));
    }

    #[test]
    fn test_unrepresentable_values() {
        for value in ["Xy7 ;Qz", ";lead", "  padded  ", "tail ", "one\n\ntwo", "\"\"", "one\n#two", "one\n two"] {
            assert!(unrepresentable_reason(value).is_some(), "{:?} should be rejected", value);
        }
    }

    #[test]
    fn test_representable_values_round_trip() {
        let values = ["", "a;b", "x = y", "#hash", "k: v", "one\ntwo", "\nafter blank first line", "\"quoted\""];
        for value in values {
            assert_eq!(unrepresentable_reason(value), None, "{:?} should be accepted", value);
            let table = parse(&render("boot", [("v", value)])).unwrap();
            assert_eq!(table.get("boot", "v"), Some(value));
        }
    }

    #[test]
    fn test_check_representable_names_the_option() {
        let err = check_representable("instance", &[("server_id", "abc"), ("admin_pass", "Xy7 ;Qz")])
            .unwrap_err();
        match err {
            ConfigError::Unrepresentable { section, key, .. } => {
                assert_eq!(section, "instance");
                assert_eq!(key, "admin_pass");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(check_representable("boot", &[("bad key", "x")]).is_err());
        assert!(check_representable("bad]section", &[]).is_err());
        assert!(check_representable("boot", &[("image_id", "img-1")]).is_ok());
    }
}
