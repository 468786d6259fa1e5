//! Leading `---` metadata blocks in task files.

use serde_yaml::Value;

/// Known keys of a task metadata block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    /// `None` when the key is absent, so callers can fall back to the body.
    pub dependencies: Option<Vec<String>>,
}

/// Split a leading metadata block from the markdown body.
///
/// The block must open on the first line with `---` and close with a line
/// that is exactly `---`. Returns the raw YAML text and the body after it.
#[must_use]
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim() != "---" {
        return None;
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim() == "---" {
            return Some((&content[start..offset], &content[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parse the metadata block of `content`, if any.
///
/// Malformed YAML is treated as no metadata.
///
/// # Example
///
/// ```
/// use specboard::board::frontmatter::parse_frontmatter;
///
/// let meta = parse_frontmatter("---\ntitle: Parser\ndependencies: WP01, WP02\n---\n# Body\n");
/// assert_eq!(meta.title.as_deref(), Some("Parser"));
/// assert_eq!(meta.dependencies, Some(vec!["WP01".to_string(), "WP02".to_string()]));
/// ```
#[must_use]
pub fn parse_frontmatter(content: &str) -> Frontmatter {
    let Some((yaml, _)) = split_frontmatter(content) else {
        return Frontmatter::default();
    };

    let value: Value = match serde_yaml::from_str(yaml) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed metadata block");
            return Frontmatter::default();
        }
    };

    Frontmatter {
        title: value.get("title").and_then(scalar_to_string),
        status: value.get("status").and_then(scalar_to_string),
        priority: value.get("priority").and_then(scalar_to_string),
        dependencies: value.get("dependencies").map(dependency_list),
    }
}

/// Accept a YAML list or a comma/whitespace separated string.
fn dependency_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        Value::String(text) => split_list(text),
        _ => Vec::new(),
    }
}

pub(crate) fn split_list(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_frontmatter() {
        let (yaml, body) = split_frontmatter("---\na: 1\n---\nbody\n").unwrap();
        assert_eq!(yaml, "a: 1\n");
        assert_eq!(body, "body\n");
    }

    #[test]
    fn test_split_requires_opening_line() {
        assert!(split_frontmatter("# Title\n---\na: 1\n---\n").is_none());
        assert!(split_frontmatter("---\nnever closed\n").is_none());
    }

    #[test]
    fn test_dependencies_as_list() {
        let meta = parse_frontmatter("---\ndependencies:\n  - WP01\n  - WP02\n---\n");
        assert_eq!(
            meta.dependencies,
            Some(vec!["WP01".to_string(), "WP02".to_string()])
        );
    }

    #[test]
    fn test_dependencies_whitespace_string() {
        let meta = parse_frontmatter("---\ndependencies: \"WP01 WP03\"\n---\n");
        assert_eq!(
            meta.dependencies,
            Some(vec!["WP01".to_string(), "WP03".to_string()])
        );
    }

    #[test]
    fn test_absent_dependencies_is_none() {
        let meta = parse_frontmatter("---\ntitle: X\nstatus: doing\n---\n");
        assert_eq!(meta.dependencies, None);
        assert_eq!(meta.status.as_deref(), Some("doing"));
    }

    #[test]
    fn test_malformed_yaml_is_ignored() {
        let meta = parse_frontmatter("---\ntitle: [unclosed\n---\n");
        assert_eq!(meta, Frontmatter::default());
    }

    #[test]
    fn test_crlf_block() {
        let meta = parse_frontmatter("---\r\ntitle: Win\r\n---\r\nbody");
        assert_eq!(meta.title.as_deref(), Some("Win"));
    }
}
