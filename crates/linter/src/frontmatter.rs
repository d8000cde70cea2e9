/// A parsed YAML frontmatter block from a markdown artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    pub data: serde_yaml::Value,
    /// Byte offset where the body (after the closing delimiter) starts.
    pub body_start: usize,
}

impl Frontmatter {
    /// String value of a top-level key, if present and scalar.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(serde_yaml::Value::as_str)
    }

    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.data.get(key).is_some()
    }

    /// The markdown body following the frontmatter block.
    #[must_use]
    pub fn body<'a>(&self, content: &'a str) -> &'a str {
        content.get(self.body_start..).unwrap_or_default()
    }
}

/// Extract and parse a leading `---` frontmatter block.
///
/// `Ok(None)` when the file has no frontmatter; `Err` when a block is
/// present but its YAML does not parse, or the closing delimiter is
/// missing.
pub fn parse_frontmatter(content: &str) -> Result<Option<Frontmatter>, String> {
    let rest = content.strip_prefix("---").map(|r| {
        r.strip_prefix('\n')
            .or_else(|| r.strip_prefix("\r\n"))
            .unwrap_or(r)
    });
    let Some(after_open) = rest else {
        return Ok(None);
    };
    if !content.starts_with("---\n") && !content.starts_with("---\r\n") {
        return Ok(None);
    }

    let mut offset = content.len() - after_open.len();
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &content[content.len() - after_open.len()..offset];
            let data: serde_yaml::Value = serde_yaml::from_str(yaml)
                .map_err(|e| format!("invalid frontmatter YAML: {e}"))?;
            return Ok(Some(Frontmatter {
                data,
                body_start: offset + line.len(),
            }));
        }
        offset += line.len();
    }

    Err("frontmatter block is missing its closing '---'".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_frontmatter_and_body() {
        let content = "---\nname: review\ndescription: Reviews code\n---\n# Body\n";
        let fm = parse_frontmatter(content).unwrap().unwrap();
        assert_eq!(fm.get_str("name"), Some("review"));
        assert_eq!(fm.body(content), "# Body\n");
    }

    #[test]
    fn test_no_frontmatter_is_none() {
        assert_eq!(parse_frontmatter("# Just markdown\n").unwrap(), None);
        assert_eq!(parse_frontmatter("").unwrap(), None);
    }

    #[test]
    fn test_dashes_mid_document_are_not_frontmatter() {
        assert_eq!(parse_frontmatter("intro\n---\nkey: value\n---\n").unwrap(), None);
    }

    #[test]
    fn test_unterminated_block_is_an_error() {
        assert!(parse_frontmatter("---\nname: x\n").is_err());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(parse_frontmatter("---\nname: [unclosed\n---\nbody\n").is_err());
    }
}
