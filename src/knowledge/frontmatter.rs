// file: src/knowledge/frontmatter.rs
// description: YAML frontmatter extraction from markdown documents
// reference: https://docs.rs/yaml-rust

use crate::error::{AssistantError, Result};
use std::collections::HashMap;
use yaml_rust::{Yaml, YamlLoader};

pub struct FrontmatterParser;

#[derive(Debug, Clone, Default)]
pub struct Frontmatter {
    pub fields: HashMap<String, String>,
}

impl FrontmatterParser {
    pub fn new() -> Self {
        Self
    }

    /// Split a document into its frontmatter block and remaining body.
    /// Returns None when the document carries no frontmatter.
    pub fn extract(&self, content: &str) -> Result<Option<(Frontmatter, String)>> {
        if !content.starts_with("---") {
            return Ok(None);
        }

        let parts: Vec<&str> = content.splitn(3, "---").collect();

        if parts.len() < 3 {
            return Ok(None);
        }

        let yaml_content = parts[1].trim();
        let remaining_content = parts[2].trim();

        let docs = YamlLoader::load_from_str(yaml_content).map_err(|e| {
            AssistantError::DocumentParse {
                file: "frontmatter".to_string(),
                message: format!("YAML parse error: {}", e),
            }
        })?;

        if docs.is_empty() {
            return Ok(None);
        }

        let mut fields = HashMap::new();

        if let Yaml::Hash(hash) = &docs[0] {
            for (key, value) in hash {
                if let (Yaml::String(k), Yaml::String(v)) = (key, value) {
                    fields.insert(k.clone(), v.clone());
                } else if let Yaml::String(k) = key {
                    fields.insert(k.clone(), format!("{:?}", value));
                }
            }
        }

        Ok(Some((
            Frontmatter { fields },
            remaining_content.to_string(),
        )))
    }
}

impl Default for FrontmatterParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_frontmatter() {
        let parser = FrontmatterParser::new();
        let content = "---\ntitle: Test\nauthor: Someone\n---\n\nBody content";

        let (fm, body) = parser.extract(content).unwrap().unwrap();
        assert_eq!(fm.fields.get("title").map(String::as_str), Some("Test"));
        assert_eq!(body, "Body content");
    }

    #[test]
    fn test_no_frontmatter() {
        let parser = FrontmatterParser::new();
        assert!(parser.extract("# Just a heading").unwrap().is_none());
    }

    #[test]
    fn test_unterminated_frontmatter() {
        let parser = FrontmatterParser::new();
        assert!(parser.extract("---\ntitle: Broken").unwrap().is_none());
    }
}
