// file: src/knowledge/markdown.rs
// description: markdown to plain text extraction with pulldown-cmark
// reference: https://docs.rs/pulldown-cmark

use crate::error::Result;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

pub struct MarkdownExtractor;

/// Plain-text view of a markdown document: the first top-level heading (if
/// any) plus the readable text, with formatting and link targets dropped.
/// Code blocks are kept inline since knowledge-base articles often carry
/// meaningful examples.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub title: Option<String>,
    pub text: String,
}

impl MarkdownExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, content: &str) -> Result<ExtractedText> {
        let parser = Parser::new(content);

        let mut text = String::new();
        let mut title: Option<String> = None;
        let mut current_heading: Option<(u32, String)> = None;
        let mut in_code_block = false;

        for event in parser {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    current_heading = Some((level as u32, String::new()));
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some((level, heading_text)) = current_heading.take() {
                        let heading_text = heading_text.trim().to_string();
                        if level == 1 && title.is_none() && !heading_text.is_empty() {
                            title = Some(heading_text.clone());
                        }
                        if !heading_text.is_empty() {
                            text.push_str(&heading_text);
                            text.push('\n');
                        }
                    }
                }
                Event::Start(Tag::CodeBlock(_)) => {
                    in_code_block = true;
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    text.push('\n');
                }
                Event::Text(t) => {
                    if let Some((_, ref mut heading_text)) = current_heading {
                        heading_text.push_str(&t);
                    } else {
                        text.push_str(&t);
                        if !in_code_block {
                            text.push(' ');
                        }
                    }
                }
                Event::Code(code) => {
                    if let Some((_, ref mut heading_text)) = current_heading {
                        heading_text.push_str(&code);
                    } else {
                        text.push_str(&code);
                        text.push(' ');
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    text.push('\n');
                }
                Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Item) => {
                    text.push('\n');
                }
                _ => {}
            }
        }

        Ok(ExtractedText {
            title,
            text: text.trim().to_string(),
        })
    }
}

impl Default for MarkdownExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_extraction() {
        let extractor = MarkdownExtractor::new();
        let content = "# Refund Policy\n\nRefunds are accepted within **30 days**.";
        let extracted = extractor.extract(content).unwrap();

        assert_eq!(extracted.title.as_deref(), Some("Refund Policy"));
        assert!(extracted.text.contains("Refunds are accepted"));
        assert!(!extracted.text.contains("**"));
    }

    #[test]
    fn test_link_targets_dropped() {
        let extractor = MarkdownExtractor::new();
        let extracted = extractor
            .extract("See [the docs](https://example.com/docs) for details.")
            .unwrap();

        assert!(extracted.text.contains("the docs"));
        assert!(!extracted.text.contains("https://example.com"));
    }

    #[test]
    fn test_code_blocks_kept() {
        let extractor = MarkdownExtractor::new();
        let extracted = extractor
            .extract("Run:\n\n```sh\nvoice_rag ingest\n```\n")
            .unwrap();

        assert!(extracted.text.contains("voice_rag ingest"));
    }

    #[test]
    fn test_no_heading_means_no_title() {
        let extractor = MarkdownExtractor::new();
        let extracted = extractor.extract("Just a paragraph.").unwrap();
        assert!(extracted.title.is_none());
    }
}
