// file: src/knowledge/reader.rs
// description: data directory walking and document loading with filtering
// reference: https://docs.rs/walkdir

use crate::config::KnowledgeConfig;
use crate::error::{AssistantError, Result};
use crate::knowledge::frontmatter::FrontmatterParser;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const TEXT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

pub struct DirectoryReader {
    config: KnowledgeConfig,
    frontmatter: FrontmatterParser,
}

#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub relative_path: String,
    pub content: String,
    pub title: Option<String>,
    pub size: u64,
    pub modified: u64,
}

impl DirectoryReader {
    pub fn new(config: KnowledgeConfig) -> Self {
        Self {
            config,
            frontmatter: FrontmatterParser::new(),
        }
    }

    /// Load every readable text document under the data directory. A missing
    /// directory is a hard error: the index cannot be built without a corpus.
    pub fn load_documents(&self) -> Result<Vec<LoadedDocument>> {
        let root = self.config.data_dir.clone();

        if !root.is_dir() {
            return Err(AssistantError::Validation(format!(
                "Data directory does not exist: {}",
                root.display()
            )));
        }

        info!("Loading documents from: {}", root.display());
        let mut documents = Vec::new();

        for entry in WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();

            if self.should_skip(path) {
                debug!("Skipping file: {}", path.display());
                continue;
            }

            if !has_text_extension(path) {
                debug!("Skipping non-text file: {}", path.display());
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    debug!("Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };

            let size = metadata.len();
            let max_size = (self.config.max_file_size_mb * 1024 * 1024) as u64;
            if size > max_size {
                debug!(
                    "Skipping large file ({} MB): {}",
                    size / 1024 / 1024,
                    path.display()
                );
                continue;
            }

            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);

            let relative_path = path
                .strip_prefix(&root)
                .unwrap_or(path)
                .to_string_lossy()
                .to_string();

            match self.read_document(path, relative_path, size, modified) {
                Ok(doc) => documents.push(doc),
                Err(e) => debug!("Skipping unreadable file {}: {}", path.display(), e),
            }
        }

        info!("Loaded {} documents", documents.len());
        Ok(documents)
    }

    fn read_document(
        &self,
        path: &Path,
        relative_path: String,
        size: u64,
        modified: u64,
    ) -> Result<LoadedDocument> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            AssistantError::FileOperation {
                path: path.to_path_buf(),
                source,
            }
        })?;

        // Frontmatter contributes a title but never ends up in the index.
        let (title, content) = match self.frontmatter.extract(&raw)? {
            Some((fm, body)) => (fm.fields.get("title").cloned(), body),
            None => (None, raw),
        };

        Ok(LoadedDocument {
            path: path.to_path_buf(),
            relative_path,
            content,
            title,
            size,
            modified,
        })
    }

    fn should_skip(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        for pattern in &self.config.skip_patterns {
            if pattern.contains('*') {
                let pattern_without_star = pattern.replace("*.", ".");
                if path_str.ends_with(&pattern_without_star) {
                    return true;
                }
            } else if path_str.contains(pattern) {
                return true;
            }
        }

        false
    }
}

fn has_text_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(dir: &Path) -> KnowledgeConfig {
        KnowledgeConfig {
            data_dir: dir.to_path_buf(),
            chunk_size: 512,
            max_file_size_mb: 10,
            skip_patterns: vec![],
            strip_markdown: true,
            parallel_workers: 1,
        }
    }

    #[test]
    fn test_load_documents() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("policy.md"), "# Refunds\n\n30 days.").unwrap();
        fs::write(temp.path().join("notes.txt"), "Plain notes.").unwrap();
        fs::write(temp.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let reader = DirectoryReader::new(test_config(temp.path()));
        let docs = reader.load_documents().unwrap();

        assert_eq!(docs.len(), 2);
        assert!(docs.iter().any(|d| d.relative_path == "policy.md"));
        assert!(docs.iter().any(|d| d.relative_path == "notes.txt"));
    }

    #[test]
    fn test_missing_directory_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent");
        let reader = DirectoryReader::new(test_config(&missing));
        assert!(reader.load_documents().is_err());
    }

    #[test]
    fn test_frontmatter_title_extracted() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("doc.md"),
            "---\ntitle: Refund Policy\n---\n\nBody text.",
        )
        .unwrap();

        let reader = DirectoryReader::new(test_config(temp.path()));
        let docs = reader.load_documents().unwrap();

        assert_eq!(docs[0].title.as_deref(), Some("Refund Policy"));
        assert!(!docs[0].content.contains("title:"));
    }

    #[test]
    fn test_skip_patterns() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("keep.md"), "keep").unwrap();
        fs::write(temp.path().join("drop.md"), "drop").unwrap();

        let mut config = test_config(temp.path());
        config.skip_patterns = vec!["drop".to_string()];

        let reader = DirectoryReader::new(config);
        let docs = reader.load_documents().unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].relative_path, "keep.md");
    }
}
