//! Documents read from local markdown or HTML files.

use std::path::Path;

use crate::document::{DocMetadata, DocType, Document};
use crate::scrape::parse::clean_markdown;
use crate::{Error, Result};

const LOCAL_CATEGORY: &str = "local";

/// Build a [`Document`] from a local file.
///
/// The title is the first `# ` heading, else the file stem. The url is the
/// file's absolute `file://` url, so indexing the same file twice targets the
/// same document.
pub async fn load_file(path: &Path, doc_type: DocType, module: Option<String>) -> Result<Document> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Scrape(format!("failed to read {}: {e}", path.display())))?;
    let absolute = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| Error::Scrape(format!("failed to resolve {}: {e}", path.display())))?;
    let url = url::Url::from_file_path(&absolute)
        .map_err(|()| Error::InvalidInput(format!("not a file path: {}", absolute.display())))?;

    document_from_markup(&raw, url.as_str(), title_from_path(path), doc_type, module)
}

/// Pure half of [`load_file`]: `fallback_title` is used when `raw` has no
/// top-level heading.
pub fn document_from_markup(
    raw: &str,
    url: &str,
    fallback_title: String,
    doc_type: DocType,
    module: Option<String>,
) -> Result<Document> {
    let title = raw
        .lines()
        .find_map(|line| line.trim().strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or(fallback_title);

    Ok(Document {
        title,
        content: clean_markdown(raw)?,
        url: url.to_string(),
        doc_type,
        metadata: DocMetadata {
            module,
            category: Some(LOCAL_CATEGORY.to_string()),
            ..Default::default()
        },
    })
}

fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_heading() {
        let doc = document_from_markup(
            "Intro\n# Error handling\n\nUse `?` to propagate.",
            "file:///docs/errors.md",
            "errors".to_string(),
            DocType::Guide,
            Some("std".to_string()),
        )
        .unwrap();

        assert_eq!(doc.title, "Error handling");
        assert_eq!(doc.content, "Intro # Error handling Use to propagate.");
        assert_eq!(doc.metadata.module_name(), Some("std"));
        assert_eq!(doc.metadata.category.as_deref(), Some("local"));
    }

    #[test]
    fn test_title_falls_back_to_stem() {
        let doc = document_from_markup(
            "<p>No heading here</p>",
            "file:///docs/notes.html",
            "notes".to_string(),
            DocType::Guide,
            None,
        )
        .unwrap();
        assert_eq!(doc.title, "notes");
        assert_eq!(doc.content, "No heading here");
    }

    #[tokio::test]
    async fn test_load_file() {
        let path = std::env::temp_dir().join(format!("docgraph-local-{}.md", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "# Iterators\n\nLazy adapters.\n").await.unwrap();

        let doc = load_file(&path, DocType::Std, None).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(doc.title, "Iterators");
        assert_eq!(doc.content, "# Iterators Lazy adapters.");
        assert!(doc.url.starts_with("file://"));
        assert_eq!(doc.doc_type, DocType::Std);
    }

    #[tokio::test]
    async fn test_missing_file_is_scrape_error() {
        let err = load_file(Path::new("/nonexistent/docgraph.md"), DocType::Guide, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Scrape(_)));
    }
}
