//! Markup cleaning capability.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;

/// Sanitizes and normalizes SVG markup.
///
/// Implementations must fail with [`ErrorKind::InvalidMarkup`] on malformed
/// input, and return an empty string for empty input.
#[async_trait]
pub trait Cleaner: Send + Sync {
    async fn clean(&self, markup: &str) -> Result<String>;
}

/// Cleans markup by round-tripping it through `usvg`.
///
/// Parsing resolves styles, `use` references and transforms, and drops
/// everything that does not render (scripts, metadata, editor cruft).
/// The tree is written back without indentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsvgCleaner;

impl UsvgCleaner {
    fn clean_blocking(markup: &str) -> Result<String> {
        let tree = usvg::Tree::from_str(markup, &usvg::Options::default()).or_raise(|| ErrorKind::InvalidMarkup)?;
        let write_options = usvg::WriteOptions {
            indent: usvg::Indent::None,
            ..Default::default()
        };
        Ok(tree.to_string(&write_options))
    }
}

#[async_trait]
impl Cleaner for UsvgCleaner {
    #[tracing::instrument(skip(self, markup), fields(markup_size = markup.len()))]
    async fn clean(&self, markup: &str) -> Result<String> {
        if markup.trim().is_empty() {
            return Ok(String::new());
        }
        let markup = markup.to_string();
        tokio::task::spawn_blocking(move || Self::clean_blocking(&markup))
            .await
            .or_raise(|| ErrorKind::Task)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_markup() {
        assert_eq!(UsvgCleaner.clean("").await.unwrap(), "");
        assert_eq!(UsvgCleaner.clean("  \n").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_malformed_markup() {
        let err = UsvgCleaner.clean("<svg").await.unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidMarkup);
        let err = UsvgCleaner.clean("not markup at all").await.unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidMarkup);
    }

    #[tokio::test]
    async fn test_strips_scripts_and_indentation() {
        let dirty = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
            <script>alert(1)</script>
            <rect width="10" height="10" fill="red"/>
        </svg>"#;
        let cleaned = UsvgCleaner.clean(dirty).await.unwrap();
        assert!(cleaned.starts_with("<svg"));
        assert!(!cleaned.contains("script"));
        assert!(!cleaned.contains('\n'));
    }
}
