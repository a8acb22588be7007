//! Article text from the corpus directory tree.

use std::io::ErrorKind;
use std::path::PathBuf;

use inpho_core::{Error, Result, TextSupply};

/// Reads `<root>/<article>/<file>` as the article's plain text.
#[derive(Debug, Clone)]
pub struct FilesystemTextSupply {
    root: PathBuf,
    file_name: String,
}

impl FilesystemTextSupply {
    pub fn new(root: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            file_name: file_name.into(),
        }
    }

    /// Text supply over the configured corpus tree.
    pub fn from_config(config: &crate::config::PipelineConfig) -> Self {
        Self::new(&config.corpus_path, &config.article_file)
    }

    fn path_of(&self, article: &str) -> Result<PathBuf> {
        // Article keys are single directory names and the first token of
        // space-separated basket lines.
        if article.is_empty()
            || article == ".."
            || article.contains(['/', '\\'])
            || article.contains(char::is_whitespace)
        {
            return Err(Error::InvalidInput(format!("Invalid article key: {:?}", article)));
        }
        Ok(self.root.join(article).join(&self.file_name))
    }
}

impl TextSupply for FilesystemTextSupply {
    fn extract_text(&self, article: &str) -> Result<String> {
        let path = self.path_of(article)?;
        let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound(format!("article {}", article)),
            _ => Error::Scan(format!("{}: {}", path.display(), e)),
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_article_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("locke")).unwrap();
        std::fs::write(dir.path().join("locke/index.txt"), "Locke was an empiricist.").unwrap();

        let supply = FilesystemTextSupply::new(dir.path(), "index.txt");
        assert_eq!(
            supply.extract_text("locke").unwrap(),
            "Locke was an empiricist."
        );
    }

    #[test]
    fn test_missing_article_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let supply = FilesystemTextSupply::new(dir.path(), "index.txt");
        let err = supply.extract_text("hume").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let supply = FilesystemTextSupply::new(dir.path(), "index.txt");
        assert!(matches!(
            supply.extract_text("../etc"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(supply.extract_text(""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_whitespace_in_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("free will")).unwrap();
        std::fs::write(dir.path().join("free will/index.txt"), "Free will.").unwrap();

        let supply = FilesystemTextSupply::new(dir.path(), "index.txt");
        for key in ["free will", "kant\t", "\nhume"] {
            let err = supply.extract_text(key).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{key:?}");
        }
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("kant")).unwrap();
        std::fs::write(dir.path().join("kant/index.txt"), b"Kant \xff critique").unwrap();

        let supply = FilesystemTextSupply::new(dir.path(), "index.txt");
        let text = supply.extract_text("kant").unwrap();
        assert!(text.starts_with("Kant "));
        assert!(text.ends_with(" critique"));
    }
}
