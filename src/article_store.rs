//! # Flat-file article store
//!
//! Article bodies and generated summaries are plain UTF-8 text files, one per
//! article, under the configured `articles_dir`:
//!
//! ```text
//! <articles_dir>/articles/<id>.txt
//! <articles_dir>/summaries/<id>.txt
//! ```
//!
//! Both are written once. A second write of the same article fails; a second write
//! of the same summary (two requests racing to generate it) keeps the first copy.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::ArticleId;

#[derive(Debug, Clone)]
pub struct ArticleStore {
    root: PathBuf,
}

impl ArticleStore {
    /// Open the store at `root`, creating `articles/` and `summaries/` if needed.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let store = Self { root: root.into() };
        fs::create_dir_all(store.root.join("articles"))?;
        fs::create_dir_all(store.root.join("summaries"))?;
        info!("Article store at {}", store.root.display());
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn article_path(&self, id: ArticleId) -> PathBuf {
        self.root.join("articles").join(format!("{id}.txt"))
    }

    pub fn summary_path(&self, id: ArticleId) -> PathBuf {
        self.root.join("summaries").join(format!("{id}.txt"))
    }

    /// Write the body of a new article. Fails with `AlreadyExists` if one is stored.
    pub fn write_article(&self, id: ArticleId, text: &str) -> io::Result<()> {
        write_new(&self.article_path(id), text)
    }

    /// The body of `id`, or `None` if no file exists.
    pub fn read_article(&self, id: ArticleId) -> io::Result<Option<String>> {
        read_optional(&self.article_path(id))
    }

    /// Remove the body of `id`. Returns `false` if there was nothing to remove.
    pub fn remove_article(&self, id: ArticleId) -> io::Result<bool> {
        match fs::remove_file(self.article_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The cached summary of `id`, if one has been generated.
    pub fn read_summary(&self, id: ArticleId) -> io::Result<Option<String>> {
        read_optional(&self.summary_path(id))
    }

    /// Cache `summary` for `id` and return the summary now on disk, with `true` if
    /// this call created the file.
    ///
    /// If another writer got there first, its copy wins and is returned with `false`.
    pub fn write_summary(&self, id: ArticleId, summary: &str) -> io::Result<(String, bool)> {
        let path = self.summary_path(id);
        match write_new(&path, summary) {
            Ok(()) => Ok((summary.to_string(), true)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(article_id = id, "summary already cached");
                Ok((fs::read_to_string(path)?, false))
            }
            Err(e) => Err(e),
        }
    }
}

fn write_new(path: &Path, text: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(text.as_bytes())?;
    file.sync_all()
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ArticleStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArticleStore::open(dir.path().join("store")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_layout() {
        let (_dir, store) = store();
        assert!(store.root().join("articles").is_dir());
        assert!(store.root().join("summaries").is_dir());
    }

    #[test]
    fn test_article_write_once() {
        let (_dir, store) = store();
        store.write_article(1, "Body text.").unwrap();
        assert_eq!(store.read_article(1).unwrap().as_deref(), Some("Body text."));

        let err = store.write_article(1, "Other body.").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(store.read_article(1).unwrap().as_deref(), Some("Body text."));
    }

    #[test]
    fn test_missing_article_is_none() {
        let (_dir, store) = store();
        assert_eq!(store.read_article(42).unwrap(), None);
        assert!(!store.remove_article(42).unwrap());
    }

    #[test]
    fn test_remove_article() {
        let (_dir, store) = store();
        store.write_article(3, "Body.").unwrap();
        assert!(store.remove_article(3).unwrap());
        assert_eq!(store.read_article(3).unwrap(), None);
    }

    #[test]
    fn test_first_summary_wins() {
        let (_dir, store) = store();
        assert_eq!(store.read_summary(1).unwrap(), None);
        assert_eq!(
            store.write_summary(1, "First.").unwrap(),
            ("First.".to_string(), true)
        );
        assert_eq!(
            store.write_summary(1, "Second.").unwrap(),
            ("First.".to_string(), false)
        );
        assert_eq!(store.read_summary(1).unwrap().as_deref(), Some("First."));
    }
}
