//! Bulk import of scraped articles.
//!
//! The input is a JSON array of records:
//!
//! ```json
//! [{"title": "...", "authors": "A. Writer", "content": "...",
//!   "url": "https://...", "publish_date": "2024-05-01"}]
//! ```
//!
//! `authors` may also be a list of names. When a `url` is present the stored text
//! starts with it in parentheses, followed by a blank line and the content.

use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::NewsroomError;
use crate::newsroom::NewArticle;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Authors {
    One(String),
    Many(Vec<String>),
}

impl Authors {
    fn joined(&self) -> String {
        match self {
            Authors::One(name) => name.clone(),
            Authors::Many(names) => names.join(", "),
        }
    }
}

impl Default for Authors {
    fn default() -> Self {
        Authors::One(String::new())
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub title: String,
    #[serde(default)]
    pub authors: Authors,
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    pub publish_date: String,
}

impl ImportRecord {
    /// Convert into a submittable article.
    ///
    /// `publish_date` must start with a `YYYY-MM-DD` date; anything after it (a time
    /// of day, a zone) is ignored.
    pub fn to_article(&self) -> Result<NewArticle, NewsroomError> {
        let date_part = self.publish_date.trim().get(..10).unwrap_or(&self.publish_date);
        let publish_date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
            NewsroomError::InvalidArticle(format!(
                "bad publish_date {:?}: {}",
                self.publish_date, e
            ))
        })?;
        let text = match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => format!("({})\n\n{}", url, self.content),
            _ => self.content.clone(),
        };
        Ok(NewArticle {
            title: self.title.clone(),
            authors: self.authors.joined(),
            publish_date,
            text,
        })
    }
}

/// Parse a JSON array of import records.
pub fn parse_records(json: &str) -> Result<Vec<ImportRecord>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Read and parse an import file.
pub fn load_records(path: &Path) -> Result<Vec<ImportRecord>, NewsroomError> {
    let json = fs::read_to_string(path)?;
    parse_records(&json).map_err(|e| {
        NewsroomError::InvalidArticle(format!("{}: not an import file: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"[
        {"title": "Rain", "authors": "A. Writer", "content": "It rains.",
         "url": "https://example.org/rain", "publish_date": "2024-05-01"},
        {"title": "Sun", "authors": ["B. One", "C. Two"], "content": "It shines.",
         "publish_date": "2024-06-02T08:00:00Z"}
    ]"#;

    #[test]
    fn test_parse_and_convert() {
        let records = parse_records(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);

        let rain = records[0].to_article().unwrap();
        assert_eq!(rain.text, "(https://example.org/rain)\n\nIt rains.");
        assert_eq!(rain.authors, "A. Writer");
        assert_eq!(rain.publish_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        let sun = records[1].to_article().unwrap();
        assert_eq!(sun.text, "It shines.");
        assert_eq!(sun.authors, "B. One, C. Two");
        assert_eq!(sun.publish_date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let records = parse_records(
            r#"[{"title": "T", "content": "C", "publish_date": "yesterday"}]"#,
        )
        .unwrap();
        assert_eq!(records[0].authors, Authors::default());
        assert!(matches!(
            records[0].to_article(),
            Err(NewsroomError::InvalidArticle(_))
        ));
    }

    #[test]
    fn test_load_records_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let records = load_records(file.path()).unwrap();
        assert_eq!(records[1].title, "Sun");
    }

    #[test]
    fn test_not_an_array() {
        assert!(parse_records(r#"{"title": "T"}"#).is_err());

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        assert!(matches!(
            load_records(file.path()),
            Err(NewsroomError::InvalidArticle(_))
        ));
    }
}
