//! Class labels

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{ClassifierError, Result};

/// Artists the bundled model was trained on, in output order
pub const DEFAULT_LABELS: [&str; 11] = [
    "Shankar Mahadevan",
    "Lata Mangeshkar",
    "Kishore Kumar",
    "Arijit Singh",
    "Shreya Ghoshal",
    "A.R. Rahman",
    "Alka Yagnik",
    "Neha Kakkar",
    "Asha Bhosle",
    "Sonu Nigam",
    "Mohammed Rafi",
];

/// Ordered, non-empty list of class names. Index `i` names output `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ClassifierError::invalid_labels("label set is empty"));
        }
        if let Some(i) = labels.iter().position(|l| l.trim().is_empty()) {
            return Err(ClassifierError::invalid_labels(format!(
                "label {} is blank",
                i
            )));
        }
        Ok(Self { labels })
    }

    /// Load labels from a text file, one per line. Blank lines are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let set = Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty()),
        )?;
        info!("Loaded {} labels from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Never true for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_labels() {
        let labels = LabelSet::default();
        assert_eq!(labels.len(), 11);
        assert_eq!(labels.get(0), Some("Shankar Mahadevan"));
        assert_eq!(labels.get(10), Some("Mohammed Rafi"));
        assert_eq!(labels.get(11), None);
        assert_eq!(labels.position("A.R. Rahman"), Some(5));
    }

    #[test]
    fn test_rejects_empty_and_blank() {
        assert!(matches!(
            LabelSet::new(Vec::<String>::new()),
            Err(ClassifierError::InvalidLabels(_))
        ));
        assert!(matches!(
            LabelSet::new(["a", "  ", "c"]),
            Err(ClassifierError::InvalidLabels(_))
        ));
    }

    #[test]
    fn test_from_file_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        fs::write(&path, "Alpha\n\n  Beta  \nGamma\n").unwrap();

        let labels = LabelSet::from_file(&path).unwrap();
        let names: Vec<&str> = labels.iter().collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn test_from_missing_file_is_io() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            LabelSet::from_file(dir.path().join("nope.txt")),
            Err(ClassifierError::Io(_))
        ));
    }
}
