//! Mock ads archive for testing the data source and pipeline without a
//! live archive.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AdsArchive, Availability, CompetitorAd};
use crate::error::Result;

/// A scripted archive: per-term outcomes, configurable availability.
pub struct MockArchive {
    availability: Availability,
    outcomes: Mutex<HashMap<String, Result<Vec<CompetitorAd>>>>,
}

impl MockArchive {
    /// An archive with no credential configured.
    pub fn unconfigured() -> Self {
        Self {
            availability: Availability {
                configured: false,
                valid: false,
                reason: Some("no credential".to_string()),
            },
            outcomes: Mutex::new(HashMap::new()),
        }
    }

    /// An archive whose probe succeeds. Terms without a scripted outcome
    /// return an empty result set.
    pub fn available() -> Self {
        Self {
            availability: Availability {
                configured: true,
                valid: true,
                reason: None,
            },
            outcomes: Mutex::new(HashMap::new()),
        }
    }

    /// An archive whose credential is present but rejected.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            availability: Availability {
                configured: true,
                valid: false,
                reason: Some(reason.into()),
            },
            outcomes: Mutex::new(HashMap::new()),
        }
    }

    /// Script the outcome of one search term.
    pub fn on_term(self, term: impl Into<String>, outcome: Result<Vec<CompetitorAd>>) -> Self {
        self.outcomes.lock().unwrap().insert(term.into(), outcome);
        self
    }
}

#[async_trait]
impl AdsArchive for MockArchive {
    async fn check_availability(&self) -> Availability {
        self.availability.clone()
    }

    async fn search(&self, term: &str) -> Result<Vec<CompetitorAd>> {
        match self.outcomes.lock().unwrap().remove(term) {
            Some(outcome) => outcome,
            None => Ok(Vec::new()),
        }
    }
}

// Manual impl because scripted errors are not Clone.
impl std::fmt::Debug for MockArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockArchive")
            .field("availability", &self.availability)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::test_ad;

    #[tokio::test]
    async fn test_unscripted_term_empty() {
        let archive = MockArchive::available();
        assert!(archive.search("anything").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scripted_term_returned_once() {
        let archive = MockArchive::available().on_term("roofing", Ok(vec![test_ad("1", "Rival")]));
        assert_eq!(archive.search("roofing").await.unwrap().len(), 1);
        // Consumed; falls back to empty
        assert!(archive.search("roofing").await.unwrap().is_empty());
    }
}
