//! Conditional competitor-ads retrieval.
//!
//! [`CompetitorDataSource`] probes the ads archive for availability, runs
//! one query per distinct search term derived from the profile, classifies
//! the results as own vs. competitor ads, and derives summary insights.
//!
//! This whole component is best-effort: a missing or invalid credential, or
//! failures of individual queries, degrade to partial or empty results and
//! are logged, never raised. The pipeline must be able to run without it.

pub mod archive;
pub mod insights;
pub mod mock;

pub use archive::{ArchiveConfig, MetaAdsArchive};
pub use insights::Insight;
pub use mock::MockArchive;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::profile::BusinessProfile;

/// One ad record from the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorAd {
    pub id: String,
    pub page_id: String,
    pub page_name: String,
    pub headline: String,
    pub body: String,
    pub platforms: Vec<String>,
    pub is_active: bool,
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impressions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spend: Option<String>,
}

/// Result of the cheap credential probe.
#[derive(Debug, Clone)]
pub struct Availability {
    /// A credential is present in configuration.
    pub configured: bool,
    /// The probe call succeeded with that credential.
    pub valid: bool,
    /// Why the archive is unusable, when it is.
    pub reason: Option<String>,
}

impl Availability {
    pub fn usable(&self) -> bool {
        self.configured && self.valid
    }
}

/// Read-only client for an external ads archive.
#[async_trait]
pub trait AdsArchive: Send + Sync {
    /// Probe credential validity with one cheap call. Never errors —
    /// every failure mode is an unusable [`Availability`].
    async fn check_availability(&self) -> Availability;

    /// Run one search query. Individual query failures are the caller's
    /// problem to absorb.
    async fn search(&self, term: &str) -> Result<Vec<CompetitorAd>>;
}

/// Ads partitioned by ownership, plus derived insights.
#[derive(Debug, Clone, Default)]
pub struct CompetitorData {
    pub own_ads: Vec<CompetitorAd>,
    pub competitor_ads: Vec<CompetitorAd>,
    pub insights: Vec<Insight>,
    /// Whether the archive actually contributed data to this run. Drives
    /// `CompetitorAnalysis::data_source`.
    pub available: bool,
}

impl CompetitorData {
    /// The degraded result used when the archive is unusable.
    pub fn unavailable() -> Self {
        Self {
            insights: insights::derive(&[]),
            ..Self::default()
        }
    }
}

/// Orchestrates availability probing, querying, classification, and
/// insight derivation over an [`AdsArchive`].
pub struct CompetitorDataSource {
    archive: Arc<dyn AdsArchive>,
}

impl CompetitorDataSource {
    pub fn new(archive: Arc<dyn AdsArchive>) -> Self {
        Self { archive }
    }

    /// Gather competitor data for a profile. Infallible by design: any
    /// archive-level failure degrades to [`CompetitorData::unavailable`].
    pub async fn gather(&self, profile: &BusinessProfile) -> CompetitorData {
        let availability = self.archive.check_availability().await;
        if !availability.usable() {
            info!(
                reason = availability.reason.as_deref().unwrap_or("unknown"),
                "ads archive unusable, continuing without external data"
            );
            return CompetitorData::unavailable();
        }

        let terms = search_terms(profile);
        if terms.is_empty() {
            debug!("no non-empty search terms derived from profile");
            return CompetitorData::unavailable();
        }

        // Queries are independent; run them concurrently. join_all yields
        // results in input order, which keeps the merge deterministic.
        let results = join_all(terms.iter().map(|t| self.archive.search(t))).await;

        let mut ads = Vec::new();
        let mut seen = HashSet::new();
        let mut succeeded = 0usize;
        for (term, result) in terms.iter().zip(results) {
            match result {
                Ok(batch) => {
                    succeeded += 1;
                    for ad in batch {
                        // Two terms can match the same ad
                        if seen.insert(ad.id.clone()) {
                            ads.push(ad);
                        }
                    }
                }
                Err(e) => {
                    warn!(term = term.as_str(), error = %e, "ads query failed, skipping term");
                }
            }
        }

        if succeeded == 0 {
            info!("every ads query failed, continuing without external data");
            return CompetitorData::unavailable();
        }

        let (own_ads, competitor_ads) = classify(ads, &profile.company_name);
        let insights = insights::derive(&competitor_ads);

        CompetitorData {
            own_ads,
            competitor_ads,
            insights,
            available: true,
        }
    }
}

/// Distinct non-empty search terms derived from the profile.
fn search_terms(profile: &BusinessProfile) -> Vec<String> {
    let mut terms = Vec::new();
    for candidate in [&profile.product_description, &profile.company_name] {
        let candidate = candidate.trim();
        if !candidate.is_empty() && !terms.iter().any(|t: &String| t == candidate) {
            terms.push(candidate.to_string());
        }
    }
    terms
}

/// Partition ads into (own, competitor).
///
/// An ad is "own" when its page name case-insensitively contains the
/// company name. This is a heuristic: short or generic company names can
/// misclassify, but the archive exposes no stronger identity signal.
fn classify(ads: Vec<CompetitorAd>, company_name: &str) -> (Vec<CompetitorAd>, Vec<CompetitorAd>) {
    let needle = company_name.trim().to_lowercase();
    if needle.is_empty() {
        return (Vec::new(), ads);
    }
    ads.into_iter()
        .partition(|ad| ad.page_name.to_lowercase().contains(&needle))
}

#[cfg(test)]
pub(crate) fn test_ad(id: &str, page_name: &str) -> CompetitorAd {
    CompetitorAd {
        id: id.to_string(),
        page_id: format!("page-{id}"),
        page_name: page_name.to_string(),
        headline: format!("Headline {id}"),
        body: "Quality service for your home.".to_string(),
        platforms: vec!["facebook".to_string()],
        is_active: true,
        start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        stop_date: None,
        estimated_audience: None,
        impressions: None,
        spend: None,
    }
}
