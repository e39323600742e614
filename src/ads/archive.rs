//! HTTP client for the Meta Ad Library archive.
//!
//! Read-only queries parameterized by search term, country, active-status
//! filter, and result limit, authenticated with a bearer credential.
//! Availability is probed with a single `limit=1` call before any real
//! query; a missing or rejected credential reports unusable instead of
//! erroring.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{AdsArchive, Availability, CompetitorAd};
use crate::error::{Result, StrategyError};

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v19.0";

/// Static configuration for the archive client.
#[derive(Clone)]
pub struct ArchiveConfig {
    /// Bearer credential. `None` means the archive is not configured.
    pub access_token: Option<String>,
    pub base_url: String,
    /// ISO country code for ad reach filtering.
    pub country: String,
    /// Restrict queries to currently active ads.
    pub active_only: bool,
    /// Maximum results per query.
    pub limit: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            country: "US".to_string(),
            active_only: true,
            limit: 25,
        }
    }
}

impl std::fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("country", &self.country)
            .field("active_only", &self.active_only)
            .field("limit", &self.limit)
            .finish()
    }
}

impl ArchiveConfig {
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Archive client backed by the Meta Ad Library HTTP API.
pub struct MetaAdsArchive {
    client: Client,
    config: ArchiveConfig,
}

/// One ad as the archive returns it.
#[derive(Debug, Deserialize)]
struct ArchiveAd {
    #[serde(default)]
    id: String,
    #[serde(default)]
    page_id: String,
    #[serde(default)]
    page_name: String,
    #[serde(default)]
    ad_creative_link_titles: Vec<String>,
    #[serde(default)]
    ad_creative_bodies: Vec<String>,
    #[serde(default)]
    publisher_platforms: Vec<String>,
    #[serde(default)]
    ad_delivery_start_time: Option<String>,
    #[serde(default)]
    ad_delivery_stop_time: Option<String>,
    #[serde(default)]
    estimated_audience_size: Option<Value>,
    #[serde(default)]
    impressions: Option<Value>,
    #[serde(default)]
    spend: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ArchivePage {
    #[serde(default)]
    data: Vec<ArchiveAd>,
}

impl MetaAdsArchive {
    pub fn new(client: Client, config: ArchiveConfig) -> Self {
        Self { client, config }
    }

    fn query(&self, term: &str, limit: u32) -> reqwest::RequestBuilder {
        let url = format!("{}/ads_archive", self.config.base_url.trim_end_matches('/'));
        let status = if self.config.active_only { "ACTIVE" } else { "ALL" };
        let mut req = self
            .client
            .get(&url)
            .query(&[
                ("search_terms", term),
                ("ad_reached_countries", &self.config.country),
                ("ad_active_status", status),
                ("limit", &limit.to_string()),
                (
                    "fields",
                    "id,page_id,page_name,ad_creative_link_titles,ad_creative_bodies,\
                     publisher_platforms,ad_delivery_start_time,ad_delivery_stop_time,\
                     estimated_audience_size,impressions,spend",
                ),
            ]);
        if let Some(ref token) = self.config.access_token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        req
    }
}

/// Render a `{lower_bound, upper_bound}` range object as `"lower-upper"`.
fn range_label(value: &Option<Value>) -> Option<String> {
    let value = value.as_ref()?;
    let lower = value.get("lower_bound")?;
    match value.get("upper_bound") {
        Some(upper) => Some(format!("{}-{}", as_plain(lower), as_plain(upper))),
        None => Some(format!("{}+", as_plain(lower))),
    }
}

fn as_plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_date(raw: &Option<String>) -> Option<NaiveDate> {
    let raw = raw.as_deref()?;
    // Delivery times come as dates or RFC3339 timestamps
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

impl ArchiveAd {
    fn into_competitor_ad(self) -> CompetitorAd {
        let stop_date = parse_date(&self.ad_delivery_stop_time);
        CompetitorAd {
            headline: self.ad_creative_link_titles.first().cloned().unwrap_or_default(),
            body: self.ad_creative_bodies.first().cloned().unwrap_or_default(),
            is_active: stop_date.is_none(),
            start_date: parse_date(&self.ad_delivery_start_time),
            stop_date,
            estimated_audience: range_label(&self.estimated_audience_size),
            impressions: range_label(&self.impressions),
            spend: range_label(&self.spend),
            id: self.id,
            page_id: self.page_id,
            page_name: self.page_name,
            platforms: self.publisher_platforms,
        }
    }
}

#[async_trait]
impl AdsArchive for MetaAdsArchive {
    async fn check_availability(&self) -> Availability {
        if self.config.access_token.is_none() {
            return Availability {
                configured: false,
                valid: false,
                reason: Some("no ads archive credential configured".to_string()),
            };
        }

        // One cheap probe before committing to real queries
        let outcome = self.query("test", 1).send().await;
        match outcome {
            Ok(resp) if resp.status().is_success() => Availability {
                configured: true,
                valid: true,
                reason: None,
            },
            Ok(resp) => Availability {
                configured: true,
                valid: false,
                reason: Some(format!("probe rejected with HTTP {}", resp.status().as_u16())),
            },
            Err(e) => Availability {
                configured: true,
                valid: false,
                reason: Some(format!("probe failed: {e}")),
            },
        }
    }

    async fn search(&self, term: &str) -> Result<Vec<CompetitorAd>> {
        let resp = self.query(term, self.config.limit).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StrategyError::UpstreamUnavailable(format!(
                "archive query returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }
        let page: ArchivePage = resp.json().await?;
        Ok(page.data.into_iter().map(ArchiveAd::into_competitor_ad).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_debug_redacts_token() {
        let config = ArchiveConfig::default().with_access_token("EAAB-secret");
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("EAAB-secret"));
        assert!(debug_output.contains("***"));
    }

    #[tokio::test]
    async fn test_unconfigured_reports_unusable() {
        let archive = MetaAdsArchive::new(Client::new(), ArchiveConfig::default());
        let availability = archive.check_availability().await;
        assert!(!availability.configured);
        assert!(!availability.valid);
        assert!(availability.reason.is_some());
    }

    #[test]
    fn test_wire_ad_mapping() {
        let ad: ArchiveAd = serde_json::from_value(json!({
            "id": "123",
            "page_id": "p9",
            "page_name": "Rival Roofers",
            "ad_creative_link_titles": ["Best roofs in town"],
            "ad_creative_bodies": ["We fix roofs fast."],
            "publisher_platforms": ["facebook", "instagram"],
            "ad_delivery_start_time": "2024-03-01T08:00:00+0000",
            "estimated_audience_size": {"lower_bound": "1000", "upper_bound": "5000"},
            "impressions": {"lower_bound": "10000"},
        }))
        .unwrap();

        let ad = ad.into_competitor_ad();
        assert_eq!(ad.id, "123");
        assert_eq!(ad.headline, "Best roofs in town");
        assert_eq!(ad.body, "We fix roofs fast.");
        assert_eq!(ad.platforms.len(), 2);
        assert!(ad.is_active);
        assert_eq!(ad.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(ad.estimated_audience.as_deref(), Some("1000-5000"));
        assert_eq!(ad.impressions.as_deref(), Some("10000+"));
        assert!(ad.spend.is_none());
    }

    #[test]
    fn test_stopped_ad_inactive() {
        let ad: ArchiveAd = serde_json::from_value(json!({
            "id": "1",
            "ad_delivery_start_time": "2024-01-01",
            "ad_delivery_stop_time": "2024-02-01",
        }))
        .unwrap();
        let ad = ad.into_competitor_ad();
        assert!(!ad.is_active);
        assert_eq!(ad.stop_date, NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn test_sparse_wire_ad_defaults() {
        let ad: ArchiveAd = serde_json::from_value(json!({"id": "1"})).unwrap();
        let ad = ad.into_competitor_ad();
        assert_eq!(ad.headline, "");
        assert_eq!(ad.body, "");
        assert!(ad.platforms.is_empty());
        assert!(ad.start_date.is_none());
    }
}
