//! Generated-strategy data model.
//!
//! These are the shapes produced by the two AI stages and the final
//! aggregate handed to the persistence collaborator. Everything AI-facing
//! carries `#[serde(default)]`: a syntactically valid but schema-empty model
//! response still deserializes — schema validation is a caller concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ads::CompetitorAd;
use crate::profile::BusinessProfile;

/// Provenance of the competitor analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// No external ads data was available; the analysis is model-only.
    #[serde(rename = "ai_only")]
    AiOnly,
    /// Real ads from the archive were folded into the analysis prompt.
    #[serde(rename = "facebook_ads_library + ai")]
    AdsLibraryAndAi,
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::AiOnly
    }
}

/// Output of the market-analysis stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompetitorAnalysis {
    pub competitors: Vec<String>,
    pub market_insights: String,
    pub opportunities: Vec<String>,
    pub threats: Vec<String>,
    pub recommended_approach: String,
    pub insights: Vec<String>,
    /// Set by the pipeline from observed data availability, never by the
    /// model.
    pub data_source: DataSource,
}

/// High-level campaign parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CampaignStrategy {
    pub objective: String,
    pub target_audience: String,
    pub funnel_stage: String,
    pub budget_split: String,
    pub channels: Vec<String>,
}

/// A single ad creative, static image or video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdVariant {
    /// `"static"` or `"video"`.
    pub format: String,
    pub headline: String,
    pub body: String,
    pub hook: String,
    pub script: String,
    pub cta: String,
    pub visual_description: String,
}

/// Output of the campaign-generation stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdCampaign {
    pub campaign_strategy: CampaignStrategy,
    pub ad_variants: Vec<AdVariant>,
    pub landing_page_structure: Value,
    pub expected_results: String,
}

/// Ads fetched from the archive, attached to the strategy for reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealAdsData {
    pub own_ads: Vec<CompetitorAd>,
    pub competitor_ads: Vec<CompetitorAd>,
}

/// The aggregate result of one successful pipeline run.
///
/// Constructed only after both AI stages succeed; partial results surface
/// as errors instead. Ownership transfers to the persistence collaborator
/// after return.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub profile_id: String,
    pub profile: BusinessProfile,
    pub competitor_analysis: CompetitorAnalysis,
    pub ad_campaign: AdCampaign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_ads_data: Option<RealAdsData>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_source_wire_values() {
        assert_eq!(
            serde_json::to_value(DataSource::AiOnly).unwrap(),
            json!("ai_only")
        );
        assert_eq!(
            serde_json::to_value(DataSource::AdsLibraryAndAi).unwrap(),
            json!("facebook_ads_library + ai")
        );
    }

    #[test]
    fn test_schema_empty_analysis_deserializes() {
        let analysis: CompetitorAnalysis = serde_json::from_value(json!({})).unwrap();
        assert!(analysis.competitors.is_empty());
        assert_eq!(analysis.data_source, DataSource::AiOnly);
    }

    #[test]
    fn test_campaign_camel_case_wire() {
        let campaign: AdCampaign = serde_json::from_value(json!({
            "campaignStrategy": {"objective": "leads", "channels": ["meta"]},
            "adVariants": [{"format": "static", "headline": "Fix your roof"}],
            "expectedResults": "2x CTR",
        }))
        .unwrap();
        assert_eq!(campaign.campaign_strategy.objective, "leads");
        assert_eq!(campaign.ad_variants.len(), 1);
        assert_eq!(campaign.ad_variants[0].headline, "Fix your roof");
        // Unknown fields on the variant default cleanly
        assert_eq!(campaign.ad_variants[0].script, "");
    }

    #[test]
    fn test_strategy_serializes_camel_case() {
        let strategy = Strategy {
            profile_id: "p-1".into(),
            profile: crate::profile::transform(&Default::default()),
            competitor_analysis: CompetitorAnalysis::default(),
            ad_campaign: AdCampaign::default(),
            real_ads_data: None,
            generated_at: Utc::now(),
        };
        let value = serde_json::to_value(&strategy).unwrap();
        assert!(value.get("competitorAnalysis").is_some());
        assert!(value.get("adCampaign").is_some());
        assert!(value.get("generatedAt").is_some());
        assert!(value.get("realAdsData").is_none());
    }
}
