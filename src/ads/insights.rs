//! Summary insights over the competitor ad set.
//!
//! A fixed set of aggregations, each a tagged variant so downstream
//! consumers (prompt folding, the `realAdsData` attachment) can handle them
//! exhaustively. An empty competitor set yields exactly one `NoData`
//! insight, so nothing downstream has to branch on an empty list.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::CompetitorAd;

/// Maximum sample headlines carried in an insight.
const HEADLINE_SAMPLE_CAP: usize = 5;

/// One derived observation about the competitor ad set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Insight {
    /// The competitor set was empty; stated explicitly instead of implied.
    NoData { note: String },
    /// Up to three platforms, most frequent first.
    TopPlatforms { platforms: Vec<String> },
    /// Number of distinct advertiser pages.
    DistinctAdvertisers { count: usize },
    /// Mean body-text length in characters.
    AverageBodyLength { chars: usize },
    /// A sample of competitor headlines, capped at five.
    SampleHeadlines { headlines: Vec<String> },
}

impl Insight {
    /// Render for prompt folding.
    pub fn summary(&self) -> String {
        match self {
            Insight::NoData { note } => note.clone(),
            Insight::TopPlatforms { platforms } => {
                format!("Most used platforms: {}", platforms.join(", "))
            }
            Insight::DistinctAdvertisers { count } => {
                format!("{count} distinct advertisers are running ads in this space")
            }
            Insight::AverageBodyLength { chars } => {
                format!("Average ad body length: {chars} characters")
            }
            Insight::SampleHeadlines { headlines } => {
                format!("Sample competitor headlines: {}", headlines.join(" | "))
            }
        }
    }
}

/// Derive the fixed insight set from the competitor ads.
pub fn derive(competitor_ads: &[CompetitorAd]) -> Vec<Insight> {
    if competitor_ads.is_empty() {
        return vec![Insight::NoData {
            note: "No competitor ads were found in the archive".to_string(),
        }];
    }

    let mut insights = Vec::with_capacity(4);

    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for ad in competitor_ads {
        for platform in &ad.platforms {
            *frequency.entry(platform.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = frequency.into_iter().collect();
    // Alphabetical tiebreak keeps the output stable across runs
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    insights.push(Insight::TopPlatforms {
        platforms: ranked
            .into_iter()
            .take(3)
            .map(|(name, _)| name.to_string())
            .collect(),
    });

    let advertisers: HashSet<&str> = competitor_ads.iter().map(|ad| ad.page_id.as_str()).collect();
    insights.push(Insight::DistinctAdvertisers {
        count: advertisers.len(),
    });

    let total_chars: usize = competitor_ads.iter().map(|ad| ad.body.chars().count()).sum();
    insights.push(Insight::AverageBodyLength {
        chars: total_chars / competitor_ads.len(),
    });

    insights.push(Insight::SampleHeadlines {
        headlines: competitor_ads
            .iter()
            .map(|ad| ad.headline.clone())
            .filter(|h| !h.is_empty())
            .take(HEADLINE_SAMPLE_CAP)
            .collect(),
    });

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::test_ad;

    #[test]
    fn test_empty_set_single_no_data_insight() {
        let insights = derive(&[]);
        assert_eq!(insights.len(), 1);
        assert!(matches!(insights[0], Insight::NoData { .. }));
    }

    #[test]
    fn test_top_platforms_ranked_and_capped() {
        let mut ads = Vec::new();
        for (id, platforms) in [
            ("1", vec!["facebook", "instagram"]),
            ("2", vec!["facebook", "messenger"]),
            ("3", vec!["facebook", "instagram", "audience_network"]),
            ("4", vec!["threads"]),
        ] {
            let mut ad = test_ad(id, "Rival");
            ad.platforms = platforms.into_iter().map(String::from).collect();
            ads.push(ad);
        }
        let insights = derive(&ads);
        let top = insights
            .iter()
            .find_map(|i| match i {
                Insight::TopPlatforms { platforms } => Some(platforms.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0], "facebook");
        assert_eq!(top[1], "instagram");
    }

    #[test]
    fn test_distinct_advertisers_counts_pages() {
        let mut a = test_ad("1", "Rival");
        let mut b = test_ad("2", "Rival");
        let c = test_ad("3", "Other");
        a.page_id = "p1".into();
        b.page_id = "p1".into();
        let insights = derive(&[a, b, c]);
        assert!(insights.contains(&Insight::DistinctAdvertisers { count: 2 }));
    }

    #[test]
    fn test_average_body_length() {
        let mut a = test_ad("1", "Rival");
        let mut b = test_ad("2", "Rival");
        a.body = "aaaa".into();
        b.body = "bb".into();
        let insights = derive(&[a, b]);
        assert!(insights.contains(&Insight::AverageBodyLength { chars: 3 }));
    }

    #[test]
    fn test_headline_sample_capped_at_five() {
        let ads: Vec<_> = (0..8).map(|i| test_ad(&i.to_string(), "Rival")).collect();
        let insights = derive(&ads);
        let sample = insights
            .iter()
            .find_map(|i| match i {
                Insight::SampleHeadlines { headlines } => Some(headlines.len()),
                _ => None,
            })
            .unwrap();
        assert_eq!(sample, 5);
    }

    #[test]
    fn test_insight_wire_tagging() {
        let value = serde_json::to_value(Insight::DistinctAdvertisers { count: 4 }).unwrap();
        assert_eq!(value["kind"], "distinct_advertisers");
        assert_eq!(value["count"], 4);
    }
}
