//! Prompt construction for the two AI stages.
//!
//! Templates use `{key}` placeholders; `{{` and `}}` escape literal braces,
//! which matters here because both templates embed JSON shape examples.

use crate::ads::CompetitorData;
use crate::generation::PromptSpec;
use crate::profile::BusinessProfile;
use crate::types::CompetitorAnalysis;

/// Sentinels that should never appear in real templates.
const ESCAPE_SENTINEL: &str = "\x00LBRACE\x00";
const ESCAPE_SENTINEL_CLOSE: &str = "\x00RBRACE\x00";

/// Substitute `{key}` placeholders with values. `{{`/`}}` yield literal
/// braces.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = template.replace("{{", ESCAPE_SENTINEL);
    rendered = rendered.replace("}}", ESCAPE_SENTINEL_CLOSE);

    for (key, value) in vars {
        let placeholder = format!("{{{}}}", key);
        rendered = rendered.replace(&placeholder, value);
    }

    rendered = rendered.replace(ESCAPE_SENTINEL, "{");
    rendered.replace(ESCAPE_SENTINEL_CLOSE, "}")
}

/// Wrap text in a labeled section for structured prompts.
pub fn section(label: &str, content: &str) -> String {
    format!("## {}\n{}", label, content)
}

fn profile_section(profile: &BusinessProfile) -> String {
    section(
        "Business Profile",
        &format!(
            "Company: {}\n\
             Product/service: {}\n\
             Customers: {}\n\
             Price range: {}\n\
             Decision time: {}\n\
             Main customer fear: {}\n\
             Lead preference: {}\n\
             Preferred first step: {}\n\
             USP: {}\n\
             Guarantee: {}\n\
             Call to action: {}",
            profile.company_name,
            profile.product_description,
            profile.customer_type,
            profile.price_range.label,
            profile.decision_time,
            profile.main_fear,
            profile.lead_quality_preference,
            profile.first_step,
            profile.usp,
            profile.guarantee,
            profile.cta,
        ),
    )
}

fn competitor_section(data: &CompetitorData) -> String {
    if !data.available {
        return section(
            "Competitor Ads Data",
            "No external ads data is available for this market. \
             Base the analysis on the business profile alone.",
        );
    }

    let insights = data
        .insights
        .iter()
        .map(|i| format!("- {}", i.summary()))
        .collect::<Vec<_>>()
        .join("\n");

    section(
        "Competitor Ads Data",
        &format!(
            "{} competitor ads and {} of the company's own ads were found.\n{}",
            data.competitor_ads.len(),
            data.own_ads.len(),
            insights
        ),
    )
}

const MARKET_ANALYSIS_SYSTEM: &str = "You are a senior marketing strategist. You analyze \
    competitive markets for small and mid-size businesses and respond with a single JSON object, \
    no prose.";

const MARKET_ANALYSIS_TEMPLATE: &str = "Analyze the competitive market for this business.\n\n\
    {profile}\n\n{competitors}\n\n\
    Respond with a single JSON object shaped like:\n\
    {{\"competitors\": [\"...\"], \"marketInsights\": \"...\", \"opportunities\": [\"...\"], \
    \"threats\": [\"...\"], \"recommendedApproach\": \"...\", \"insights\": [\"...\"]}}";

/// Build the market-analysis call: profile plus (possibly absent)
/// competitor data folded into the prompt.
pub fn market_analysis_spec(profile: &BusinessProfile, data: &CompetitorData) -> PromptSpec {
    let user = render(
        MARKET_ANALYSIS_TEMPLATE,
        &[
            ("profile", profile_section(profile).as_str()),
            ("competitors", competitor_section(data).as_str()),
        ],
    );
    PromptSpec {
        name: "market-analysis",
        system: MARKET_ANALYSIS_SYSTEM.to_string(),
        user,
        temperature: 0.6,
        expect_array: false,
    }
}

const CAMPAIGN_SYSTEM: &str = "You are a direct-response advertising expert. You design ad \
    campaigns and landing pages and respond with a single JSON object, no prose.";

const CAMPAIGN_TEMPLATE: &str = "Design an ad campaign for this business using the completed \
    market analysis.\n\n{profile}\n\n{analysis}\n\n\
    Respond with a single JSON object shaped like:\n\
    {{\"campaignStrategy\": {{\"objective\": \"...\", \"targetAudience\": \"...\", \
    \"funnelStage\": \"...\", \"budgetSplit\": \"...\", \"channels\": [\"...\"]}}, \
    \"adVariants\": [{{\"format\": \"static|video\", \"headline\": \"...\", \"body\": \"...\", \
    \"hook\": \"...\", \"script\": \"...\", \"cta\": \"...\", \"visualDescription\": \"...\"}}], \
    \"landingPageStructure\": {{...}}, \"expectedResults\": \"...\"}}";

/// Build the campaign-generation call: profile plus the completed analysis.
pub fn campaign_spec(profile: &BusinessProfile, analysis: &CompetitorAnalysis) -> PromptSpec {
    let analysis_json =
        serde_json::to_string_pretty(analysis).unwrap_or_else(|_| "{}".to_string());
    let user = render(
        CAMPAIGN_TEMPLATE,
        &[
            ("profile", profile_section(profile).as_str()),
            ("analysis", section("Market Analysis", &analysis_json).as_str()),
        ],
    );
    PromptSpec {
        name: "campaign-generation",
        system: CAMPAIGN_SYSTEM.to_string(),
        user,
        temperature: 0.8,
        expect_array: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::{insights, CompetitorData};
    use crate::profile::{transform, OnboardingAnswers};

    fn profile() -> BusinessProfile {
        transform(
            &OnboardingAnswers::new()
                .answer("companyName", "Acme")
                .answer("whatYouSell", "roofing")
                .answer("priceRange", "50k_200k"),
        )
    }

    #[test]
    fn test_render_basic() {
        let result = render("Hello {name}, analyze {topic}", &[("name", "Alice"), ("topic", "ads")]);
        assert_eq!(result, "Hello Alice, analyze ads");
    }

    #[test]
    fn test_render_escaped_braces() {
        let result = render("JSON: {{\"key\": \"{v}\"}}", &[("v", "x")]);
        assert_eq!(result, r#"JSON: {"key": "x"}"#);
    }

    #[test]
    fn test_section() {
        assert_eq!(section("Context", "body"), "## Context\nbody");
    }

    #[test]
    fn test_market_spec_without_data() {
        let spec = market_analysis_spec(&profile(), &CompetitorData::unavailable());
        assert!(spec.user.contains("Acme"));
        assert!(spec.user.contains("$50k-$200k"));
        assert!(spec.user.contains("No external ads data"));
        // The JSON shape example survives escaping
        assert!(spec.user.contains(r#"{"competitors""#));
        assert!(!spec.expect_array);
    }

    #[test]
    fn test_market_spec_folds_insights() {
        let ads = vec![crate::ads::test_ad("1", "Rival")];
        let data = CompetitorData {
            own_ads: Vec::new(),
            insights: insights::derive(&ads),
            competitor_ads: ads,
            available: true,
        };
        let spec = market_analysis_spec(&profile(), &data);
        assert!(spec.user.contains("1 competitor ads"));
        assert!(spec.user.contains("Most used platforms"));
    }

    #[test]
    fn test_campaign_spec_folds_analysis() {
        let analysis = CompetitorAnalysis {
            recommended_approach: "undercut on speed".into(),
            ..Default::default()
        };
        let spec = campaign_spec(&profile(), &analysis);
        assert!(spec.user.contains("undercut on speed"));
        assert!(spec.user.contains("adVariants"));
        assert_eq!(spec.name, "campaign-generation");
    }
}
