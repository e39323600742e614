//! Onboarding-answer normalization.
//!
//! [`transform`] maps the raw, loosely-typed answers collected by the intake
//! form into a [`BusinessProfile`] with human-readable labels. This isolates
//! the prompt vocabulary from the wire vocabulary of the form: prompt
//! templates can change without touching the intake schema.
//!
//! The mapping is a pure function. Unknown or missing enum codes fall back
//! to the raw value unchanged — it never fails and never produces nulls.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Raw key/value answers collected upstream. Immutable input.
///
/// Values are kept as loose JSON since the intake form evolves independently
/// of this crate. Non-string values are stringified on access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnboardingAnswers {
    #[serde(flatten)]
    pub answers: HashMap<String, Value>,
}

impl OnboardingAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an answer, builder-style.
    pub fn answer(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.answers.insert(key.into(), value.into());
        self
    }

    /// Fetch an answer as text. Missing keys yield an empty string.
    pub fn get(&self, key: &str) -> String {
        match self.answers.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// A price bracket with numeric bounds and a display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u64,
    pub max: u64,
    pub label: String,
}

/// Normalized, human-readable representation of onboarding answers.
///
/// Derived exactly once per run and never mutated afterwards; every
/// downstream stage borrows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    pub company_name: String,
    pub product_description: String,
    pub customer_type: String,
    pub price_range: PriceRange,
    pub decision_time: String,
    pub main_fear: String,
    pub lead_quality_preference: String,
    pub first_step: String,
    pub usp: String,
    pub guarantee: String,
    pub cta: String,
}

/// Decode an enum-valued answer through a fixed lookup table.
/// Unknown codes pass through unchanged.
fn label(table: &[(&str, &str)], raw: &str) -> String {
    table
        .iter()
        .find(|(code, _)| *code == raw)
        .map(|(_, text)| (*text).to_string())
        .unwrap_or_else(|| raw.to_string())
}

const CUSTOMER_TYPES: &[(&str, &str)] = &[
    ("b2b", "Businesses (B2B)"),
    ("b2c", "Consumers (B2C)"),
    ("both", "Both businesses and consumers"),
];

const DECISION_TIMES: &[(&str, &str)] = &[
    ("same_day", "Decides the same day"),
    ("days", "Takes a few days to decide"),
    ("weeks", "Takes a few weeks to decide"),
    ("months", "Takes a month or longer to decide"),
];

const MAIN_FEARS: &[(&str, &str)] = &[
    ("overpay", "Afraid of overpaying"),
    ("quality", "Afraid of poor quality work"),
    ("deadlines", "Afraid of missed deadlines"),
    ("scam", "Afraid of being scammed"),
];

const LEAD_QUALITY: &[(&str, &str)] = &[
    ("volume", "High volume of leads"),
    ("quality", "Fewer but better-qualified leads"),
];

const FIRST_STEPS: &[(&str, &str)] = &[
    ("call", "Phone call"),
    ("form", "Fill out a form"),
    ("visit", "Visit in person"),
    ("chat", "Start a chat"),
];

/// Price brackets keyed by the intake form's range codes.
fn price_range(raw: &str) -> PriceRange {
    let (min, max, text) = match raw {
        "under_1k" => (0, 1_000, "Under $1k"),
        "1k_10k" => (1_000, 10_000, "$1k-$10k"),
        "10k_50k" => (10_000, 50_000, "$10k-$50k"),
        "50k_200k" => (50_000, 200_000, "$50k-$200k"),
        "over_200k" => (200_000, 1_000_000, "Over $200k"),
        other => {
            return PriceRange {
                min: 0,
                max: 0,
                label: other.to_string(),
            }
        }
    };
    PriceRange {
        min,
        max,
        label: text.to_string(),
    }
}

/// Derive a [`BusinessProfile`] from raw onboarding answers.
///
/// Pure, infallible. Enum codes are decoded through the lookup tables;
/// anything unrecognized passes through as-is.
pub fn transform(answers: &OnboardingAnswers) -> BusinessProfile {
    BusinessProfile {
        company_name: answers.get("companyName"),
        product_description: answers.get("whatYouSell"),
        customer_type: label(CUSTOMER_TYPES, &answers.get("customerType")),
        price_range: price_range(&answers.get("priceRange")),
        decision_time: label(DECISION_TIMES, &answers.get("decisionTime")),
        main_fear: label(MAIN_FEARS, &answers.get("mainFear")),
        lead_quality_preference: label(LEAD_QUALITY, &answers.get("leadQuality")),
        first_step: label(FIRST_STEPS, &answers.get("firstStep")),
        usp: answers.get("usp"),
        guarantee: answers.get("guarantee"),
        cta: answers.get("cta"),
    }
}
