use std::time::Duration;
use thiserror::Error;

/// Errors produced by the pipeline and its components.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    /// Retryable.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level. Retryable — models sometimes
    /// emit malformed output on one attempt and valid output on the next.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed input handed to the profile transformer. The transformer
    /// never produces this today (it falls back to raw values), but the
    /// contract allows it.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The ads-archive credential is missing or invalid. Always recoverable:
    /// the pipeline continues with `data_source = ai_only`.
    #[error("ads archive unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The AI provider rejected our credentials. Non-retryable.
    #[error("AI provider authentication failed: {0}")]
    AuthFailed(String),

    /// The AI provider reports an exhausted quota. Non-retryable — retrying
    /// cannot succeed until the account is fixed.
    #[error("AI provider quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Transient upstream failure: 5xx, provider-side throttling without a
    /// quota marker, truncated responses. Retryable.
    #[error("transient upstream failure: {0}")]
    Transient(String),

    /// The response was received but no structured payload could be
    /// extracted from it. Retryable.
    #[error("could not parse structured output: {0}")]
    Parse(String),

    /// A pipeline stage failed after its internal retries were exhausted.
    /// Carries the stage cause so callers can tell "try again" from
    /// "fix configuration".
    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: StageCause,
        #[source]
        source: Box<StrategyError>,
    },

    /// The caller-side wall-clock deadline expired. Distinct from any
    /// pipeline-internal error.
    #[error("pipeline timed out")]
    Timeout,

    /// Admission was denied by the rate limiter before pipeline work began.
    #[error("rate limit exceeded, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// The run was cancelled via the cancellation flag.
    #[error("pipeline was cancelled")]
    Cancelled,

    /// Invalid configuration detected at build time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Which pipeline stage a fatal error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageCause {
    MarketAnalysis,
    CampaignGeneration,
}

impl std::fmt::Display for StageCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageCause::MarketAnalysis => write!(f, "market-analysis"),
            StageCause::CampaignGeneration => write!(f, "campaign-generation"),
        }
    }
}

impl StrategyError {
    /// Whether the generation retry loop may attempt this call again.
    ///
    /// Credential and quota failures abort on first occurrence; transport,
    /// serde, parse, and transient provider errors are retried until
    /// attempts are exhausted.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StrategyError::Request(_)
                | StrategyError::Json(_)
                | StrategyError::Transient(_)
                | StrategyError::Parse(_)
        )
    }

    /// The stage cause, if this is a stage-fatal error.
    pub fn stage_cause(&self) -> Option<StageCause> {
        match self {
            StrategyError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for StrategyError {
    fn from(err: anyhow::Error) -> Self {
        StrategyError::Transient(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StrategyError>;
