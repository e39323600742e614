//! The strategy generation pipeline.
//!
//! Stages run sequentially: transform → fetch competitor data (best
//! effort) → market analysis → campaign generation → aggregation. Retries
//! live inside [`GenerationClient`]; a stage either completes or the whole
//! run fails. Each completed transition emits exactly one progress event
//! at a fixed bucket (0, 15, 40, 75, 100), so observed progress never
//! overstates work that later failed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use tracing::debug;

use crate::ads::{AdsArchive, CompetitorData, CompetitorDataSource};
use crate::backend::AiBackend;
use crate::error::{Result, StageCause, StrategyError};
use crate::events::{ProgressEvent, ProgressSink};
use crate::generation::{GenerationClient, RetryPolicy};
use crate::profile::{self, OnboardingAnswers};
use crate::prompt;
use crate::types::{AdCampaign, CompetitorAnalysis, DataSource, RealAdsData, Strategy};

/// Pipeline states. `Failed` is reachable from any non-terminal state and
/// is represented by the run returning an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Transforming,
    FetchingCompetitorData,
    AnalyzingMarket,
    GeneratingCampaign,
    Aggregating,
    Done,
}

impl Stage {
    /// Progress bucket reported when this stage's transition completes.
    pub fn progress(&self) -> u8 {
        match self {
            Stage::Idle | Stage::Transforming => 0,
            Stage::FetchingCompetitorData => 15,
            Stage::AnalyzingMarket => 40,
            Stage::GeneratingCampaign => 75,
            Stage::Aggregating | Stage::Done => 100,
        }
    }
}

/// Input for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Identifier of the stored profile this run belongs to.
    pub profile_id: String,
    /// Raw onboarding answers, owned by the caller.
    pub answers: OnboardingAnswers,
}

/// Orchestrates one run per call; safe to share across concurrent runs for
/// different identities — the only cross-run mutable state lives in the
/// rate limiter, outside this type.
pub struct StrategyPipeline {
    generation: GenerationClient,
    ads: CompetitorDataSource,
    cancellation: Arc<AtomicBool>,
}

impl StrategyPipeline {
    pub fn builder() -> StrategyPipelineBuilder {
        StrategyPipelineBuilder::default()
    }

    /// The shared cancellation flag. Setting it makes every subsequent
    /// suspension point in an in-flight run bail with `Cancelled`.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancellation.clone()
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.load(Ordering::Relaxed) {
            return Err(StrategyError::Cancelled);
        }
        Ok(())
    }

    fn emit(sink: &dyn ProgressSink, step: u32, stage: Stage, message: &str) {
        sink.emit(ProgressEvent {
            step,
            progress: stage.progress(),
            message: message.to_string(),
        });
    }

    fn stage_error(stage: StageCause, source: StrategyError) -> StrategyError {
        StrategyError::Stage {
            stage,
            source: Box::new(source),
        }
    }

    /// Execute one full run.
    ///
    /// A [`Strategy`] is only constructed after both AI stages succeed;
    /// partial results surface as errors.
    pub async fn run(&self, request: RunRequest, sink: &dyn ProgressSink) -> Result<Strategy> {
        self.check_cancelled()?;
        Self::emit(sink, 1, Stage::Transforming, "Reading your business profile");

        // Pure; derived exactly once and never mutated afterwards
        let profile = profile::transform(&request.answers);

        Self::emit(sink, 2, Stage::FetchingCompetitorData, "Gathering competitor ads");

        // Best effort: failure here downgrades to "no external data"
        let data = self.ads.gather(&profile).await;
        debug!(
            available = data.available,
            competitor_ads = data.competitor_ads.len(),
            "competitor data gathered"
        );

        self.check_cancelled()?;
        let mut analysis = self.analyze_market(&profile, &data).await?;
        analysis.data_source = if data.available {
            DataSource::AdsLibraryAndAi
        } else {
            DataSource::AiOnly
        };
        Self::emit(sink, 3, Stage::AnalyzingMarket, "Market analysis complete");

        self.check_cancelled()?;
        let campaign = self.generate_campaign(&profile, &analysis).await?;
        Self::emit(sink, 4, Stage::GeneratingCampaign, "Ad campaign generated");

        // Pure assembly; cannot fail
        let real_ads_data = data.available.then(|| {
            let CompetitorData {
                own_ads,
                competitor_ads,
                ..
            } = data;
            RealAdsData {
                own_ads,
                competitor_ads,
            }
        });

        let strategy = Strategy {
            profile_id: request.profile_id,
            profile,
            competitor_analysis: analysis,
            ad_campaign: campaign,
            real_ads_data,
            generated_at: Utc::now(),
        };

        Self::emit(sink, 5, Stage::Done, "Strategy ready");
        Ok(strategy)
    }

    async fn analyze_market(
        &self,
        profile: &crate::profile::BusinessProfile,
        data: &CompetitorData,
    ) -> Result<CompetitorAnalysis> {
        let spec = prompt::market_analysis_spec(profile, data);
        let value = self
            .generation
            .generate(&spec)
            .await
            .map_err(|e| Self::stage_error(StageCause::MarketAnalysis, e))?;
        serde_json::from_value(value)
            .map_err(|e| Self::stage_error(StageCause::MarketAnalysis, e.into()))
    }

    async fn generate_campaign(
        &self,
        profile: &crate::profile::BusinessProfile,
        analysis: &CompetitorAnalysis,
    ) -> Result<AdCampaign> {
        let spec = prompt::campaign_spec(profile, analysis);
        let value = self
            .generation
            .generate(&spec)
            .await
            .map_err(|e| Self::stage_error(StageCause::CampaignGeneration, e))?;
        serde_json::from_value(value)
            .map_err(|e| Self::stage_error(StageCause::CampaignGeneration, e.into()))
    }
}

/// Builder for [`StrategyPipeline`].
#[derive(Default)]
pub struct StrategyPipelineBuilder {
    backend: Option<Arc<dyn AiBackend>>,
    archive: Option<Arc<dyn AdsArchive>>,
    client: Option<Client>,
    base_url: Option<String>,
    model: Option<String>,
    retry: Option<RetryPolicy>,
    cancellation: Option<Arc<AtomicBool>>,
}

impl StrategyPipelineBuilder {
    /// Set the AI backend. Required.
    pub fn backend(mut self, backend: Arc<dyn AiBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the ads archive. Required — use an unconfigured archive to run
    /// model-only.
    pub fn archive(mut self, archive: Arc<dyn AdsArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Set the HTTP client. Default: a fresh client.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Base URL of the AI provider.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Model identifier. Required.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Retry policy for generation calls. Default: [`RetryPolicy::default`].
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Share a cancellation flag. Default: a fresh flag.
    pub fn cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(cancel);
        self
    }

    pub fn build(self) -> Result<StrategyPipeline> {
        let backend = self
            .backend
            .ok_or_else(|| StrategyError::InvalidConfig("an AI backend is required".into()))?;
        let archive = self
            .archive
            .ok_or_else(|| StrategyError::InvalidConfig("an ads archive is required".into()))?;
        let model = self
            .model
            .filter(|m| !m.is_empty())
            .ok_or_else(|| StrategyError::InvalidConfig("a model identifier is required".into()))?;

        let client = self.client.unwrap_or_default();
        let cancellation = self.cancellation.unwrap_or_default();

        let mut generation = GenerationClient::new(
            backend,
            client,
            self.base_url.unwrap_or_else(|| "https://api.openai.com".into()),
            model,
        )
        .with_cancellation(cancellation.clone());
        if let Some(retry) = self.retry {
            generation = generation.with_retry(retry);
        }

        Ok(StrategyPipeline {
            generation,
            ads: CompetitorDataSource::new(archive),
            cancellation,
        })
    }
}
