//! # Strategy Pipeline
//!
//! Marketing strategy generation from onboarding answers, with competitor
//! ads data folded in when the archive credential is configured.
//!
//! The crate provides a staged pipeline: **profile transformation**
//! (loosely-typed answers into a normalized [`BusinessProfile`]),
//! **competitor data gathering** (best-effort ads-archive queries that
//! degrade to model-only analysis), two **AI stages** (market analysis,
//! campaign generation) with per-call retry, and **delivery** as either a
//! progress event stream or a single terminal response.
//!
//! ## Core Concepts
//!
//! - **[`StrategyPipeline`]** — the staged run: transform → gather →
//!   analyze → generate → aggregate into a [`Strategy`].
//! - **[`AiBackend`](backend::AiBackend)** — object-safe trait over the AI
//!   provider; [`OpenAiBackend`] for production, [`MockBackend`] for tests.
//! - **[`AdsArchive`](ads::AdsArchive)** — the competitor ads collaborator;
//!   an unconfigured archive never fails the run.
//! - **[`ProgressTransport`]** — streamed delivery with unary fallback
//!   under one wall-clock timeout.
//! - **[`RateLimiter`]** — fixed-window admission per identity and route,
//!   checked before any pipeline work starts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use strategy_pipeline::ads::MetaAdsArchive;
//! use strategy_pipeline::backend::OpenAiBackend;
//! use strategy_pipeline::{
//!     ArchiveConfig, OnboardingAnswers, ProgressTransport, RunRequest, StrategyPipeline,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let archive = MetaAdsArchive::new(
//!         reqwest::Client::new(),
//!         ArchiveConfig::default().with_access_token("archive-token"),
//!     );
//!     let pipeline = StrategyPipeline::builder()
//!         .backend(Arc::new(OpenAiBackend::new().with_api_key("sk-...")))
//!         .archive(Arc::new(archive))
//!         .model("gpt-4o")
//!         .build()?;
//!
//!     let transport = ProgressTransport::new(Arc::new(pipeline), Duration::from_secs(120));
//!     let request = RunRequest {
//!         profile_id: "profile-1".into(),
//!         answers: OnboardingAnswers::new()
//!             .answer("companyName", "Acme Roofing")
//!             .answer("whatYouSell", "roof repair")
//!             .answer("priceRange", "1k_10k"),
//!     };
//!
//!     let strategy = transport.run_unary(request).await?;
//!     println!("{} ad variants", strategy.ad_campaign.ad_variants.len());
//!     Ok(())
//! }
//! ```

pub mod ads;
pub mod backend;
pub mod error;
pub mod events;
pub mod generation;
pub mod parsing;
pub mod pipeline;
pub mod profile;
pub mod prompt;
pub mod rate_limit;
pub mod stream;
pub mod transport;
pub mod types;

pub use ads::{ArchiveConfig, Availability, CompetitorAd, CompetitorData, MetaAdsArchive};
pub use backend::{MockBackend, OpenAiBackend};
pub use error::{Result, StageCause, StrategyError};
pub use events::{ProgressEvent, ProgressSink, StreamEvent};
pub use generation::{GenerationClient, PromptSpec, RetryPolicy};
pub use pipeline::{RunRequest, Stage, StrategyPipeline, StrategyPipelineBuilder};
pub use profile::{BusinessProfile, OnboardingAnswers, PriceRange};
pub use rate_limit::{Admission, CounterStore, MemoryStore, RateLimitConfig, RateLimiter};
pub use stream::StreamDecoder;
pub use transport::ProgressTransport;
pub use types::{AdCampaign, CompetitorAnalysis, DataSource, RealAdsData, Strategy};
