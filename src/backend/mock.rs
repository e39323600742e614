//! Mock backend for testing without a live provider.
//!
//! [`MockBackend`] plays back a scripted sequence of outcomes, so retry
//! behavior (attempt counts, non-retryable fast paths) can be asserted
//! deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;

use super::{AiBackend, ChatRequest, ChatResponse};
use crate::error::{Result, StrategyError};

/// A test backend that returns scripted outcomes in order.
///
/// When the script runs out, the last text outcome is repeated; an
/// exhausted script of errors repeats a generic transient error.
pub struct MockBackend {
    script: Mutex<VecDeque<Result<String>>>,
    last_text: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MockBackend {
    /// Script a sequence of outcomes.
    pub fn scripted(outcomes: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            last_text: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always succeed with the same response text.
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        let mock = Self::scripted(vec![Ok(text.clone())]);
        *mock.last_text.lock().unwrap() = Some(text);
        mock
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn next_outcome(&self) -> Result<String> {
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(text)) => {
                *self.last_text.lock().unwrap() = Some(text.clone());
                Ok(text)
            }
            Some(Err(e)) => Err(e),
            None => match self.last_text.lock().unwrap().clone() {
                Some(text) => Ok(text),
                None => Err(StrategyError::Transient("mock script exhausted".into())),
            },
        }
    }
}

#[async_trait]
impl AiBackend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        _request: &ChatRequest,
    ) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let text = self.next_outcome()?;
        Ok(ChatResponse {
            text,
            status: 200,
            metadata: None,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
