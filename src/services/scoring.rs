//! Scoring of stored listings through the evaluation service.

use crate::clients::openai::{ChatRequest, Message, OpenAiClient, OpenAiError};
use crate::config::EvaluatorConfig;
use crate::models::{Evaluation, Listing};
use crate::parser::evaluation::{EvaluationParser, ParseError};
use crate::services::prompt::{PromptInput, SYSTEM_PROMPT, build_user_prompt};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    OpenAi(#[from] OpenAiError),

    #[error("Evaluation backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Evaluation request failed: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub system: String,
    pub prompt: String,
}

/// Answers an evaluation request with free text.
#[async_trait]
pub trait EvaluationBackend: Send + Sync {
    async fn complete(&self, request: &EvaluationRequest) -> Result<String, BackendError>;
}

/// Extra market context for the prompt.
#[async_trait]
pub trait MarketAnalysis: Send + Sync {
    async fn analyze(&self, listing: &Listing) -> Option<String>;
}

/// The same configured text for every listing.
#[derive(Debug, Clone)]
pub struct StaticMarketAnalysis {
    text: String,
}

impl StaticMarketAnalysis {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl MarketAnalysis for StaticMarketAnalysis {
    async fn analyze(&self, _listing: &Listing) -> Option<String> {
        Some(self.text.clone())
    }
}

/// OpenAI chat completions as the evaluation backend.
pub struct ChatEvaluator {
    client: OpenAiClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatEvaluator {
    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, OpenAiError> {
        Ok(Self {
            client: OpenAiClient::from_config(config)?,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl EvaluationBackend for ChatEvaluator {
    async fn complete(&self, request: &EvaluationRequest) -> Result<String, BackendError> {
        let chat = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(request.system.clone()),
                Message::user(request.prompt.clone()),
            ],
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        };
        Ok(self.client.chat_completion(&chat).await?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Accepted(Evaluation),
    /// The reply could not be turned into a valid evaluation.
    Rejected(ParseError),
}

pub struct ScoringEngine {
    backend: Arc<dyn EvaluationBackend>,
    market_analysis: Option<Arc<dyn MarketAnalysis>>,
    parser: EvaluationParser,
    buyer_requirements: String,
}

impl ScoringEngine {
    #[must_use]
    pub fn new(backend: Arc<dyn EvaluationBackend>, buyer_requirements: impl Into<String>) -> Self {
        Self {
            backend,
            market_analysis: None,
            parser: EvaluationParser::default(),
            buyer_requirements: buyer_requirements.into(),
        }
    }

    /// Engine settings from config; market analysis is attached when configured.
    #[must_use]
    pub fn from_config(backend: Arc<dyn EvaluationBackend>, config: &EvaluatorConfig) -> Self {
        let engine = Self::new(backend, config.buyer_requirements.clone())
            .with_score_bounds(config.enforce_score_bounds);

        match config.market_analysis.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(text) => engine.with_market_analysis(Arc::new(StaticMarketAnalysis::new(text))),
            None => engine,
        }
    }

    #[must_use]
    pub fn with_market_analysis(mut self, analysis: Arc<dyn MarketAnalysis>) -> Self {
        self.market_analysis = Some(analysis);
        self
    }

    #[must_use]
    pub const fn with_score_bounds(mut self, enforce: bool) -> Self {
        self.parser = EvaluationParser::new(enforce);
        self
    }

    pub async fn build_request(&self, listing: &Listing, today: NaiveDate) -> EvaluationRequest {
        let analysis = match &self.market_analysis {
            Some(source) => source.analyze(listing).await,
            None => None,
        };

        let prompt = build_user_prompt(&PromptInput {
            listing,
            today,
            market_analysis: analysis.as_deref(),
            buyer_requirements: &self.buyer_requirements,
        });

        EvaluationRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt,
        }
    }

    /// Scores one listing. Malformed replies come back as
    /// [`ScoreOutcome::Rejected`]; transport failures as errors.
    pub async fn score(&self, listing: &Listing, today: NaiveDate) -> Result<ScoreOutcome, ScoringError> {
        let request = self.build_request(listing, today).await;
        let reply = self.backend.complete(&request).await?;
        debug!(listing_id = %listing.id, chars = reply.len(), "Received evaluation reply");

        match self.parser.parse(&reply) {
            Ok(evaluation) => Ok(ScoreOutcome::Accepted(evaluation)),
            Err(reason) => {
                info!(
                    event = "evaluation_rejected",
                    listing_id = %listing.id,
                    reason = %reason,
                    "Skipping invalid or incomplete evaluation"
                );
                Ok(ScoreOutcome::Rejected(reason))
            }
        }
    }
}
