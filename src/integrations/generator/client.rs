// src/integrations/generator/client.rs
//
// HTTP Generation Gateway
//
// ARCHITECTURE:
// - JSON POST endpoints: /sub-decks, /tiers, /card-body
// - /tiers answers with newline-delimited JSON, read chunk by chunk so
//   cards reach the caller while the service is still generating
// - Minimum interval between requests, bearer token auth, request timeout
//
// CRITICAL RULES:
// - This is INFRASTRUCTURE, not DOMAIN
// - Never touches the store
// - Every failure maps to a GenerationError

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::EngineConfig;
use crate::domain::{DeckRef, GeneratedCard};
use crate::error::{AppError, AppResult, GenerationError, GenerationResult};
use crate::integrations::gateway::{
    card_stream, CardBodyRequest, CardSender, CardStream, GenerationEvent, GenerationGateway,
    SubDeckListing, SubDeckRequest, TierRequest,
};

#[derive(Debug, Deserialize)]
struct SubDeckResponse {
    #[serde(default)]
    leaf: bool,
    #[serde(default)]
    decks: Vec<DeckRef>,
}

#[derive(Debug, Deserialize)]
struct CardBodyResponse {
    body: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponseBody {
    error: String,
}

/// One line of the /tiers response
#[derive(Debug, Default, Deserialize)]
struct TierLine {
    #[serde(default)]
    card: Option<GeneratedCard>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Rate limiter state
struct RateLimiter {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: None,
            min_interval,
        }
    }

    async fn wait_if_needed(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// Splits a byte stream into complete lines
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        lines.retain(|l| !l.is_empty());
        lines
    }

    /// Whatever is left after the last newline
    fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!rest.is_empty()).then_some(rest)
    }
}

fn parse_tier_line(line: &str) -> GenerationEvent {
    match serde_json::from_str::<TierLine>(line) {
        Ok(TierLine { error: Some(message), .. }) => {
            GenerationEvent::Failed(GenerationError::Service(message))
        }
        Ok(TierLine { card: Some(card), .. }) => GenerationEvent::CardArrived(card),
        Ok(TierLine { done: true, .. }) => GenerationEvent::Completed,
        Ok(_) => GenerationEvent::Failed(GenerationError::Parse(format!(
            "unrecognized tier line: {}",
            line
        ))),
        Err(e) => GenerationEvent::Failed(GenerationError::Parse(e.to_string())),
    }
}

/// HTTP client for the generation service
pub struct HttpGenerationGateway {
    base_url: String,
    http_client: Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    auth_token: Option<String>,
}

impl HttpGenerationGateway {
    pub fn new(config: &EngineConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            http_client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(config.min_request_interval()))),
            auth_token: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> GenerationResult<Response> {
        self.rate_limiter.lock().await.wait_if_needed().await;

        let mut request = self
            .http_client
            .post(self.endpoint(path))
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(token) = &self.auth_token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        log::debug!("POST {}", self.endpoint(path));
        let response = request.json(body).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponseBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);

        Err(GenerationError::Service(format!("{} returned {}: {}", path, status, message)))
    }

    /// Forward the NDJSON body of a /tiers response onto the stream
    async fn pump_tier_stream(mut response: Response, tx: CardSender) {
        let mut buffer = LineBuffer::default();

        loop {
            let (lines, finished) = match response.chunk().await {
                Ok(Some(chunk)) => (buffer.push(&chunk), false),
                Ok(None) => (buffer.finish().into_iter().collect(), true),
                Err(e) => {
                    let _ = tx.send(GenerationEvent::Failed(e.into())).await;
                    return;
                }
            };

            for line in lines {
                let event = parse_tier_line(&line);
                let terminal = !matches!(event, GenerationEvent::CardArrived(_));
                if tx.send(event).await.is_err() {
                    log::warn!("Tier stream receiver dropped, stopping");
                    return;
                }
                if terminal {
                    return;
                }
            }

            if finished {
                break;
            }
        }

        let _ = tx.send(GenerationEvent::Failed(GenerationError::Interrupted)).await;
    }
}

#[async_trait]
impl GenerationGateway for HttpGenerationGateway {
    async fn list_sub_decks(&self, request: SubDeckRequest) -> GenerationResult<SubDeckListing> {
        let response = self.post("sub-decks", &request).await?;
        let listing: SubDeckResponse = response.json().await?;

        if listing.leaf {
            Ok(SubDeckListing::Leaf)
        } else {
            Ok(SubDeckListing::Decks(listing.decks))
        }
    }

    async fn generate_tier(&self, request: TierRequest) -> GenerationResult<CardStream> {
        let response = self.post("tiers", &request).await?;
        let (tx, rx) = card_stream();

        tokio::spawn(Self::pump_tier_stream(response, tx));

        Ok(rx)
    }

    async fn generate_card_body(&self, request: CardBodyRequest) -> GenerationResult<String> {
        let response = self.post("card-body", &request).await?;
        let body: CardBodyResponse = response.json().await?;

        if body.body.trim().is_empty() {
            return Err(GenerationError::EmptyResult);
        }
        Ok(body.body)
    }
}
