//! algod HTTP Client - token-authenticated REST client with retries
//!
//! Reads retry with exponential backoff on 5xx and transport errors.
//! Submissions go through [`AlgodHttp::post_raw`], which sends once.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::types::ErrorBody;
use crate::ports::ledger::LedgerError;

/// Header carrying the algod API token.
pub const TOKEN_HEADER: &str = "X-Algo-API-Token";

/// Configuration for the algod HTTP client.
#[derive(Debug, Clone)]
pub struct AlgodClientConfig {
  /// Base URL, e.g. `http://localhost:4001`.
  pub base_url: String,
  /// API token; empty for public endpoints.
  pub token: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Maximum retries on transient errors (reads only).
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for AlgodClientConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:4001".to_string(),
      token: String::new(),
      timeout: Duration::from_secs(10),
      max_concurrent: 8,
      max_retries: 3,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

/// Rate-limited HTTP client for an algod node.
pub struct AlgodHttp {
  http: Client,
  config: AlgodClientConfig,
  semaphore: Arc<Semaphore>,
}

impl AlgodHttp {
  pub fn new(config: AlgodClientConfig) -> Result<Self, LedgerError> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(4)
      .build()
      .map_err(|e| LedgerError::Transport(format!("failed to build HTTP client: {e}")))?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent));

    Ok(Self {
      http,
      config,
      semaphore,
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn authed(&self, request: RequestBuilder) -> RequestBuilder {
    if self.config.token.is_empty() {
      request
    } else {
      request.header(TOKEN_HEADER, &self.config.token)
    }
  }

  /// GET and decode JSON, retrying transient failures.
  pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, LedgerError> {
    self.get_json_with_timeout(path, self.config.timeout).await
  }

  /// GET with a per-request timeout (long polls).
  pub async fn get_json_with_timeout<T: DeserializeOwned>(
    &self,
    path: &str,
    timeout: Duration,
  ) -> Result<T, LedgerError> {
    let request = self.authed(self.http.get(self.url(path)).timeout(timeout));
    let response = self.execute_with_retry(request, path).await?;
    decode(response).await
  }

  /// POST a binary body once. Never retried.
  pub async fn post_raw<T: DeserializeOwned>(&self, path: &str, body: Vec<u8>) -> Result<T, LedgerError> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .map_err(|_| LedgerError::Transport("client shut down".to_string()))?;

    let request = self.authed(
      self
        .http
        .post(self.url(path))
        .header("Content-Type", "application/x-binary")
        .body(body),
    );

    let response = request.send().await.map_err(transport)?;
    let response = check_status(response).await?;
    decode(response).await
  }

  async fn execute_with_retry(&self, request: RequestBuilder, path: &str) -> Result<Response, LedgerError> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .map_err(|_| LedgerError::Transport("client shut down".to_string()))?;

    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
        debug!(attempt, path, delay_ms = delay.as_millis() as u64, "Retrying algod request");
        sleep(delay).await;
      }

      let req = request
        .try_clone()
        .ok_or_else(|| LedgerError::Transport("request not cloneable".to_string()))?;

      let outcome = match req.send().await {
        Ok(response) => check_status(response).await,
        Err(e) => Err(transport(e)),
      };

      match outcome {
        Ok(response) => return Ok(response),
        Err(e) if e.is_transient() => {
          warn!(error = %e, attempt, path, "algod request failed");
          last_error = Some(e);
        }
        Err(e) => return Err(e),
      }
    }

    Err(last_error.unwrap_or_else(|| LedgerError::Transport("max retries exceeded".to_string())))
  }
}

fn transport(e: reqwest::Error) -> LedgerError {
  LedgerError::Transport(e.to_string())
}

async fn check_status(response: Response) -> Result<Response, LedgerError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let text = response.text().await.unwrap_or_default();
  let message = serde_json::from_str::<ErrorBody>(&text)
    .map(|b| b.message)
    .unwrap_or(text);

  Err(match status {
    StatusCode::NOT_FOUND => LedgerError::NotFound(message),
    s if s.is_client_error() => LedgerError::Rejected(message),
    s => LedgerError::Http {
      status: s.as_u16(),
      body: message,
    },
  })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, LedgerError> {
  response
    .json::<T>()
    .await
    .map_err(|e| LedgerError::Decode(e.to_string()))
}
