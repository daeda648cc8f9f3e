/// Mail dispatch — the boundary to the mail transport.
///
/// Transport failures never abort a batch: the orchestrator records them as
/// "not dispatched" and moves on.
///
/// Credentials (relay URL, API key, sender address) come from the environment only.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail relay rejected message (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Mail relay unavailable after {retries} attempts")]
    Unavailable { retries: u32 },
}

/// A composed notification plus its envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Hands a message to a transport. `Ok(true)` means the transport accepted it,
/// `Ok(false)` that it was deliberately not sent.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<bool, DispatchError>;
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Sends mail through an HTTP relay (any transactional-mail API that accepts
/// `{from, to[], subject, text}` with a bearer token).
/// Retries on 429 and 5xx with exponential backoff.
#[derive(Clone)]
pub struct HttpMailDispatcher {
    client: Client,
    endpoint: String,
    api_key: String,
    retry_base: Duration,
}

impl HttpMailDispatcher {
    pub fn new(endpoint: String, api_key: String) -> Result<Self, DispatchError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            retry_base: DEFAULT_RETRY_BASE,
        })
    }

    /// Overrides the first backoff delay (doubles on each retry).
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }
}

#[async_trait]
impl Dispatcher for HttpMailDispatcher {
    async fn send(&self, mail: &OutgoingMail) -> Result<bool, DispatchError> {
        let request_body = RelayRequest {
            from: &mail.from,
            to: [&mail.to],
            subject: &mail.subject,
            text: &mail.body,
        };

        let mut last_error: Option<DispatchError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_base * (1 << (attempt - 1));
                warn!(
                    "Mail relay attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(DispatchError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Mail relay returned {}: {}", status, body);
                last_error = Some(DispatchError::Rejected {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(DispatchError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            debug!("Mail relay accepted message for {}", mail.to);
            return Ok(true);
        }

        warn!(
            "Giving up on {} after {} attempts: {:?}",
            mail.to, MAX_RETRIES, last_error
        );
        Err(DispatchError::Unavailable {
            retries: MAX_RETRIES,
        })
    }
}

/// Logs the message instead of sending it. Used when no relay is configured.
pub struct DryRunDispatcher;

#[async_trait]
impl Dispatcher for DryRunDispatcher {
    async fn send(&self, mail: &OutgoingMail) -> Result<bool, DispatchError> {
        info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            "Dry run: message not sent"
        );
        debug!("Dry run body:\n{}", mail.body);
        Ok(false)
    }
}
