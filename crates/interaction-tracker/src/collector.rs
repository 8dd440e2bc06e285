//! Remote collector transport
//!
//! One POST per flush carrying `{"events": [...]}`. Success is judged only by
//! the HTTP status class; the response body is never read.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::CollectorError;
use crate::event::InteractionEvent;

/// Request body of a flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlushBatch {
    pub events: Vec<InteractionEvent>,
}

/// Anything that can accept a batch and answer with an HTTP-style status.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Deliver the batch. `Ok` carries the response status, success or not;
    /// `Err` means the request never completed.
    async fn deliver(&self, batch: &FlushBatch) -> Result<u16, CollectorError>;
}

/// `true` for 2xx statuses.
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Collector backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpCollector {
    http: Client,
    endpoint: String,
}

impl HttpCollector {
    /// `timeout` of `None` keeps the transport default.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, CollectorError> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| CollectorError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| CollectorError::Request(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: url.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn deliver(&self, batch: &FlushBatch) -> Result<u16, CollectorError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(batch)
            .send()
            .await
            .map_err(|e| CollectorError::Request(e.to_string()))?;

        Ok(response.status().as_u16())
    }
}
