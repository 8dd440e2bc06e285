//! In-process collectors for driving flushes without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use interaction_tracker::error::CollectorError;
use interaction_tracker::{Collector, FlushBatch};

/// Records every batch and answers from a script, then with `fallback`.
pub struct ScriptedCollector {
    batches: Mutex<Vec<FlushBatch>>,
    script: Mutex<VecDeque<Result<u16, CollectorError>>>,
    fallback: Result<u16, CollectorError>,
}

impl ScriptedCollector {
    pub fn always(status: u16) -> Arc<Self> {
        Self::scripted(Vec::new(), Ok(status))
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Self::scripted(Vec::new(), Err(CollectorError::Request(reason.to_string())))
    }

    pub fn scripted(
        script: Vec<Result<u16, CollectorError>>,
        fallback: Result<u16, CollectorError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            script: Mutex::new(script.into()),
            fallback,
        })
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn batches(&self) -> Vec<FlushBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Collector for ScriptedCollector {
    async fn deliver(&self, batch: &FlushBatch) -> Result<u16, CollectorError> {
        self.batches.lock().unwrap().push(batch.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Holds every delivery until `release` is called.
pub struct GatedCollector {
    pub entered: Notify,
    gate: Notify,
    batches: Mutex<Vec<FlushBatch>>,
    status: u16,
}

impl GatedCollector {
    pub fn new(status: u16) -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            gate: Notify::new(),
            batches: Mutex::new(Vec::new()),
            status,
        })
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl Collector for GatedCollector {
    async fn deliver(&self, batch: &FlushBatch) -> Result<u16, CollectorError> {
        self.batches.lock().unwrap().push(batch.clone());
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(self.status)
    }
}
