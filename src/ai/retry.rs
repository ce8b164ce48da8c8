//! Resilient generation client
//!
//! Wraps a `StructureGenerator` with transient-failure retry and
//! exponential backoff, then parses the response and rebuilds the tree.
//! There is no mid-flight cancellation: retries run to completion or
//! exhaustion.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mindmap_types::MindMapNode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{parse_flat_records, StructureGenerator};
use crate::error::{MindMapError, MindMapResult};
use crate::graph::TreeBuilder;

/// Retry budget and backoff base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 800,
        }
    }
}

impl RetryPolicy {
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `retry` (0-based): `base × 2^retry`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Suspends the caller between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Tokio timer sleeper
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Generation client with classified-error retry
#[derive(Clone)]
pub struct ResilientGenerator {
    generator: Arc<dyn StructureGenerator>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    builder: TreeBuilder,
}

impl ResilientGenerator {
    pub fn new(generator: Arc<dyn StructureGenerator>, policy: RetryPolicy) -> Self {
        Self {
            generator,
            sleeper: Arc::new(TokioSleeper),
            policy,
            builder: TreeBuilder::default(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_builder(mut self, builder: TreeBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generate, parse and rebuild the tree for a document
    pub async fn generate_structure(&self, document_text: &str) -> MindMapResult<MindMapNode> {
        let raw = self.call_with_retry(document_text).await?;

        let records = parse_flat_records(&raw).map_err(|e| {
            error!("Unparseable generation response: {}", e);
            MindMapError::PermanentService {
                message: e.to_string(),
            }
        })?;

        let tree = self.builder.build(&records)?;
        info!(
            "Generated mind map with {} record(s) via {}",
            records.len(),
            self.generator.name()
        );
        Ok(tree)
    }

    /// Raw response body, retrying transient failures
    pub async fn call_with_retry(&self, document_text: &str) -> MindMapResult<String> {
        let attempts = self.policy.total_attempts();

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.policy.delay_for(attempt - 1);
                warn!(
                    "Retrying generation in {:?}, attempt {} of {}",
                    delay,
                    attempt + 1,
                    attempts
                );
                self.sleeper.sleep(delay).await;
            }

            match self.generator.generate(document_text).await {
                Ok(raw) => return Ok(raw),
                Err(e) if !e.is_transient() => {
                    error!("Generation attempt {} failed permanently: {}", attempt + 1, e);
                    return Err(MindMapError::PermanentService {
                        message: e.to_string(),
                    });
                }
                Err(e) if attempt + 1 == attempts => {
                    error!("Generation failed after {} attempt(s): {}", attempts, e);
                    return Err(MindMapError::TransientService {
                        attempts,
                        message: e.to_string(),
                    });
                }
                Err(e) => warn!("Generation attempt {} failed transiently: {}", attempt + 1, e),
            }
        }

        // Only reachable with a zero-attempt budget, which total_attempts rules out
        Err(MindMapError::TransientService {
            attempts,
            message: "no attempt made".to_string(),
        })
    }
}
