//! Bounded-concurrency batch orchestration.
//!
//! Fans a large workload (e.g. many file diffs) out as independent model
//! calls. Small workloads run with capped parallelism; large ones are
//! partitioned into indexed batches, processed at most
//! `max_concurrent_batches` at a time, and reassembled strictly in batch
//! order regardless of completion order or partial failure. A failing
//! batch becomes a failure placeholder in the ordered output, never an
//! abort of its siblings.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use falconer_core::error::EngineError;
use falconer_core::provider::{Provider, ThinkRequest};

/// The caller-facing stream of output text chunks.
pub type OutputSink = mpsc::UnboundedSender<String>;

/// Units this small or fewer run per-unit with capped parallelism instead
/// of explicit batching.
const SMALL_GROUP_SIZE: usize = 3;

/// One independently processable piece of a larger workload.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    /// Identity used to label results (e.g. a file path)
    pub label: String,

    /// The unit's content (e.g. one file's diff)
    pub content: String,
}

impl WorkUnit {
    pub fn new(label: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            content: content.into(),
        }
    }
}

/// Position of a batch within the overall workload.
#[derive(Debug, Clone)]
pub struct BatchInfo {
    /// Zero-based batch index
    pub index: usize,
    /// Total number of batches
    pub total_batches: usize,
    /// Units in this batch
    pub unit_count: usize,
    /// Units across the whole workload
    pub total_units: usize,
}

/// Processes one unit or one batch of units.
#[async_trait]
pub trait BatchWorker: Send + Sync {
    /// Process a single unit (small-workload path).
    async fn run_unit(&self, unit: &WorkUnit, total_units: usize) -> Result<String, EngineError>;

    /// Process a whole batch (large-workload path).
    async fn run_batch(&self, units: &[WorkUnit], info: &BatchInfo) -> Result<String, EngineError>;
}

/// Partitions work, bounds concurrency, and reassembles ordered results.
pub struct BatchOrchestrator {
    batch_size: usize,
    max_concurrent_batches: usize,
}

impl BatchOrchestrator {
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            max_concurrent_batches: max_concurrent_batches.max(1),
        }
    }

    /// Run the workload, streaming results into the sink.
    pub async fn run(&self, units: &[WorkUnit], worker: Arc<dyn BatchWorker>, output: &OutputSink) {
        if units.is_empty() {
            return;
        }

        if units.len() <= self.batch_size {
            self.run_small(units, worker, output).await;
        } else {
            self.run_batched(units, worker, output).await;
        }
    }

    /// Small workload: process units in fixed-size groups, emitting each
    /// unit's result labeled by its own identity. Completion order within
    /// a group is irrelevant because the join preserves input order.
    async fn run_small(&self, units: &[WorkUnit], worker: Arc<dyn BatchWorker>, output: &OutputSink) {
        let total_units = units.len();
        debug!(units = total_units, "running small workload in capped groups");

        for group in units.chunks(SMALL_GROUP_SIZE) {
            let tasks = group.iter().map(|unit| {
                let worker = worker.clone();
                async move { (unit, worker.run_unit(unit, total_units).await) }
            });

            for (unit, result) in join_all(tasks).await {
                match result {
                    Ok(text) => {
                        let _ = output.send(format!("[{}] report\n---\n{}\n\n", unit.label, text));
                    }
                    Err(e) => {
                        warn!(unit = %unit.label, error = %e, "unit failed");
                        let _ = output.send(format!("[{}] failed: {}\n\n", unit.label, e));
                    }
                }
            }
        }
    }

    /// Large workload: partition into batches, process bounded groups of
    /// batches concurrently, and write each outcome into its batch-index
    /// slot so the final emission is in batch order.
    async fn run_batched(
        &self,
        units: &[WorkUnit],
        worker: Arc<dyn BatchWorker>,
        output: &OutputSink,
    ) {
        let total_units = units.len();
        let batches: Vec<&[WorkUnit]> = units.chunks(self.batch_size).collect();
        let total_batches = batches.len();
        info!(
            units = total_units,
            batches = total_batches,
            concurrency = self.max_concurrent_batches,
            "running batched workload"
        );

        let mut slots: Vec<Option<Result<String, String>>> = vec![None; total_batches];

        for (group_start, group) in batches
            .chunks(self.max_concurrent_batches)
            .enumerate()
            .map(|(g, group)| (g * self.max_concurrent_batches, group))
        {
            let tasks = group.iter().enumerate().map(|(offset, batch)| {
                let worker = worker.clone();
                let index = group_start + offset;
                let info = BatchInfo {
                    index,
                    total_batches,
                    unit_count: batch.len(),
                    total_units,
                };
                async move {
                    let outcome = worker
                        .run_batch(batch, &info)
                        .await
                        .map_err(|e| e.to_string());
                    (index, outcome)
                }
            });

            for (index, outcome) in join_all(tasks).await {
                if let Err(ref e) = outcome {
                    warn!(batch = index + 1, error = %e, "batch failed");
                }
                slots[index] = Some(outcome);
            }
        }

        let _ = output.send("# batch report\n".to_string());
        let _ = output.send(format!(
            "{total_units} units processed in {total_batches} batches\n\n"
        ));

        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(text)) => {
                    let _ = output.send(format!("## batch {} results\n", index + 1));
                    let _ = output.send(format!("{text}\n"));
                    let _ = output.send("\n---\n\n".to_string());
                }
                Some(Err(e)) => {
                    let _ = output.send(format!("## batch {} failed\n{e}\n\n---\n\n", index + 1));
                }
                None => {
                    let _ = output.send(format!("## batch {} failed\n\n---\n\n", index + 1));
                }
            }
        }
    }
}

/// A worker that drives a model provider once per unit or batch.
///
/// Renders a fixed instruction block above the unit content, streams the
/// model's response to completion, and returns the accumulated text.
pub struct PromptWorker {
    provider: Arc<dyn Provider>,
    instructions: String,
}

impl PromptWorker {
    pub fn new(provider: Arc<dyn Provider>, instructions: impl Into<String>) -> Self {
        Self {
            provider,
            instructions: instructions.into(),
        }
    }

    async fn collect(&self, prompt: String) -> Result<String, EngineError> {
        let mut stream = self
            .provider
            .think(ThinkRequest::from_prompt(prompt))
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?;

        let mut text = String::new();
        while let Some(chunk) = stream.recv().await {
            let chunk = chunk.map_err(|e| EngineError::Internal(e.to_string()))?;
            text.push_str(&chunk.text);
        }
        Ok(text)
    }

    fn render_unit(&self, unit: &WorkUnit) -> String {
        format!(
            "{}\n\n// {}:\n\n{}\n",
            self.instructions, unit.label, unit.content
        )
    }
}

#[async_trait]
impl BatchWorker for PromptWorker {
    async fn run_unit(&self, unit: &WorkUnit, _total_units: usize) -> Result<String, EngineError> {
        self.collect(self.render_unit(unit)).await
    }

    async fn run_batch(&self, units: &[WorkUnit], info: &BatchInfo) -> Result<String, EngineError> {
        let combined: String = units
            .iter()
            .map(|u| format!("// {}:\n\n{}\n", u.label, u.content))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "{}\n\nbatch {} of {} ({} of {} units)\n\n{}",
            self.instructions,
            info.index + 1,
            info.total_batches,
            info.unit_count,
            info.total_units,
            combined
        );
        self.collect(prompt).await
    }
}
