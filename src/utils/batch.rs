// src/utils/batch.rs
//! Per-item outcomes collected by every pipeline stage.
//!
//! Stages never abort on a single bad item. Instead each item lands in a
//! [`BatchReport`] under a key (usually a URL or filename) so callers and tests
//! can see exactly what was produced, reused, skipped or failed.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome<T> {
    /// Output produced during this run.
    Done(T),
    /// Output already existed and was left untouched.
    Reused(T),
    /// Nothing to produce for this item (e.g. a report with no PDF attachments).
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry<T> {
    pub key: String,
    pub outcome: ItemOutcome<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport<T> {
    entries: Vec<BatchEntry<T>>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> BatchReport<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, key: impl Into<String>, outcome: ItemOutcome<T>) {
        self.entries.push(BatchEntry { key: key.into(), outcome });
    }

    pub fn done(&mut self, key: impl Into<String>, value: T) {
        self.push(key, ItemOutcome::Done(value));
    }

    pub fn reused(&mut self, key: impl Into<String>, value: T) {
        self.push(key, ItemOutcome::Reused(value));
    }

    pub fn skipped(&mut self, key: impl Into<String>, reason: impl Into<String>) {
        let key = key.into();
        let reason = reason.into();
        tracing::info!("Skipping {}: {}", key, reason);
        self.push(key, ItemOutcome::Skipped(reason));
    }

    /// Records a failure and emits the per-item warning.
    pub fn failed(&mut self, key: impl Into<String>, reason: impl fmt::Display) {
        let key = key.into();
        let reason = reason.to_string();
        tracing::warn!("Failed {}: {}", key, reason);
        self.push(key, ItemOutcome::Failed(reason));
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[BatchEntry<T>] {
        &self.entries
    }

    /// Values that are available after this run, whether fresh or reused.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            ItemOutcome::Done(v) | ItemOutcome::Reused(v) => Some(v),
            _ => None,
        })
    }

    #[cfg(test)]
    pub fn into_values(self) -> Vec<T> {
        self.entries
            .into_iter()
            .filter_map(|e| match e.outcome {
                ItemOutcome::Done(v) | ItemOutcome::Reused(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            ItemOutcome::Failed(reason) => Some((e.key.as_str(), reason.as_str())),
            _ => None,
        })
    }

    pub fn done_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Done(_)))
    }

    pub fn reused_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Reused(_)))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped(_)))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&ItemOutcome<T>) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> fmt::Display for BatchReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} done, {} reused, {} skipped, {} failed",
            self.done_count(),
            self.reused_count(),
            self.skipped_count(),
            self.failed_count()
        )
    }
}
