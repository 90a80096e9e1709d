//! Session controller - single-flight analysis with bounded history

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    model::{ClassificationRecord, HistoryStats},
    ports::{ClassificationError, Classifier},
};

/// Number of records kept when no capacity is configured
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Configuration for the session controller
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum records kept in history (oldest evicted first)
    pub history_capacity: usize,
    /// Upper bound on a single classification call (None = wait indefinitely)
    pub timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            timeout: None,
        }
    }
}

/// Why a submit did not start an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Input was empty after trimming
    EmptyInput,
    /// Another analysis is in flight
    AlreadyAnalyzing,
}

/// Result of a submit that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The classifier produced a record, now current and at the head of history
    Completed(ClassificationRecord),
    /// The guard rejected the submit; nothing changed
    Skipped(SkipReason),
}

/// Everything a presentation layer needs to render a session
///
/// History is ordered most recent first and never exceeds the capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    input_text: String,
    is_analyzing: bool,
    current_result: Option<ClassificationRecord>,
    history: Vec<ClassificationRecord>,
    #[serde(skip)]
    capacity: usize,
}

impl SessionState {
    pub fn new(capacity: usize) -> Self {
        Self {
            input_text: String::new(),
            is_analyzing: false,
            current_result: None,
            history: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn is_analyzing(&self) -> bool {
        self.is_analyzing
    }

    pub fn current_result(&self) -> Option<&ClassificationRecord> {
        self.current_result.as_ref()
    }

    pub fn history(&self) -> &[ClassificationRecord] {
        &self.history
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats::from_records(&self.history)
    }

    /// Replace the input text; allowed while an analysis is in flight
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input_text = text.into();
    }

    pub fn clear_input(&mut self) {
        self.input_text.clear();
    }

    /// Enter the analyzing state, returning the text to classify
    pub fn begin_analysis(&mut self) -> Result<String, SkipReason> {
        if self.is_analyzing {
            return Err(SkipReason::AlreadyAnalyzing);
        }
        if self.input_text.trim().is_empty() {
            return Err(SkipReason::EmptyInput);
        }
        self.is_analyzing = true;
        Ok(self.input_text.clone())
    }

    /// Leave the analyzing state, applying the classifier's result
    ///
    /// On failure only the analyzing flag changes.
    pub fn finish_analysis(
        &mut self,
        result: Result<ClassificationRecord, ClassificationError>,
    ) -> Result<ClassificationRecord, ClassificationError> {
        self.is_analyzing = false;
        let record = result?;

        self.history.retain(|existing| existing.id != record.id);
        self.history.insert(0, record.clone());
        self.history.truncate(self.capacity);
        self.current_result = Some(record.clone());

        Ok(record)
    }

    /// Leave the analyzing state without a result
    pub fn abandon_analysis(&mut self) {
        self.is_analyzing = false;
    }

    /// Make the history record with `id` current; returns false if absent
    pub fn select_history_item(&mut self, id: Uuid) -> bool {
        match self.history.iter().find(|record| record.id == id) {
            Some(record) => {
                self.current_result = Some(record.clone());
                true
            }
            None => false,
        }
    }

    /// Empty the history; the current result stays
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Owns the session state and drives the classifier
///
/// The state lock is never held across the classifier call, so input edits
/// and re-entrant submits observe the in-flight analysis.
pub struct SessionController<C: Classifier + ?Sized> {
    classifier: Arc<C>,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl<C: Classifier + ?Sized> SessionController<C> {
    pub fn new(classifier: Arc<C>, config: SessionConfig) -> Self {
        let state = SessionState::new(config.history_capacity);
        Self {
            classifier,
            config,
            state: Mutex::new(state),
        }
    }

    /// Copy of the current state for rendering
    pub fn snapshot(&self) -> SessionState {
        lock(&self.state).clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        lock(&self.state).set_input(text);
    }

    pub fn clear_input(&self) {
        lock(&self.state).clear_input();
    }

    pub fn select_history_item(&self, id: Uuid) -> bool {
        let found = lock(&self.state).select_history_item(id);
        if !found {
            tracing::debug!(%id, "History item not found");
        }
        found
    }

    pub fn clear_history(&self) {
        lock(&self.state).clear_history();
        tracing::debug!("History cleared");
    }

    /// Classify the current input
    ///
    /// Empty input or an in-flight analysis makes this a no-op. Failures leave
    /// history and the current result untouched and are returned to the caller.
    pub async fn submit(&self) -> Result<SubmitOutcome, ClassificationError> {
        let begun = lock(&self.state).begin_analysis();
        let text = match begun {
            Ok(text) => text,
            Err(reason) => {
                tracing::debug!(?reason, "Submit ignored");
                return Ok(SubmitOutcome::Skipped(reason));
            }
        };

        let in_flight = InFlight {
            state: &self.state,
            finished: false,
        };

        tracing::info!(text_length = text.len(), "Analyzing email");

        let result = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, self.classifier.classify(&text))
                .await
                .unwrap_or_else(|_| {
                    Err(ClassificationError::Unreachable(format!(
                        "timed out after {}s",
                        limit.as_secs_f64()
                    )))
                }),
            None => self.classifier.classify(&text).await,
        };

        match in_flight.finish(result) {
            Ok(record) => {
                tracing::info!(
                    id = %record.id,
                    classification = %record.classification,
                    confidence = record.confidence,
                    "Analysis complete"
                );
                Ok(SubmitOutcome::Completed(record))
            }
            Err(e) => {
                tracing::warn!(kind = %e.kind(), error = %e, "Analysis failed");
                Err(e)
            }
        }
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the analyzing flag even if the submit future is dropped mid-call
struct InFlight<'a> {
    state: &'a Mutex<SessionState>,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(
        mut self,
        result: Result<ClassificationRecord, ClassificationError>,
    ) -> Result<ClassificationRecord, ClassificationError> {
        self.finished = true;
        lock(self.state).finish_analysis(result)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            lock(self.state).abandon_analysis();
        }
    }
}
