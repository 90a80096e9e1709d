//! Stub classifier for testing and offline mode

use async_trait::async_trait;
use spam_shield_domain::{
    ClassificationError, ClassificationKind, ClassificationRecord, Classifier, Clock,
    FeatureScores, SystemClock, Verdict,
};
use std::sync::Arc;

/// Stub classifier that returns configurable responses
///
/// It never looks at the text: every call yields the configured verdict
/// or error.
pub struct StubClassifier {
    response: Result<Verdict, ClassificationError>,
    clock: Arc<dyn Clock>,
}

impl StubClassifier {
    /// Create a stub that returns a fixed shortened-link spam verdict
    pub fn canned() -> Self {
        Self::with_response(Verdict {
            classification: ClassificationKind::Spam,
            confidence: 0.97,
            reasoning: vec![
                "Stub verdict: Urgent tone".to_string(),
                "Stub verdict: Suspicious shortened link".to_string(),
            ],
            features: FeatureScores {
                urgency_level: 9,
                suspicious_links: true,
                grammar_quality: 4,
                financial_promises: true,
                sender_anonymity: 8,
            },
        })
    }

    /// Create a stub that returns a specific verdict
    pub fn with_response(response: Verdict) -> Self {
        Self {
            response: Ok(response),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a stub that always returns an error
    pub fn with_error(error: ClassificationError) -> Self {
        Self {
            response: Err(error),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for StubClassifier {
    fn default() -> Self {
        Self::canned()
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationRecord, ClassificationError> {
        let verdict = self.response.clone()?;

        Ok(ClassificationRecord::from_verdict(
            text.to_string(),
            verdict,
            self.clock.now(),
        ))
    }
}
