//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Verdict category assigned to an email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClassificationKind {
    Spam,
    Phishing,
    Legitimate,
}

impl ClassificationKind {
    /// Every kind, in the order presented to the classification service
    pub const ALL: [ClassificationKind; 3] = [Self::Spam, Self::Phishing, Self::Legitimate];

    /// Wire name (`SPAM`, `PHISHING`, `LEGITIMATE`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spam => "SPAM",
            Self::Phishing => "PHISHING",
            Self::Legitimate => "LEGITIMATE",
        }
    }

    /// Spam and phishing are both flagged as high risk
    pub fn is_threat(&self) -> bool {
        !matches!(self, Self::Legitimate)
    }
}

impl fmt::Display for ClassificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the three classification kinds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown classification '{0}', expected one of SPAM, PHISHING, LEGITIMATE")]
pub struct UnknownClassification(pub String);

impl FromStr for ClassificationKind {
    type Err = UnknownClassification;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownClassification(s.to_string()))
    }
}

/// Five signals the classification service scores for every email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureScores {
    /// How urgent the tone is, 0-10
    pub urgency_level: u8,
    /// Presence of unusual URLs
    pub suspicious_links: bool,
    /// Linguistic correctness, 0-10 (10 is perfect)
    pub grammar_quality: u8,
    /// "Get rich quick" or "unclaimed money" themes
    pub financial_promises: bool,
    /// How obscured the sender seems, 0-10
    pub sender_anonymity: u8,
}

impl FeatureScores {
    /// Upper bound shared by every scored feature
    pub const MAX_SCORE: u8 = 10;

    /// Derive the risk profile plotted by the presentation layer
    pub fn risk_profile(&self) -> RiskProfile {
        let flag = |set: bool| if set { Self::MAX_SCORE } else { 0 };
        RiskProfile {
            urgency: self.urgency_level,
            links: flag(self.suspicious_links),
            grammar: Self::MAX_SCORE.saturating_sub(self.grammar_quality),
            money: flag(self.financial_promises),
            anonymity: self.sender_anonymity,
        }
    }
}

/// Risk view of the features where every axis reads "higher is worse"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskProfile {
    pub urgency: u8,
    pub links: u8,
    pub grammar: u8,
    pub money: u8,
    pub anonymity: u8,
}

impl RiskProfile {
    /// Labelled axes in display order
    pub fn axes(&self) -> [(&'static str, u8); 5] {
        [
            ("Urgency", self.urgency),
            ("Links", self.links),
            ("Grammar", self.grammar),
            ("Money", self.money),
            ("Anonymity", self.anonymity),
        ]
    }
}

/// Validated payload returned by the classification service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub classification: ClassificationKind,
    /// Confidence score 0.0-1.0
    pub confidence: f64,
    /// Explanations in presentation order
    pub reasoning: Vec<String>,
    pub features: FeatureScores,
}

/// One completed analysis, the unit of session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    /// Generated locally when the verdict is received
    pub id: Uuid,
    /// Local receipt time
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// The analyzed text, verbatim
    pub content: String,
    pub classification: ClassificationKind,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub features: FeatureScores,
}

impl ClassificationRecord {
    /// Characters kept by [`ClassificationRecord::preview`]
    pub const PREVIEW_CHARS: usize = 50;

    /// Combine a verdict with the original text, stamping a fresh id
    pub fn from_verdict(content: String, verdict: Verdict, timestamp: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            content,
            classification: verdict.classification,
            confidence: verdict.confidence,
            reasoning: verdict.reasoning,
            features: verdict.features,
        }
    }

    /// Confidence as a percentage with one decimal, e.g. `97.0%`
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }

    /// Leading characters of the content followed by an ellipsis
    pub fn preview(&self) -> String {
        let head: String = self.content.chars().take(Self::PREVIEW_CHARS).collect();
        format!("{}...", head)
    }

    pub fn risk_profile(&self) -> RiskProfile {
        self.features.risk_profile()
    }
}

/// Counts shown under the history list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    /// Records classified as legitimate
    pub safe: usize,
    /// Records classified as spam or phishing
    pub flagged: usize,
}

impl HistoryStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ClassificationRecord>) -> Self {
        records
            .into_iter()
            .fold(Self::default(), |mut stats, record| {
                if record.classification.is_threat() {
                    stats.flagged += 1;
                } else {
                    stats.safe += 1;
                }
                stats
            })
    }
}
