//! Rendering use case - turns records and session state into terminal text

use time::macros::format_description;

use crate::model::{ClassificationRecord, FeatureScores, HistoryStats};
use crate::ports::ClassificationError;
use crate::usecases::session::SessionState;

/// Configuration for the renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Include the derived risk profile bars
    pub include_risk_profile: bool,
    /// Include the analyzed content under the verdict
    pub include_content: bool,
    /// Width of a full risk bar in characters
    pub bar_width: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            include_risk_profile: true,
            include_content: false,
            bar_width: 10,
        }
    }
}

/// Renderer for classification records and session history
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render the full verdict card for one record
    pub fn render_record(&self, record: &ClassificationRecord) -> String {
        let mut lines = Vec::new();

        let headline = format!("{} Detected", record.classification);
        if record.classification.is_threat() {
            lines.push(format!("{}  [HIGH RISK]", headline));
        } else {
            lines.push(headline);
        }
        lines.push(format!("Confidence Score: {}", record.confidence_percent()));
        lines.push(format!("Analyzed at: {}", format_time(record)));
        lines.push(String::new());

        lines.push("Reasoning:".to_string());
        for reason in &record.reasoning {
            lines.push(format!("  - {}", reason));
        }
        lines.push(String::new());

        lines.push("Features:".to_string());
        let features = &record.features;
        lines.push(format!(
            "  Urgency level:      {}/{}",
            features.urgency_level,
            FeatureScores::MAX_SCORE
        ));
        lines.push(format!(
            "  Grammar quality:    {}/{}",
            features.grammar_quality,
            FeatureScores::MAX_SCORE
        ));
        lines.push(format!(
            "  Sender anonymity:   {}/{}",
            features.sender_anonymity,
            FeatureScores::MAX_SCORE
        ));
        lines.push(format!(
            "  Financial promises: {}",
            if features.financial_promises { "Detected" } else { "None" }
        ));
        lines.push(format!(
            "  Suspicious links:   {}",
            if features.suspicious_links { "Present" } else { "None" }
        ));

        if self.config.include_risk_profile {
            lines.push(String::new());
            lines.push("Risk Profile:".to_string());
            for (axis, value) in record.risk_profile().axes() {
                lines.push(format!("  {:<10} {} {}", axis, self.bar(value), value));
            }
        }

        if self.config.include_content {
            lines.push(String::new());
            lines.push("Content:".to_string());
            lines.push(record.content.clone());
        }

        lines.join("\n")
    }

    /// Render the history list, marking the current selection
    pub fn render_history(&self, state: &SessionState) -> String {
        if state.history().is_empty() {
            return "No recent analyses".to_string();
        }

        let current_id = state.current_result().map(|r| r.id);
        let mut lines = vec!["Recent History".to_string()];
        for (index, record) in state.history().iter().enumerate() {
            let marker = if Some(record.id) == current_id { '>' } else { ' ' };
            let dot = if record.classification.is_threat() { '!' } else { '+' };
            lines.push(format!(
                "{} {:>2}. {} {} {:<10} {}",
                marker,
                index + 1,
                format_time(record),
                dot,
                record.classification.as_str(),
                single_line(&record.preview())
            ));
        }
        lines.push(self.render_stats(state.stats()));

        lines.join("\n")
    }

    pub fn render_stats(&self, stats: HistoryStats) -> String {
        format!("Safe: {}  Spam/Phish: {}", stats.safe, stats.flagged)
    }

    /// Banner text for a failed analysis
    pub fn render_error(&self, error: &ClassificationError) -> String {
        format!(
            "Error [{}]: {}\n  {}",
            error.kind(),
            error.user_message(),
            error
        )
    }

    fn bar(&self, value: u8) -> String {
        let filled = usize::from(value) * self.config.bar_width / usize::from(FeatureScores::MAX_SCORE);
        format!(
            "{}{}",
            "#".repeat(filled),
            ".".repeat(self.config.bar_width.saturating_sub(filled))
        )
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

fn format_time(record: &ClassificationRecord) -> String {
    record
        .timestamp
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| record.timestamp.to_string())
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassificationKind, Verdict};
    use time::macros::datetime;

    fn sample_record(kind: ClassificationKind) -> ClassificationRecord {
        ClassificationRecord::from_verdict(
            "Win $1000 now!! Click http://bit.ly/xyz".to_string(),
            Verdict {
                classification: kind,
                confidence: 0.97,
                reasoning: vec![
                    "Urgent tone".to_string(),
                    "Suspicious shortened link".to_string(),
                ],
                features: FeatureScores {
                    urgency_level: 9,
                    suspicious_links: true,
                    grammar_quality: 4,
                    financial_promises: true,
                    sender_anonymity: 8,
                },
            },
            datetime!(2026-10-16 14:05:09 UTC),
        )
    }

    #[test]
    fn test_render_record_threat() {
        let renderer = Renderer::default();
        let text = renderer.render_record(&sample_record(ClassificationKind::Spam));

        assert!(text.starts_with("SPAM Detected  [HIGH RISK]"));
        assert!(text.contains("Confidence Score: 97.0%"));
        assert!(text.contains("14:05:09"));
        assert!(text.contains("  - Urgent tone\n  - Suspicious shortened link"));
        assert!(text.contains("Financial promises: Detected"));
        assert!(text.contains("Risk Profile:"));
        assert!(text.contains("Grammar    ######.... 6"));
        assert!(!text.contains("Content:"));
    }

    #[test]
    fn test_render_record_legitimate_without_profile() {
        let renderer = Renderer::new(RenderConfig {
            include_risk_profile: false,
            include_content: true,
            ..Default::default()
        });
        let text = renderer.render_record(&sample_record(ClassificationKind::Legitimate));

        assert!(text.starts_with("LEGITIMATE Detected\n"));
        assert!(!text.contains("HIGH RISK"));
        assert!(!text.contains("Risk Profile:"));
        assert!(text.ends_with("Content:\nWin $1000 now!! Click http://bit.ly/xyz"));
    }

    #[test]
    fn test_render_history_marks_current() {
        let mut state = SessionState::default();
        for kind in [ClassificationKind::Legitimate, ClassificationKind::Phishing] {
            state.set_input("text");
            state.begin_analysis().unwrap();
            state.finish_analysis(Ok(sample_record(kind))).unwrap();
        }

        let text = Renderer::default().render_history(&state);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "Recent History");
        assert!(lines[1].starts_with(">  1. 14:05:09 ! PHISHING"));
        assert!(lines[2].starts_with("   2. 14:05:09 + LEGITIMATE"));
        assert!(lines[1].ends_with("Win $1000 now!! Click http://bit.ly/xyz..."));
        assert_eq!(lines[3], "Safe: 1  Spam/Phish: 1");
    }

    #[test]
    fn test_render_empty_history() {
        let text = Renderer::default().render_history(&SessionState::default());
        assert_eq!(text, "No recent analyses");
    }

    #[test]
    fn test_render_error() {
        let text = Renderer::default()
            .render_error(&ClassificationError::MalformedResponse("eof".to_string()));
        assert!(text.starts_with("Error [malformed_response]: Failed to analyze email."));
        assert!(text.contains("Malformed response: eof"));
    }
}
