//! Structured-output contract shared by request builders and response parsers
//!
//! The same field list drives the schema sent to the classification service
//! and the validation applied to whatever comes back. Out-of-range values are
//! rejected rather than clamped.

use serde_json::{Map, Value, json};

use crate::model::{ClassificationKind, FeatureScores, Verdict};
use crate::ports::ClassificationError;

/// Schema flavour expected by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaDialect {
    /// Gemini `responseSchema` (OpenAPI subset, upper-case type names)
    Gemini,
    /// Standard JSON Schema as used by strict structured outputs
    JsonSchema,
}

impl SchemaDialect {
    fn type_name(&self, ty: &'static str) -> String {
        match self {
            Self::Gemini => ty.to_uppercase(),
            Self::JsonSchema => ty.to_string(),
        }
    }
}

/// Verdict schema and validator
pub struct VerdictSchema;

impl VerdictSchema {
    /// Top-level fields, all mandatory
    pub const REQUIRED_FIELDS: [&'static str; 4] =
        ["classification", "confidence", "reasoning", "features"];

    /// Feature fields, all mandatory
    pub const FEATURE_FIELDS: [&'static str; 5] = [
        "urgencyLevel",
        "suspiciousLinks",
        "grammarQuality",
        "financialPromises",
        "senderAnonymity",
    ];

    /// Build the response schema in the requested dialect
    pub fn response_schema(dialect: SchemaDialect) -> Value {
        let t = |ty| dialect.type_name(ty);
        let kinds: Vec<&str> = ClassificationKind::ALL.iter().map(|k| k.as_str()).collect();

        let mut classification = json!({
            "type": t("string"),
            "description": "The category: SPAM, PHISHING, or LEGITIMATE",
            "enum": kinds,
        });
        let mut confidence = json!({
            "type": t("number"),
            "description": "Confidence score between 0 and 1",
        });
        let score = |description: &str| {
            let mut prop = json!({ "type": t("integer"), "description": description });
            if dialect == SchemaDialect::Gemini {
                prop["minimum"] = json!(0);
                prop["maximum"] = json!(FeatureScores::MAX_SCORE);
            }
            prop
        };
        if dialect == SchemaDialect::Gemini {
            classification["format"] = json!("enum");
            confidence["minimum"] = json!(0);
            confidence["maximum"] = json!(1);
        }

        let mut features = json!({
            "type": t("object"),
            "properties": {
                "urgencyLevel": score("Scale 0-10 of how urgent the tone is"),
                "suspiciousLinks": {
                    "type": t("boolean"),
                    "description": "Presence of unusual URLs",
                },
                "grammarQuality": score("Scale 0-10 of linguistic correctness"),
                "financialPromises": {
                    "type": t("boolean"),
                    "description": "Presence of 'get rich quick' or 'unclaimed money' themes",
                },
                "senderAnonymity": score("Scale 0-10 of how obscured the sender seems"),
            },
            "required": Self::FEATURE_FIELDS,
        });

        let mut schema = json!({
            "type": t("object"),
            "properties": {
                "classification": classification,
                "confidence": confidence,
                "reasoning": {
                    "type": t("array"),
                    "items": { "type": t("string") },
                    "description": "Bullet points explaining the decision",
                },
                "features": features.clone(),
            },
            "required": Self::REQUIRED_FIELDS,
        });

        if dialect == SchemaDialect::JsonSchema {
            features["additionalProperties"] = json!(false);
            schema["properties"]["features"] = features;
            schema["additionalProperties"] = json!(false);
        }

        schema
    }

    /// Parse raw text as JSON and validate it
    pub fn parse(text: &str) -> Result<Verdict, ClassificationError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ClassificationError::MalformedResponse(format!("Failed to parse JSON: {}", e)))?;
        Self::validate(&value)
    }

    /// Validate a JSON value against the verdict schema
    pub fn validate(value: &Value) -> Result<Verdict, ClassificationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("response must be a JSON object"))?;

        let classification = required(obj, "classification")?
            .as_str()
            .ok_or_else(|| invalid("`classification` must be a string"))?
            .parse::<ClassificationKind>()
            .map_err(|e| invalid(e.to_string()))?;

        let confidence = required(obj, "confidence")?
            .as_f64()
            .ok_or_else(|| invalid("`confidence` must be a number"))?;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(invalid(format!(
                "`confidence` must be within [0, 1], got {}",
                confidence
            )));
        }

        let reasoning = required(obj, "reasoning")?
            .as_array()
            .ok_or_else(|| invalid("`reasoning` must be an array"))?
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid("`reasoning` items must be strings"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if reasoning.is_empty() {
            return Err(invalid("`reasoning` must not be empty"));
        }

        let features = required(obj, "features")?
            .as_object()
            .ok_or_else(|| invalid("`features` must be an object"))?;
        let features = FeatureScores {
            urgency_level: bounded_score(features, "urgencyLevel")?,
            suspicious_links: flag(features, "suspiciousLinks")?,
            grammar_quality: bounded_score(features, "grammarQuality")?,
            financial_promises: flag(features, "financialPromises")?,
            sender_anonymity: bounded_score(features, "senderAnonymity")?,
        };

        Ok(Verdict {
            classification,
            confidence,
            reasoning,
            features,
        })
    }
}

fn invalid(message: impl Into<String>) -> ClassificationError {
    ClassificationError::InvalidSchema(message.into())
}

fn required<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a Value, ClassificationError> {
    obj.get(field)
        .ok_or_else(|| invalid(format!("missing required field `{}`", field)))
}

fn flag(features: &Map<String, Value>, field: &str) -> Result<bool, ClassificationError> {
    required(features, field)?
        .as_bool()
        .ok_or_else(|| invalid(format!("`features.{}` must be a boolean", field)))
}

// Integral numbers only: 7 and 7.0 pass, 7.5 does not.
fn bounded_score(features: &Map<String, Value>, field: &str) -> Result<u8, ClassificationError> {
    let score = required(features, field)?
        .as_f64()
        .ok_or_else(|| invalid(format!("`features.{}` must be a number", field)))?;

    let max = f64::from(FeatureScores::MAX_SCORE);
    if !score.is_finite() || score.fract() != 0.0 || !(0.0..=max).contains(&score) {
        return Err(invalid(format!(
            "`features.{}` must be an integer within [0, {}], got {}",
            field,
            FeatureScores::MAX_SCORE,
            score
        )));
    }

    Ok(score as u8)
}
