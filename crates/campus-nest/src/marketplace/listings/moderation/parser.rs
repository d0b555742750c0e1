use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::marketplace::listings::domain::{AiReview, Recommendation};

/// Verdict decoded from a reviewer reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVerdict {
    pub confidence: u8,
    pub score: u8,
    pub recommendation: Recommendation,
    pub analysis: String,
    pub concerns: Vec<String>,
}

impl ParsedVerdict {
    pub fn into_review(self, at: DateTime<Utc>) -> AiReview {
        AiReview {
            reviewed: true,
            confidence: self.confidence,
            score: self.score,
            recommendation: Some(self.recommendation),
            analysis: self.analysis,
            concerns: self.concerns,
            reviewed_at: at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerdictParseError {
    #[error("reviewer reply was empty")]
    Empty,
    #[error("no JSON object found in reviewer reply")]
    NoJsonObject,
    #[error("malformed verdict: {0}")]
    Malformed(String),
    #[error("{field} must be between 0 and 100 (got {value})")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("unknown recommendation '{0}'")]
    UnknownRecommendation(String),
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    confidence: f64,
    score: f64,
    recommendation: String,
    #[serde(default, alias = "analysis")]
    reason: Option<String>,
    #[serde(default, alias = "flags")]
    concerns: Option<Vec<String>>,
}

/// Decode a reviewer reply. Models often wrap the JSON in prose or code
/// fences, so the span from the first `{` to the last `}` is decoded.
pub fn parse_verdict(reply: &str) -> Result<ParsedVerdict, VerdictParseError> {
    let reply = reply.trim();
    if reply.is_empty() {
        return Err(VerdictParseError::Empty);
    }

    let object = extract_object(reply).ok_or(VerdictParseError::NoJsonObject)?;
    let value: Value = serde_json::from_str(object)
        .map_err(|err| VerdictParseError::Malformed(err.to_string()))?;
    let raw: RawVerdict = serde_json::from_value(value)
        .map_err(|err| VerdictParseError::Malformed(err.to_string()))?;

    Ok(ParsedVerdict {
        confidence: percent("confidence", raw.confidence)?,
        score: percent("score", raw.score)?,
        recommendation: recommendation(&raw.recommendation)?,
        analysis: raw.reason.unwrap_or_default().trim().to_string(),
        concerns: raw
            .concerns
            .unwrap_or_default()
            .into_iter()
            .map(|concern| concern.trim().to_string())
            .filter(|concern| !concern.is_empty())
            .collect(),
    })
}

fn extract_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn percent(field: &'static str, value: f64) -> Result<u8, VerdictParseError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(VerdictParseError::OutOfRange { field, value });
    }
    Ok(value.round() as u8)
}

fn recommendation(raw: &str) -> Result<Recommendation, VerdictParseError> {
    let normalized = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
    match normalized.as_str() {
        "APPROVE" => Ok(Recommendation::Approve),
        "REJECT" => Ok(Recommendation::Reject),
        "MANUAL_REVIEW" => Ok(Recommendation::ManualReview),
        _ => Err(VerdictParseError::UnknownRecommendation(raw.to_string())),
    }
}
