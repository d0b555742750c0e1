use chrono::{DateTime, Utc};

use super::parser::{ParsedVerdict, VerdictParseError};
use super::ReviewerError;
use crate::marketplace::listings::domain::{AiReview, Recommendation};

pub const PARSE_FAILURE_ANALYSIS: &str = "AI parsing failed - auto-approved";
const FALLBACK_CONFIDENCE: u8 = 75;
const FALLBACK_SCORE: u8 = 75;

/// What to do when the reviewer answers but the reply cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseFailurePolicy {
    /// Approve at a fixed 75% confidence so vendor flakiness never blocks intake.
    #[default]
    AutoApprove,
    /// Leave the listing pending for an admin.
    ManualReview,
}

/// Auto-approve thresholds and failure handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationPolicy {
    pub min_confidence: u8,
    pub min_score: u8,
    pub on_parse_failure: ParseFailurePolicy,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            min_confidence: 75,
            min_score: 70,
            on_parse_failure: ParseFailurePolicy::default(),
        }
    }
}

/// Result of running a listing through the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    AutoApproved(AiReview),
    ManualReview {
        review: Option<AiReview>,
        reason: String,
    },
}

impl ReviewOutcome {
    pub const fn label(&self) -> &'static str {
        match self {
            ReviewOutcome::AutoApproved(_) => "auto_approved",
            ReviewOutcome::ManualReview { .. } => "manual_review",
        }
    }

    pub fn review(&self) -> Option<&AiReview> {
        match self {
            ReviewOutcome::AutoApproved(review) => Some(review),
            ReviewOutcome::ManualReview { review, .. } => review.as_ref(),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ReviewOutcome::AutoApproved(_) => None,
            ReviewOutcome::ManualReview { reason, .. } => Some(reason.as_str()),
        }
    }
}

impl ModerationPolicy {
    pub fn passes(&self, verdict: &ParsedVerdict) -> bool {
        verdict.recommendation == Recommendation::Approve
            && verdict.confidence >= self.min_confidence
            && verdict.score >= self.min_score
    }

    pub fn decide(
        &self,
        verdict: Result<ParsedVerdict, VerdictParseError>,
        at: DateTime<Utc>,
    ) -> ReviewOutcome {
        match verdict {
            Ok(verdict) if self.passes(&verdict) => {
                ReviewOutcome::AutoApproved(verdict.into_review(at))
            }
            Ok(verdict) => {
                let reason = format!(
                    "recommendation {} (confidence {}, score {}) below auto-approve threshold",
                    verdict.recommendation.label(),
                    verdict.confidence,
                    verdict.score
                );
                ReviewOutcome::ManualReview {
                    review: Some(verdict.into_review(at)),
                    reason,
                }
            }
            Err(err) => self.unparsable(&err, at),
        }
    }

    fn unparsable(&self, err: &VerdictParseError, at: DateTime<Utc>) -> ReviewOutcome {
        tracing::warn!(error = %err, policy = ?self.on_parse_failure, "reviewer reply unparsable");
        match self.on_parse_failure {
            ParseFailurePolicy::AutoApprove => ReviewOutcome::AutoApproved(AiReview {
                reviewed: true,
                confidence: FALLBACK_CONFIDENCE,
                score: FALLBACK_SCORE,
                recommendation: Some(Recommendation::Approve),
                analysis: PARSE_FAILURE_ANALYSIS.to_string(),
                concerns: Vec::new(),
                reviewed_at: at,
            }),
            ParseFailurePolicy::ManualReview => ReviewOutcome::ManualReview {
                review: Some(AiReview {
                    reviewed: true,
                    confidence: 0,
                    score: 0,
                    recommendation: Some(Recommendation::ManualReview),
                    analysis: format!("AI parsing failed - {err}"),
                    concerns: Vec::new(),
                    reviewed_at: at,
                }),
                reason: "reviewer reply could not be parsed".to_string(),
            },
        }
    }

    /// Transport failures always fail safe to manual review.
    pub fn unavailable(&self, err: &ReviewerError, at: DateTime<Utc>) -> ReviewOutcome {
        ReviewOutcome::ManualReview {
            review: Some(AiReview {
                reviewed: false,
                confidence: 0,
                score: 0,
                recommendation: None,
                analysis: format!("review unavailable: {err}"),
                concerns: Vec::new(),
                reviewed_at: at,
            }),
            reason: "automated review unavailable".to_string(),
        }
    }
}
