//! Credit cost estimation and pre-submission validation.
//!
//! Everything here is pure: no I/O, no clock, no shared state. A request
//! that fails [`validate`] never reaches the network.

use serde::{Deserialize, Serialize};

use crate::error::{ClassifiedError, ErrorKind};

/// Shortest text the service accepts.
pub const MIN_CHARS: usize = 50;

/// Hard cap enforced by the service regardless of plan.
pub const SERVICE_MAX_CHARS: usize = 15_000;

/// Cap for callers without an account.
pub const ANONYMOUS_MAX_CHARS: usize = 1_000;

/// Characters per credit.
const CHARS_PER_CREDIT: usize = 10;

/// What the caller's plan allows for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanContext {
    pub character_limit: usize,
    pub credits_remaining: u64,
}

/// Length of `text` in characters (Unicode scalar values).
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Credits charged for humanizing `text`: one per ten characters, rounded down.
pub fn estimate_cost(text: &str) -> u64 {
    (char_count(text) / CHARS_PER_CREDIT) as u64
}

/// Longest text allowed for the given plan, or for an anonymous caller.
pub fn max_chars(plan: Option<&PlanContext>) -> usize {
    match plan {
        Some(plan) => plan.character_limit.min(SERVICE_MAX_CHARS),
        None => ANONYMOUS_MAX_CHARS,
    }
}

/// Check `text` against length limits and, when a plan is present, the
/// remaining credit balance.
pub fn validate(text: &str, plan: Option<&PlanContext>) -> Result<(), ClassifiedError> {
    let len = char_count(text);
    if len < MIN_CHARS {
        return Err(ClassifiedError::new(ErrorKind::InputTooShort)
            .with_detail(format!("{len} characters, minimum is {MIN_CHARS}")));
    }

    let limit = max_chars(plan);
    if len > limit {
        return Err(ClassifiedError::new(ErrorKind::InputTooLong)
            .with_detail(format!("{len} characters, limit is {limit}")));
    }

    if let Some(plan) = plan {
        let cost = estimate_cost(text);
        if cost > plan.credits_remaining {
            return Err(ClassifiedError::new(ErrorKind::InsufficientCredits).with_detail(
                format!("job costs {cost} credits, {} remaining", plan.credits_remaining),
            ));
        }
    }

    Ok(())
}
