//! Token and cost estimation for crew results.
//!
//! The calling application stores `tokens_used` and `cost` exactly as we
//! report them, so both formulas are fixed:
//! - tokens: whitespace word count × 1.3, truncated toward zero
//! - cost: `(tokens / 1000) × 0.000375` USD, rounded to 4 decimals
//!
//! The rate is the blended gpt-4o-mini price ($0.15/1M input, $0.60/1M output).
//! Neither number is a real provider count; see `CrewOutput::usage` for that.

/// Blended USD price per 1K tokens.
pub const USD_PER_1K_TOKENS: f64 = 0.000375;

/// Approximate tokens per whitespace-separated word.
pub const TOKENS_PER_WORD: f64 = 1.3;

/// Estimate the token count of a result text.
pub fn estimate_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count();
    (words as f64 * TOKENS_PER_WORD) as u64
}

/// Estimate the USD cost of `tokens`, rounded to 4 decimal places.
pub fn estimate_cost(tokens: u64) -> f64 {
    round_to(tokens as f64 / 1000.0 * USD_PER_1K_TOKENS, 4)
}

/// Round to `decimals` places. Ties are decided on the exact binary value,
/// the same way the calling system's `round(x, 4)` decides them.
fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}
