//! `token` command: inspect a shared access signature.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::adapter::inbound::cli::output;
use crate::domain::token;
use crate::error::Result;

/// What a token's expiry field says about it at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenReport {
    pub expires_at: DateTime<Utc>,
    /// `None` once the token has expired.
    pub remaining: Option<Duration>,
    pub usable: bool,
}

/// Evaluate `token` against `buffer` at `now`.
///
/// # Errors
///
/// Returns `InvalidToken` when the expiry field is missing or malformed.
pub fn inspect(token: &str, buffer: Duration, now: DateTime<Utc>) -> Result<TokenReport> {
    let expires_at = token::expiry(token)?;
    let remaining = token::remaining_at(token, now);
    Ok(TokenReport {
        expires_at,
        remaining,
        usable: remaining.is_some_and(|left| left > buffer),
    })
}

/// Print the report for `token`. Returns whether the token is usable.
pub fn execute(token: &str, buffer: Duration) -> Result<bool> {
    let report = inspect(token, buffer, Utc::now())?;

    output::section("Token");
    output::field("Expires at", report.expires_at.to_rfc3339());
    match report.remaining {
        Some(left) => output::field("Remaining", format_duration(left)),
        None => output::field("Remaining", "expired"),
    }
    output::field("Buffer", format_duration(buffer));

    if report.usable {
        output::success("Token is usable");
    } else if report.remaining.is_some() {
        output::warning("Token is inside the expiry buffer and will not be handed out");
    } else {
        output::warning("Token has expired");
    }
    Ok(report.usable)
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, secs % 3600 / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}
