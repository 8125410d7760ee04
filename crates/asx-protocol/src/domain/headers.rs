//! Header names, the timestamp wire format and the freshness check.

use crate::domain::errors::AsxError;
use chrono::{DateTime, SecondsFormat, Utc};
use http::HeaderMap;
use std::time::Duration;

/// Sender's long-term identifier.
pub const RESOURCE_HEADER: &str = "signify-resource";
/// Send instant, RFC 3339 with fractional seconds and a fixed offset.
pub const TIMESTAMP_HEADER: &str = "signify-timestamp";
/// RFC 9421 signature parameters.
pub const SIGNATURE_INPUT_HEADER: &str = "signature-input";
/// RFC 9421 signature values.
pub const SIGNATURE_HEADER: &str = "signature";

/// Render an instant the way it travels in `signify-timestamp`.
///
/// Microsecond precision with an explicit `+00:00` offset, e.g.
/// `2026-10-19T08:15:30.250000+00:00`.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse a `signify-timestamp` value.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AsxError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|e| AsxError::InvalidTimestamp(e.to_string()))
}

/// Reject instants further than `window` from `received_at`, in either direction.
///
/// The comparison runs at full precision; a skew a fraction of a millisecond
/// past the window is stale.
pub fn check_freshness(
    sent_at: DateTime<Utc>,
    received_at: DateTime<Utc>,
    window: Duration,
) -> Result<(), AsxError> {
    let skew = received_at.signed_duration_since(sent_at);
    let magnitude = if skew < chrono::Duration::zero() {
        -skew
    } else {
        skew
    };

    // A window too large for chrono never goes stale.
    let stale = chrono::Duration::from_std(window).map_or(false, |window| magnitude > window);
    if stale {
        return Err(AsxError::StaleTimestamp {
            skew_ms: skew.num_milliseconds(),
        });
    }

    Ok(())
}

/// Last instant a message sent at `sent_at` and received at `received_at`
/// can still be fresh, extended by `ttl`. Replay entries live until here.
pub fn replay_expiry(
    sent_at: DateTime<Utc>,
    received_at: DateTime<Utc>,
    ttl: Duration,
) -> DateTime<Utc> {
    let latest = sent_at.max(received_at);
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| latest.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Get a header as text, treating non-UTF-8 values as absent.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Get a required header or fail with `MissingHeader`.
pub fn require_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AsxError> {
    header_str(headers, name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(AsxError::MissingHeader(name))
}

/// Path component covered by signatures: the path with any query removed.
pub fn signing_path(path: &str) -> &str {
    path.split_once('?').map_or(path, |(path, _)| path)
}
