//! Reads the `exp` claim of a JWT access token to decide whether it needs renewing.
//!
//! Only the payload segment is decoded. The signature is never checked: the token came from the
//! renewal endpoint over a trusted channel, and all this module needs is its expiry instant.

// crates.io
use base64::{
	Engine as _, alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
// self
use crate::_prelude::*;

/// Safety margin before the true expiry at which a token already counts as expired.
pub const EXPIRE_FUDGE: Duration = Duration::seconds(10);

const UNKNOWN_REMAINING: Duration = Duration::seconds(-1);
// JWT segments are unpadded, but some issuers pad them anyway.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
	&alphabet::URL_SAFE,
	GeneralPurposeConfig::new()
		.with_encode_padding(false)
		.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Reasons a token's expiry claim could not be read.
#[derive(Debug, ThisError)]
pub enum ClaimsError {
	/// The token does not have a payload segment.
	#[error("Token is not a JWT: payload segment is missing.")]
	MissingPayload,
	/// The payload segment is not valid base64url.
	#[error("Token payload is not valid base64url.")]
	Base64(#[from] base64::DecodeError),
	/// The payload is not a JSON object with a numeric `exp`.
	#[error("Token payload is not valid claims JSON.")]
	Json(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// The `exp` claim cannot be represented as an instant.
	#[error("Token exp claim is out of range.")]
	OutOfRange,
}

#[derive(Deserialize)]
struct ExpiryClaim {
	#[serde(default)]
	exp: Option<f64>,
}

/// Decodes the `exp` claim (seconds since the Unix epoch) from a JWT.
///
/// Returns `Ok(None)` for a well-formed token without an expiry claim.
pub fn decode_expiry(token: &str) -> Result<Option<OffsetDateTime>, ClaimsError> {
	let payload = token.split('.').nth(1).filter(|segment| !segment.is_empty());
	let payload = payload.ok_or(ClaimsError::MissingPayload)?;
	let bytes = URL_SAFE_LENIENT.decode(payload)?;
	let mut de = serde_json::Deserializer::from_slice(&bytes);
	let claim: ExpiryClaim = serde_path_to_error::deserialize(&mut de)?;
	let Some(exp) = claim.exp else {
		return Ok(None);
	};

	if !exp.is_finite() {
		return Err(ClaimsError::OutOfRange);
	}

	let nanos = (exp * 1_000_000_000.) as i128;

	OffsetDateTime::from_unix_timestamp_nanos(nanos).map(Some).map_err(|_| ClaimsError::OutOfRange)
}

/// Time left before `token` expires, measured from `now`.
///
/// Malformed tokens and tokens without an `exp` claim report `-1s`, i.e. already expired.
pub fn remaining_at(token: &str, now: OffsetDateTime) -> Duration {
	match decode_expiry(token) {
		Ok(Some(expires_at)) => expires_at - now,
		_ => UNKNOWN_REMAINING,
	}
}

/// Time left before `token` expires, measured from the current clock.
pub fn remaining(token: &str) -> Duration {
	remaining_at(token, OffsetDateTime::now_utc())
}

/// Returns `true` if `token` is empty or expires within [`EXPIRE_FUDGE`] of `now`.
pub fn is_expired_at(token: &str, now: OffsetDateTime) -> bool {
	token.is_empty() || remaining_at(token, now) <= EXPIRE_FUDGE
}

/// Returns `true` if `token` is empty or expires within [`EXPIRE_FUDGE`] of the current clock.
pub fn is_expired(token: &str) -> bool {
	is_expired_at(token, OffsetDateTime::now_utc())
}
