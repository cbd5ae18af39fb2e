//! Decode-failure classification
//!
//! Decoders report a failure for every frame without a readable symbol.
//! Those messages are expected noise; only permission, device and security
//! errors are critical.

use crate::error::ErrorKind;
use once_cell::sync::Lazy;
use regex::RegexSet;

const NOISE_PATTERNS: &[&str] = &[
    "No MultiFormat Readers were able to detect the code.",
    "QR code parse error",
    "unable to parse scan result",
];

const CRITICAL_PATTERNS: &[&str] = &[
    "NotAllowedError",
    "NotFoundError",
    "SecurityError",
    "OverconstrainedError",
];

static NOISE: Lazy<RegexSet> = Lazy::new(|| literal_set(NOISE_PATTERNS));
static CRITICAL: Lazy<RegexSet> = Lazy::new(|| literal_set(CRITICAL_PATTERNS));

fn literal_set(patterns: &[&str]) -> RegexSet {
    // Escaped literals always compile.
    RegexSet::new(patterns.iter().map(|p| regex::escape(p)))
        .unwrap_or_else(|_| RegexSet::empty())
}

/// Classify a decode-failure message.
///
/// Returns [`ErrorKind::DecodeNoise`], [`ErrorKind::CriticalDecodeError`]
/// or, for anything unrecognised, [`ErrorKind::DecodeFailure`]. Noise wins
/// when a message matches both sets.
#[must_use]
pub fn classify_decode_failure(message: &str) -> ErrorKind {
    if NOISE.is_match(message) {
        ErrorKind::DecodeNoise
    } else if CRITICAL.is_match(message) {
        ErrorKind::CriticalDecodeError
    } else {
        ErrorKind::DecodeFailure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_code_in_frame_is_noise() {
        assert_eq!(
            classify_decode_failure(
                "QR code parse error, error = NotFoundException: No MultiFormat Readers were able to detect the code."
            ),
            ErrorKind::DecodeNoise
        );
        assert_eq!(
            classify_decode_failure("No MultiFormat Readers were able to detect the code."),
            ErrorKind::DecodeNoise
        );
        assert_eq!(classify_decode_failure("QR code parse error"), ErrorKind::DecodeNoise);
        assert_eq!(
            classify_decode_failure("unable to parse scan result"),
            ErrorKind::DecodeNoise
        );
    }

    #[test]
    fn permission_errors_are_critical() {
        for msg in [
            "NotAllowedError: Permission denied",
            "NotFoundError: Requested device not found",
            "SecurityError: insecure context",
            "OverconstrainedError: facingMode",
        ] {
            assert_eq!(classify_decode_failure(msg), ErrorKind::CriticalDecodeError, "{msg}");
        }
    }

    #[test]
    fn other_messages_are_plain_failures() {
        assert_eq!(
            classify_decode_failure("decoder worker crashed"),
            ErrorKind::DecodeFailure
        );
        assert_eq!(classify_decode_failure(""), ErrorKind::DecodeFailure);
    }

    #[test]
    fn pattern_dots_are_literal() {
        // The trailing '.' must not match an arbitrary character.
        assert_eq!(
            classify_decode_failure("No MultiFormat Readers were able to detect the code!"),
            ErrorKind::DecodeFailure
        );
    }
}
