//! Classification of fetched bytes as genuine content, error page, or
//! anti-bot page.
//!
//! Everything here is pure: no network, no disk, no clock. Rules apply in
//! order and the first failing rule decides the verdict:
//!
//! 1. body shorter than the tier minimum → invalid
//! 2. a known error marker inside the leading header window → invalid
//! 3. tier structure (PDF signature for the PDF tier) missing → invalid
//!
//! Otherwise the body is valid.

use std::fmt;

use crate::document::Representation;

/// Leading bytes of every PDF file.
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Error/anti-bot page markers looked for in the header window.
pub const ERROR_MARKERS: [&str; 2] = ["403 Forbidden", "Access Denied"];

/// Text on the host's proof-of-work interstitial served instead of a PDF.
pub const PROOF_OF_WORK_MARKER: &[u8] = b"Preparing to download";

/// Default number of leading bytes scanned for [`ERROR_MARKERS`].
pub const DEFAULT_HEADER_WINDOW: usize = 200;

/// Why a body was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictReason {
    Accepted,
    TooSmall { actual: usize, minimum: usize },
    ErrorMarker { marker: &'static str },
    MissingPdfSignature,
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::TooSmall { actual, minimum } => {
                write!(f, "body too small ({actual} bytes, minimum {minimum})")
            }
            Self::ErrorMarker { marker } => write!(f, "error page marker '{marker}'"),
            Self::MissingPdfSignature => f.write_str("missing PDF signature"),
        }
    }
}

/// Outcome of validating one fetch. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub is_valid: bool,
    pub reason: VerdictReason,
}

impl ValidationVerdict {
    const fn valid() -> Self {
        Self {
            is_valid: true,
            reason: VerdictReason::Accepted,
        }
    }

    const fn invalid(reason: VerdictReason) -> Self {
        Self {
            is_valid: false,
            reason,
        }
    }
}

/// Validates `bytes` for `tier` with the default header window.
#[must_use]
pub fn validate(bytes: &[u8], tier: Representation, minimum_size: usize) -> ValidationVerdict {
    validate_with_window(bytes, tier, minimum_size, DEFAULT_HEADER_WINDOW)
}

/// Validates `bytes` for `tier`, scanning only the first `header_window`
/// bytes for error markers.
#[must_use]
pub fn validate_with_window(
    bytes: &[u8],
    tier: Representation,
    minimum_size: usize,
    header_window: usize,
) -> ValidationVerdict {
    if bytes.len() < minimum_size {
        return ValidationVerdict::invalid(VerdictReason::TooSmall {
            actual: bytes.len(),
            minimum: minimum_size,
        });
    }

    let header = &bytes[..bytes.len().min(header_window)];
    if let Some(&marker) = ERROR_MARKERS
        .iter()
        .find(|marker| contains(header, marker.as_bytes()))
    {
        return ValidationVerdict::invalid(VerdictReason::ErrorMarker { marker });
    }

    if tier == Representation::Pdf && !bytes.starts_with(PDF_SIGNATURE) {
        return ValidationVerdict::invalid(VerdictReason::MissingPdfSignature);
    }

    ValidationVerdict::valid()
}

/// Returns true when a non-PDF body is the proof-of-work challenge page.
///
/// Scans the whole body: the marker sits below a script preamble.
#[must_use]
pub fn is_proof_of_work_challenge(bytes: &[u8]) -> bool {
    !bytes.starts_with(PDF_SIGNATURE) && contains(bytes, PROOF_OF_WORK_MARKER)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}
