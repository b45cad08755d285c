//! Encoding assumption checks.
//!
//! Non-ASCII text survives only if three things agree: the encoding of the
//! compiled literals, the codepage the OS narrow-string APIs use, and what
//! the console host does with bytes. This module covers the first two and
//! the path-decoding consequence of the second.

use std::fmt;

use tracing::{debug, warn};

use crate::error::{ConsoleError, Result};
use crate::platform::{ConsoleApi, CP_UTF8};

/// A literal with exactly one non-ASCII character.
pub const PROBE_LITERAL: &str = "ø";

/// UTF-8 encoding of [`PROBE_LITERAL`].
const PROBE_UTF8: [u8; 2] = [0xC3, 0xB8];

/// Whether string literals in this binary are UTF-8 encoded.
pub const fn literals_are_utf8() -> bool {
    let bytes = PROBE_LITERAL.as_bytes();
    bytes.len() == 2 && bytes[0] == PROBE_UTF8[0] && bytes[1] == PROBE_UTF8[1]
}

const _: () = assert!(literals_are_utf8(), "string literals must be UTF-8 encoded");

/// Whether the narrow-string APIs of this process treat bytes as UTF-8.
pub fn os_api_is_utf8<A: ConsoleApi>(api: &A) -> bool {
    api.process_ansi_codepage() == CP_UTF8
}

/// Both encoding facts of the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingAssumption {
    pub literals_are_utf8: bool,
    pub os_api_is_utf8: bool,
}

impl EncodingAssumption {
    pub fn detect<A: ConsoleApi>(api: &A) -> Self {
        let assumption = Self {
            literals_are_utf8: literals_are_utf8(),
            os_api_is_utf8: os_api_is_utf8(api),
        };
        debug!("Encoding assumption: {:?}", assumption);
        assumption
    }

    pub fn holds(&self) -> bool {
        self.literals_are_utf8 && self.os_api_is_utf8
    }

    /// Fails unless both literals and OS APIs are UTF-8.
    pub fn verify(&self) -> Result<()> {
        if !self.literals_are_utf8 {
            return Err(ConsoleError::EncodingAssumptionViolated(
                "string literals are not UTF-8 encoded".to_string(),
            ));
        }
        if !self.os_api_is_utf8 {
            return Err(ConsoleError::EncodingAssumptionViolated(
                "the process ANSI codepage isn't UTF-8 (use a manifest with activeCodePage UTF-8)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// How the narrow-string path APIs read the bytes of [`PROBE_LITERAL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathEncoding {
    /// Decoded to the single intended code point.
    Utf8 { code_points: Vec<u32> },
    /// Each byte became its own character of a legacy single-byte codepage.
    LegacyCodepage { code_points: Vec<u32> },
    /// Neither reading fits.
    Inconsistent { code_points: Vec<u32> },
}

impl PathEncoding {
    pub fn code_points(&self) -> &[u32] {
        match self {
            Self::Utf8 { code_points }
            | Self::LegacyCodepage { code_points }
            | Self::Inconsistent { code_points } => code_points,
        }
    }

    /// Fails for [`PathEncoding::Inconsistent`].
    pub fn require_consistent(&self) -> Result<()> {
        match self {
            Self::Inconsistent { code_points } => Err(ConsoleError::EncodingAssumptionViolated(
                format!("path decoding of \"{}\" gave {:?}", PROBE_LITERAL, code_points),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for PathEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = match self {
            Self::Utf8 { .. } => "interpreted as UTF-8",
            Self::LegacyCodepage { .. } => "interpreted as legacy codepage",
            Self::Inconsistent { .. } => "inconsistent",
        };
        let points: Vec<String> = self.code_points().iter().map(|c| c.to_string()).collect();
        write!(f, "{} ({} code points: {})", verdict, points.len(), points.join(" "))
    }
}

/// Decodes the probe literal through the OS narrow-string decoding and
/// classifies the result.
pub fn check_path_encoding<A: ConsoleApi>(api: &A) -> Result<PathEncoding> {
    let wide = api.decode_narrow(PROBE_LITERAL.as_bytes())?;
    let code_points: Vec<u32> = char::decode_utf16(wide.iter().copied())
        .map(|r| r.map_or(char::REPLACEMENT_CHARACTER as u32, |c| c as u32))
        .collect();

    let intended: Vec<u32> = PROBE_LITERAL.chars().map(|c| c as u32).collect();
    let as_utf8 = code_points == intended;
    let as_legacy = code_points.len() != 1 && code_points.first() == Some(&(PROBE_UTF8[0] as u32));
    let verdict = match (as_utf8, as_legacy) {
        (true, false) => PathEncoding::Utf8 { code_points },
        (false, true) => PathEncoding::LegacyCodepage { code_points },
        _ => {
            warn!("Inconsistent path decoding: {:?}", code_points);
            PathEncoding::Inconsistent { code_points }
        }
    };
    debug!("Path encoding: {}", verdict);
    Ok(verdict)
}
