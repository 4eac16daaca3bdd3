use serde::Serialize;
use strum_macros::Display;

use crate::protocol::{KORG_ID, WAVESTATION_MODEL_ID};

use super::{SYSEX_END, SYSEX_START};

/// Smallest length accepted as a single-program patch.
pub const PATCH_MIN_LEN: usize = 11;
/// Smallest length accepted as a 128-program bank.
pub const BANK_MIN_LEN: usize = 10_001;

const VENDOR_OFFSET: usize = 1;
const MODEL_OFFSET: usize = 3;

/// Structural class of a stored or received payload.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// One program.
    Patch,
    /// A full bank of programs.
    Bank,
}

/// Structural checks for Wavestation payloads.
///
/// Only the delimiters, the vendor byte, the model byte (banks), and a
/// minimum length are inspected. Parameter fields are never parsed.
pub struct PayloadValidator;

impl PayloadValidator {
    /// Returns whether `data` is a well-formed Wavestation patch.
    ///
    /// ```
    /// use wsx::PayloadValidator;
    ///
    /// let patch = [0xF0, 0x42, 0x30, 0x3E, 0, 0, 0, 0, 0, 0, 0xF7];
    /// assert!(PayloadValidator::is_valid_patch(&patch));
    /// assert!(!PayloadValidator::is_valid_patch(&patch[..10]));
    /// ```
    #[must_use]
    pub fn is_valid_patch(data: &[u8]) -> bool {
        data.len() >= PATCH_MIN_LEN
            && data[0] == SYSEX_START
            && data[VENDOR_OFFSET] == KORG_ID
            && data[data.len() - 1] == SYSEX_END
    }

    /// Returns whether `data` is a well-formed Wavestation bank.
    #[must_use]
    pub fn is_valid_bank(data: &[u8]) -> bool {
        data.len() >= BANK_MIN_LEN
            && data[0] == SYSEX_START
            && data[VENDOR_OFFSET] == KORG_ID
            && data[MODEL_OFFSET] == WAVESTATION_MODEL_ID
            && data[data.len() - 1] == SYSEX_END
    }

    /// Returns whether `data` is well formed for `kind`.
    #[must_use]
    pub fn is_valid(kind: PayloadKind, data: &[u8]) -> bool {
        match kind {
            PayloadKind::Patch => Self::is_valid_patch(data),
            PayloadKind::Bank => Self::is_valid_bank(data),
        }
    }

    /// Classifies `data`, preferring bank over patch.
    ///
    /// Every valid bank also satisfies the patch rules, so the stricter check
    /// runs first.
    #[must_use]
    pub fn classify(data: &[u8]) -> Option<PayloadKind> {
        if Self::is_valid_bank(data) {
            Some(PayloadKind::Bank)
        } else if Self::is_valid_patch(data) {
            Some(PayloadKind::Patch)
        } else {
            None
        }
    }
}
