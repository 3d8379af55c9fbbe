//! Spectral form selection.
//!
//! A form names the region of the spectrum an eigen request targets. Forms
//! are parsed from two-letter mnemonics (`"lm"`, `"sm"`, `"la"`, `"sa"`,
//! `"lr"`, `"sr"`, `"li"`, `"si"`); only the first two characters of the text
//! are considered and matching is case-sensitive. Anything unrecognised maps
//! to [`SpectralForm::None`].

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Region of the spectrum to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SpectralForm {
    /// Unrecognised or missing mnemonic.
    #[default]
    None,
    LargestMagnitude,
    SmallestMagnitude,
    LargestAlgebraic,
    SmallestAlgebraic,
    LargestReal,
    SmallestReal,
    LargestImaginary,
    SmallestImaginary,
}

impl SpectralForm {
    /// All recognised forms in mnemonic order.
    pub const ALL: [SpectralForm; 8] = [
        SpectralForm::LargestMagnitude,
        SpectralForm::SmallestMagnitude,
        SpectralForm::LargestAlgebraic,
        SpectralForm::SmallestAlgebraic,
        SpectralForm::LargestReal,
        SpectralForm::SmallestReal,
        SpectralForm::LargestImaginary,
        SpectralForm::SmallestImaginary,
    ];

    /// Parse a mnemonic. A missing mnemonic maps to [`SpectralForm::None`].
    pub fn from_mnemonic(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return SpectralForm::None;
        };
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some('l'), Some('m')) => SpectralForm::LargestMagnitude,
            (Some('s'), Some('m')) => SpectralForm::SmallestMagnitude,
            (Some('l'), Some('a')) => SpectralForm::LargestAlgebraic,
            (Some('s'), Some('a')) => SpectralForm::SmallestAlgebraic,
            (Some('l'), Some('r')) => SpectralForm::LargestReal,
            (Some('s'), Some('r')) => SpectralForm::SmallestReal,
            (Some('l'), Some('i')) => SpectralForm::LargestImaginary,
            (Some('s'), Some('i')) => SpectralForm::SmallestImaginary,
            _ => SpectralForm::None,
        }
    }

    /// The two-letter mnemonic, empty for [`SpectralForm::None`].
    pub fn mnemonic(&self) -> &'static str {
        match self {
            SpectralForm::None => "",
            SpectralForm::LargestMagnitude => "lm",
            SpectralForm::SmallestMagnitude => "sm",
            SpectralForm::LargestAlgebraic => "la",
            SpectralForm::SmallestAlgebraic => "sa",
            SpectralForm::LargestReal => "lr",
            SpectralForm::SmallestReal => "sr",
            SpectralForm::LargestImaginary => "li",
            SpectralForm::SmallestImaginary => "si",
        }
    }

    /// Forms accepted for symmetric/Hermitian problems.
    pub fn is_symmetric_form(&self) -> bool {
        matches!(
            self,
            SpectralForm::LargestMagnitude
                | SpectralForm::SmallestMagnitude
                | SpectralForm::LargestAlgebraic
                | SpectralForm::SmallestAlgebraic
        )
    }

    /// Forms accepted for general problems.
    pub fn is_general_form(&self) -> bool {
        *self != SpectralForm::None
    }
}

impl From<&str> for SpectralForm {
    fn from(text: &str) -> Self {
        SpectralForm::from_mnemonic(Some(text))
    }
}

impl fmt::Display for SpectralForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectralForm::None => write!(f, "none"),
            other => write!(f, "{}", other.mnemonic()),
        }
    }
}
