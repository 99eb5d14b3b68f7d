// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Garment categories and the default landmark vocabulary.
//!
//! Each annotated image belongs to exactly one [`Category`]. The category decides which
//! landmarks of the shared vocabulary are meaningful for the sample (a skirt has no
//! shoulders), see [`crate::config::LabelConfig::landmarks_for`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Garment category of an annotated sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Upper-body garment without a waistline.
    Blouse,
    /// Jackets and coats.
    Outwear,
    /// Full-body garment.
    Dress,
    /// Lower-body garment without a crotch.
    Skirt,
    /// Lower-body garment with legs.
    Trousers,
}

impl Category {
    /// All categories, in table order.
    pub const ALL: [Self; 5] = [
        Self::Blouse,
        Self::Outwear,
        Self::Dress,
        Self::Skirt,
        Self::Trousers,
    ];

    /// Returns the string representation used in annotation files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Blouse => "blouse",
            Self::Outwear => "outwear",
            Self::Dress => "dress",
            Self::Skirt => "skirt",
            Self::Trousers => "trousers",
        }
    }

    /// Position of the category in [`Category::ALL`].
    #[must_use]
    pub const fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blouse" => Ok(Self::Blouse),
            "outwear" | "outerwear" => Ok(Self::Outwear),
            "dress" => Ok(Self::Dress),
            "skirt" => Ok(Self::Skirt),
            "trousers" | "pants" => Ok(Self::Trousers),
            _ => Err(CategoryParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid category string.
#[derive(Debug, Clone)]
pub struct CategoryParseError(String);

impl fmt::Display for CategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid category '{}', expected one of: blouse, outwear, dress, skirt, trousers",
            self.0
        )
    }
}

impl std::error::Error for CategoryParseError {}

impl From<CategoryParseError> for crate::error::TargetError {
    fn from(err: CategoryParseError) -> Self {
        Self::UnknownCategory(err.0)
    }
}

/// Names of the 24 landmarks in the default apparel vocabulary, in channel order.
pub const LANDMARK_NAMES: [&str; 24] = [
    "neckline_left",
    "neckline_right",
    "center_front",
    "shoulder_left",
    "shoulder_right",
    "armpit_left",
    "armpit_right",
    "waistline_left",
    "waistline_right",
    "cuff_left_in",
    "cuff_left_out",
    "cuff_right_in",
    "cuff_right_out",
    "top_hem_left",
    "top_hem_right",
    "waistband_left",
    "waistband_right",
    "hemline_left",
    "hemline_right",
    "crotch",
    "bottom_left_in",
    "bottom_left_out",
    "bottom_right_in",
    "bottom_right_out",
];
