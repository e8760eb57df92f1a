use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Style labels the classifier can assign to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Style {
    Chic,
    Goth,
    Kawaii,
    Vintage,
    Punk,
    AvanteGarde,
    Grunge,
    Emo,
}

impl Style {
    pub const COUNT: usize = 8;

    /// Every style, in the order the classifier scores them.
    pub const ALL: [Style; Style::COUNT] = [
        Style::Chic,
        Style::Goth,
        Style::Kawaii,
        Style::Vintage,
        Style::Punk,
        Style::AvanteGarde,
        Style::Grunge,
        Style::Emo,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Style::Chic => "chic style",
            Style::Goth => "goth style",
            Style::Kawaii => "kawaii style",
            Style::Vintage => "vintage style",
            Style::Punk => "punk style",
            // spelling matches the classifier's prompt list
            Style::AvanteGarde => "avante-garde style",
            Style::Grunge => "grunge style",
            Style::Emo => "emo style",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Style::Chic => "#FF6B6B",
            Style::Goth => "#4ECDC4",
            Style::Kawaii => "#45B7D1",
            Style::Vintage => "#96CEB4",
            Style::Punk => "#FF4081",
            Style::AvanteGarde => "#7C4DFF",
            Style::Grunge => "#795548",
            Style::Emo => "#424242",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Style {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Style::ALL
            .into_iter()
            .find(|style| style.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownStyle(wanted.to_owned()))
    }
}

impl Serialize for Style {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Style {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}
