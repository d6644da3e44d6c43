//! Core value types shared by LF View resources and OMF

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 3D vector or point
pub type Vector3 = [f64; 3];

/// Named colors accepted wherever a color string is expected
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("r", [255, 0, 0]),
    ("g", [0, 255, 0]),
    ("b", [0, 0, 255]),
    ("c", [0, 255, 255]),
    ("m", [255, 0, 255]),
    ("y", [255, 255, 0]),
    ("k", [0, 0, 0]),
    ("w", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("yellow", [255, 255, 0]),
    ("orange", [255, 165, 0]),
    ("brown", [165, 42, 42]),
    ("purple", [128, 0, 128]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("pink", [255, 192, 203]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("navy", [0, 0, 128]),
    ("olive", [128, 128, 0]),
    ("teal", [0, 128, 128]),
    ("maroon", [128, 0, 0]),
    ("silver", [192, 192, 192]),
    ("gold", [255, 215, 0]),
];

/// Display color of an element, data value or legend entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "String")]
pub enum Color {
    /// Explicit RGB triple
    Rgb([u8; 3]),
    /// Let the web viewer choose
    Random,
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb([r, g, b])
    }

    /// RGB triple, or `None` for `Random`
    pub fn as_rgb(&self) -> Option<[u8; 3]> {
        match self {
            Color::Rgb(rgb) => Some(*rgb),
            Color::Random => None,
        }
    }

    /// Hex string such as `#FF0000`, or `random`
    pub fn to_hex(&self) -> String {
        match self {
            Color::Rgb([r, g, b]) => format!("#{:02X}{:02X}{:02X}", r, g, b),
            Color::Random => "random".to_string(),
        }
    }
}

impl FromStr for Color {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("random") {
            return Ok(Color::Random);
        }
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex)
                .map(Color::Rgb)
                .ok_or_else(|| ClientError::Validation(format!("Invalid hex color: {}", s)));
        }
        let lower = value.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, rgb)| Color::Rgb(*rgb))
            .ok_or_else(|| ClientError::Validation(format!("Unknown color: {}", s)))
    }
}

fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some([
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        ]),
        3 => {
            let mut rgb = [0u8; 3];
            for (slot, ch) in rgb.iter_mut().zip(hex.chars()) {
                let digit = ch.to_digit(16)? as u8;
                *slot = digit * 16 + digit;
            }
            Some(rgb)
        }
        _ => None,
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl From<[u8; 3]> for Color {
    fn from(rgb: [u8; 3]) -> Self {
        Color::Rgb(rgb)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Text(String),
    Rgb([u8; 3]),
}

impl TryFrom<ColorRepr> for Color {
    type Error = ClientError;

    fn try_from(repr: ColorRepr) -> Result<Self> {
        match repr {
            ColorRepr::Text(text) => text.parse(),
            ColorRepr::Rgb(rgb) => Ok(Color::Rgb(rgb)),
        }
    }
}

/// Where data values live on an element's geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataLocation {
    #[serde(alias = "n", alias = "N", alias = "vertices")]
    Nodes,
    #[serde(alias = "c", alias = "CC", alias = "segments", alias = "faces")]
    Cells,
}

impl DataLocation {
    /// Parse an OMF data location
    pub fn from_omf(location: &str) -> Result<Self> {
        match location {
            "vertices" => Ok(DataLocation::Nodes),
            "segments" | "faces" | "cells" => Ok(DataLocation::Cells),
            other => Err(ClientError::InvalidFormat(format!(
                "Unknown OMF data location: {}",
                other
            ))),
        }
    }
}

impl FromStr for DataLocation {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nodes" | "n" | "N" => Ok(DataLocation::Nodes),
            "cells" | "c" | "CC" => Ok(DataLocation::Cells),
            other => DataLocation::from_omf(other)
                .map_err(|_| ClientError::Validation(format!("Unknown data location: {}", other))),
        }
    }
}

/// Element types of binary arrays understood by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrayDtype {
    Int8Array,
    Uint8Array,
    Int16Array,
    Uint16Array,
    Int32Array,
    Uint32Array,
    Float32Array,
    Float64Array,
}

impl ArrayDtype {
    /// Size in bytes of one array element
    pub fn size_in_bytes(&self) -> usize {
        match self {
            ArrayDtype::Int8Array | ArrayDtype::Uint8Array => 1,
            ArrayDtype::Int16Array | ArrayDtype::Uint16Array => 2,
            ArrayDtype::Int32Array | ArrayDtype::Uint32Array | ArrayDtype::Float32Array => 4,
            ArrayDtype::Float64Array => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ArrayDtype::Float32Array | ArrayDtype::Float64Array)
    }

    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }
}

impl fmt::Display for ArrayDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
