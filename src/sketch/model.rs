use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ERASER_WIDTH_FACTOR: f32 = 1.4;
/// `rgba(255, 255, 255, 0.9)`: eraser dots remove 90% of destination alpha.
pub const ERASER_FILL: Color = Color::rgba(255, 255, 255, 230);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Pencil,
    Eraser,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::Pencil, Tool::Eraser];

    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Pencil => "pencil",
            Tool::Eraser => "eraser",
        }
    }

    pub fn composite_mode(self) -> CompositeMode {
        match self {
            Tool::Pencil => CompositeMode::SourceOver,
            Tool::Eraser => CompositeMode::DestinationOut,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pencil" => Ok(Tool::Pencil),
            "eraser" => Ok(Tool::Eraser),
            other => Err(anyhow!("unknown tool '{other}'")),
        }
    }
}

/// Pixel blending rule used when drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    #[default]
    SourceOver,
    DestinationOut,
}

/// Where the active stroke originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeSource {
    Canvas,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Parses `#rrggbb` or `#rgb`, case-insensitive.
    pub fn from_hex(value: &str) -> Result<Self> {
        let digits = value.trim().trim_start_matches('#');
        let expanded = match digits.len() {
            6 => digits.to_string(),
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            _ => bail!("color '{value}' is not a #rrggbb or #rgb hex string"),
        };
        let bytes =
            hex::decode(&expanded).map_err(|err| anyhow!("color '{value}' is not hex: {err}"))?;
        Ok(Self::rgb(bytes[0], bytes[1], bytes[2]))
    }

    /// Uppercase `#RRGGBB`; alpha is not represented.
    pub fn to_hex(self) -> String {
        format!("#{}", hex::encode_upper([self.r, self.g, self.b]))
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Color::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Live tool state written by UI inputs and read on every redraw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolConfig {
    pub tool: Tool,
    pub stroke_color: Color,
    pub stroke_size: f32,
    pub eraser_width_factor: f32,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            tool: Tool::Pencil,
            stroke_color: Color::rgb(0x15, 0x15, 0x15),
            stroke_size: 10.0,
            eraser_width_factor: ERASER_WIDTH_FACTOR,
        }
    }
}

impl ToolConfig {
    pub fn set_size(&mut self, size: f32) -> Result<()> {
        if !size.is_finite() || size <= 0.0 {
            bail!("stroke size must be a positive number, got {size}");
        }
        self.stroke_size = size;
        Ok(())
    }

    /// Eraser strokes are widened so the destructive edge matches pencil weight.
    pub fn effective_width(&self) -> f32 {
        match self.tool {
            Tool::Eraser => self.stroke_size * self.eraser_width_factor,
            Tool::Pencil => self.stroke_size,
        }
    }

    pub fn fill_color(&self) -> Color {
        match self.tool {
            Tool::Eraser => ERASER_FILL,
            Tool::Pencil => self.stroke_color,
        }
    }
}
