//! Style values that formatters write onto cells.
//!
//! The local workbook style vocabulary (fonts, fills, borders, alignment,
//! protection) and the remote sheet vocabulary (background colour, alignment
//! enums, wrap strategy, number formats) share one [`StyleValue`] so a cell can
//! hold either in its [`CellStyle`] bag.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// RGBA colour with channels in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Color {
    pub const fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 1.0,
        }
    }

    /// Parse `RRGGBB` or `AARRGGBB` hex notation.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let (alpha, rgb) = match hex.len() {
            6 => ("FF", hex),
            8 => hex.split_at(2),
            _ => return None,
        };
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        Some(Self {
            alpha: channel(alpha)?,
            red: channel(rgb.get(0..2)?)?,
            green: channel(rgb.get(2..4)?)?,
            blue: channel(rgb.get(4..6)?)?,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Font {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    /// Hex colour, `AARRGGBB`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub fill_type: String,
    pub fg_color: String,
}

impl Fill {
    pub fn solid(fg_color: impl Into<String>) -> Self {
        Self {
            fill_type: "solid".to_string(),
            fg_color: fg_color.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BorderSide {
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Border {
    pub left: Option<BorderSide>,
    pub right: Option<BorderSide>,
    pub top: Option<BorderSide>,
    pub bottom: Option<BorderSide>,
}

impl Border {
    pub fn all(style: impl Into<String>) -> Self {
        let side = BorderSide {
            style: style.into(),
            color: None,
        };
        Self {
            left: Some(side.clone()),
            right: Some(side.clone()),
            top: Some(side.clone()),
            bottom: Some(side),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    #[serde(default)]
    pub wrap_text: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            locked: true,
            hidden: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerticalAlignment {
    Top,
    Middle,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WrapStrategy {
    OverflowCell,
    LegacyWrap,
    Clip,
    Wrap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NumberFormatType {
    Text,
    Number,
    Percent,
    Currency,
    Date,
    Time,
    DateTime,
    Scientific,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub kind: NumberFormatType,
    pub pattern: String,
}

/// One style attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum StyleValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
    Color(Color),
    Font(Font),
    Fill(Fill),
    Border(Border),
    Alignment(Alignment),
    Protection(Protection),
    HorizontalAlignment(HorizontalAlignment),
    VerticalAlignment(VerticalAlignment),
    WrapStrategy(WrapStrategy),
    NumberFormatType(NumberFormatType),
    NumberFormat(NumberFormat),
}

impl StyleValue {
    /// Name of the variant, used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            StyleValue::Bool(_) => "bool",
            StyleValue::Int(_) => "int",
            StyleValue::Number(_) => "number",
            StyleValue::Text(_) => "text",
            StyleValue::Color(_) => "color",
            StyleValue::Font(_) => "font",
            StyleValue::Fill(_) => "fill",
            StyleValue::Border(_) => "border",
            StyleValue::Alignment(_) => "alignment",
            StyleValue::Protection(_) => "protection",
            StyleValue::HorizontalAlignment(_) => "horizontal alignment",
            StyleValue::VerticalAlignment(_) => "vertical alignment",
            StyleValue::WrapStrategy(_) => "wrap strategy",
            StyleValue::NumberFormatType(_) => "number format type",
            StyleValue::NumberFormat(_) => "number format",
        }
    }
}

macro_rules! style_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for StyleValue {
                fn from(value: $ty) -> Self {
                    StyleValue::$variant(value)
                }
            }
        )*
    };
}

style_value_from! {
    bool => Bool,
    i64 => Int,
    f64 => Number,
    String => Text,
    Color => Color,
    Font => Font,
    Fill => Fill,
    Border => Border,
    Alignment => Alignment,
    Protection => Protection,
    HorizontalAlignment => HorizontalAlignment,
    VerticalAlignment => VerticalAlignment,
    WrapStrategy => WrapStrategy,
    NumberFormatType => NumberFormatType,
    NumberFormat => NumberFormat,
}

impl<'a> From<&'a str> for StyleValue {
    fn from(value: &'a str) -> Self {
        StyleValue::Text(value.to_string())
    }
}

/// Named style attributes attached to a cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellStyle(BTreeMap<String, StyleValue>);

impl CellStyle {
    pub fn get(&self, attribute: &str) -> Option<&StyleValue> {
        self.0.get(attribute)
    }

    pub fn set(&mut self, attribute: impl Into<String>, value: StyleValue) {
        self.0.insert(attribute.into(), value);
    }

    pub fn remove(&mut self, attribute: &str) -> Option<StyleValue> {
        self.0.remove(attribute)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        let yellow = Color::from_hex("00FFFF00").unwrap();
        assert_eq!(yellow.alpha, 0.0);
        assert_eq!(yellow.red, 1.0);
        assert_eq!(yellow.blue, 0.0);
        assert_eq!(Color::from_hex("#0000FF").unwrap(), Color::rgb(0.0, 0.0, 1.0));
        assert!(Color::from_hex("FFF").is_none());
        assert!(Color::from_hex("GG0000").is_none());
    }

    #[test]
    fn style_bag_serializes_as_map() {
        let mut style = CellStyle::default();
        style.set("fill", Fill::solid("00FFFF00").into());
        let json = serde_json::to_value(&style).unwrap();
        assert_eq!(json["fill"]["type"], "Fill");
        assert_eq!(json["fill"]["value"]["fg_color"], "00FFFF00");
    }
}
