//! Cell formatters: a fixed, backend-specific set of style attributes applied
//! to every cell a `format` call touches.

use crate::cell::{Cell, TEXT_FORMAT_ATTRIBUTES, check_text_rotation};
use crate::error::TableError;
use crate::style::{
    Alignment, Border, Color, Fill, Font, HorizontalAlignment, NumberFormatType, Protection,
    StyleValue, VerticalAlignment, WrapStrategy,
};

/// Argument assigned to a formatter attribute.
///
/// Plain attributes take a [`FormatArg::Value`]; method-style attributes take the
/// ordered argument pair of the cell setter they invoke.
#[derive(Clone, Debug, PartialEq)]
pub enum FormatArg {
    Value(StyleValue),
    Call(StyleValue, StyleValue),
}

impl FormatArg {
    pub fn value(value: impl Into<StyleValue>) -> Self {
        FormatArg::Value(value.into())
    }

    pub fn call(first: impl Into<StyleValue>, second: impl Into<StyleValue>) -> Self {
        FormatArg::Call(first.into(), second.into())
    }
}

pub trait CellFormatter: Default {
    /// Every attribute name this formatter accepts.
    fn attributes() -> &'static [&'static str];

    /// Set one attribute by name. Unknown names and mistyped values are rejected.
    fn assign(&mut self, attribute: &str, value: FormatArg) -> Result<(), TableError>;

    /// Attributes currently holding a non-empty value.
    fn active(&self) -> Vec<&'static str>;

    fn len(&self) -> usize {
        self.active().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every active attribute onto `cell`.
    fn apply(&self, cell: &mut Cell) -> Result<(), TableError>;

    fn try_from_attributes<I, K>(attributes: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (K, FormatArg)>,
        K: AsRef<str>,
    {
        let mut formatter = Self::default();
        for (name, value) in attributes {
            formatter.assign(name.as_ref(), value)?;
        }
        Ok(formatter)
    }
}

/// Formatter argument as passed to `format`: a ready formatter or attribute pairs
/// validated into one before any cell is touched.
#[derive(Clone, Debug)]
pub enum FormatRequest<F> {
    Formatter(F),
    Attributes(Vec<(String, FormatArg)>),
}

impl<F: CellFormatter> FormatRequest<F> {
    pub fn attributes<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, FormatArg)>,
        K: Into<String>,
    {
        FormatRequest::Attributes(
            attributes
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    pub fn into_formatter(self) -> Result<F, TableError> {
        match self {
            FormatRequest::Formatter(formatter) => Ok(formatter),
            FormatRequest::Attributes(attributes) => F::try_from_attributes(attributes),
        }
    }
}

impl From<LocalFormatter> for FormatRequest<LocalFormatter> {
    fn from(formatter: LocalFormatter) -> Self {
        FormatRequest::Formatter(formatter)
    }
}

impl From<RemoteFormatter> for FormatRequest<RemoteFormatter> {
    fn from(formatter: RemoteFormatter) -> Self {
        FormatRequest::Formatter(formatter)
    }
}

fn unknown(attribute: &str, expected: &'static [&'static str]) -> TableError {
    TableError::UnknownFormatAttribute {
        attribute: attribute.to_string(),
        expected,
    }
}

fn mistyped(attribute: &str, expected: &str, got: &FormatArg) -> TableError {
    let got = match got {
        FormatArg::Value(v) => v.kind().to_string(),
        FormatArg::Call(a, b) => format!("({}, {})", a.kind(), b.kind()),
    };
    TableError::InvalidFormatValue {
        attribute: attribute.to_string(),
        message: format!("expected {expected}, got {got}"),
    }
}

fn non_blank(s: &Option<String>) -> bool {
    s.as_deref().is_some_and(|s| !s.is_empty())
}

/// Styles for the local file-shaped workbook.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalFormatter {
    pub font: Option<Font>,
    pub fill: Option<Fill>,
    pub border: Option<Border>,
    /// Number format code, e.g. `0.00`.
    pub number_format: Option<String>,
    pub protection: Option<Protection>,
    pub alignment: Option<Alignment>,
    /// Named style.
    pub style: Option<String>,
}

impl LocalFormatter {
    pub const ATTRIBUTES: &'static [&'static str] = &[
        "font",
        "fill",
        "border",
        "number_format",
        "protection",
        "alignment",
        "style",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    fn value_of(&self, attribute: &str) -> Option<StyleValue> {
        match attribute {
            "font" => self.font.clone().map(StyleValue::Font),
            "fill" => self.fill.clone().map(StyleValue::Fill),
            "border" => self.border.clone().map(StyleValue::Border),
            "number_format" => self.number_format.clone().map(StyleValue::Text),
            "protection" => self.protection.map(StyleValue::Protection),
            "alignment" => self.alignment.clone().map(StyleValue::Alignment),
            "style" => self.style.clone().map(StyleValue::Text),
            _ => None,
        }
    }
}

impl CellFormatter for LocalFormatter {
    fn attributes() -> &'static [&'static str] {
        Self::ATTRIBUTES
    }

    fn assign(&mut self, attribute: &str, value: FormatArg) -> Result<(), TableError> {
        if !Self::ATTRIBUTES.contains(&attribute) {
            return Err(unknown(attribute, Self::ATTRIBUTES));
        }
        match (attribute, value) {
            ("font", FormatArg::Value(StyleValue::Font(v))) => self.font = Some(v),
            ("fill", FormatArg::Value(StyleValue::Fill(v))) => self.fill = Some(v),
            ("border", FormatArg::Value(StyleValue::Border(v))) => self.border = Some(v),
            ("number_format", FormatArg::Value(StyleValue::Text(v))) => {
                self.number_format = Some(v)
            }
            ("protection", FormatArg::Value(StyleValue::Protection(v))) => {
                self.protection = Some(v)
            }
            ("alignment", FormatArg::Value(StyleValue::Alignment(v))) => self.alignment = Some(v),
            ("style", FormatArg::Value(StyleValue::Text(v))) => self.style = Some(v),
            (attribute, other) => {
                let expected = match attribute {
                    "number_format" | "style" => "text",
                    name => name,
                };
                return Err(mistyped(attribute, expected, &other));
            }
        }
        Ok(())
    }

    fn active(&self) -> Vec<&'static str> {
        let mut active = Vec::new();
        if self.font.is_some() {
            active.push("font");
        }
        if self.fill.is_some() {
            active.push("fill");
        }
        if self.border.is_some() {
            active.push("border");
        }
        if non_blank(&self.number_format) {
            active.push("number_format");
        }
        if self.protection.is_some() {
            active.push("protection");
        }
        if self.alignment.is_some() {
            active.push("alignment");
        }
        if non_blank(&self.style) {
            active.push("style");
        }
        active
    }

    fn apply(&self, cell: &mut Cell) -> Result<(), TableError> {
        for attribute in self.active() {
            if let Some(value) = self.value_of(attribute) {
                cell.style_mut().set(attribute, value);
            }
        }
        Ok(())
    }
}

/// Styles for the remote spreadsheet service.
///
/// `text_format`, `number_format` and `text_rotation` are method-style: applying
/// them calls [`Cell::set_text_format`], [`Cell::set_number_format`] and
/// [`Cell::set_text_rotation`] with the stored arguments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemoteFormatter {
    pub color: Option<Color>,
    pub horizontal_alignment: Option<HorizontalAlignment>,
    pub vertical_alignment: Option<VerticalAlignment>,
    pub wrap_strategy: Option<WrapStrategy>,
    pub note: Option<String>,
    pub text_format: Option<(String, StyleValue)>,
    pub number_format: Option<(NumberFormatType, String)>,
    pub text_rotation: Option<(String, i64)>,
}

impl RemoteFormatter {
    pub const ATTRIBUTES: &'static [&'static str] = &[
        "color",
        "horizontal_alignment",
        "vertical_alignment",
        "wrap_strategy",
        "note",
        "set_text_format",
        "set_number_format",
        "set_text_rotation",
    ];

    pub const METHODS: &'static [&'static str] =
        &["set_text_format", "set_number_format", "set_text_rotation"];

    pub fn new() -> Self {
        Self::default()
    }
}

impl CellFormatter for RemoteFormatter {
    fn attributes() -> &'static [&'static str] {
        Self::ATTRIBUTES
    }

    fn assign(&mut self, attribute: &str, value: FormatArg) -> Result<(), TableError> {
        use FormatArg::{Call, Value};
        use StyleValue as S;

        if !Self::ATTRIBUTES.contains(&attribute) {
            return Err(unknown(attribute, Self::ATTRIBUTES));
        }
        match (attribute, value) {
            ("color", Value(S::Color(v))) => self.color = Some(v),
            ("horizontal_alignment", Value(S::HorizontalAlignment(v))) => {
                self.horizontal_alignment = Some(v)
            }
            ("vertical_alignment", Value(S::VerticalAlignment(v))) => {
                self.vertical_alignment = Some(v)
            }
            ("wrap_strategy", Value(S::WrapStrategy(v))) => self.wrap_strategy = Some(v),
            ("note", Value(S::Text(v))) => self.note = Some(v),
            ("set_text_format", Call(S::Text(name), v)) => {
                if !TEXT_FORMAT_ATTRIBUTES.contains(&name.as_str()) {
                    return Err(TableError::InvalidFormatValue {
                        attribute: attribute.to_string(),
                        message: format!(
                            "unknown text format attribute '{name}', expecting one of {TEXT_FORMAT_ATTRIBUTES:?}"
                        ),
                    });
                }
                self.text_format = Some((name, v));
            }
            ("set_number_format", Call(S::NumberFormatType(kind), S::Text(pattern))) => {
                self.number_format = Some((kind, pattern))
            }
            ("set_text_rotation", Call(S::Text(name), S::Int(v))) => {
                check_text_rotation(&name, v)?;
                self.text_rotation = Some((name, v));
            }
            (attribute, other) => {
                let expected = match attribute {
                    "color" => "color",
                    "horizontal_alignment" => "horizontal alignment",
                    "vertical_alignment" => "vertical alignment",
                    "wrap_strategy" => "wrap strategy",
                    "note" => "text",
                    "set_text_format" => "(text, value)",
                    "set_number_format" => "(number format type, text)",
                    _ => "(text, int)",
                };
                return Err(mistyped(attribute, expected, &other));
            }
        }
        Ok(())
    }

    fn active(&self) -> Vec<&'static str> {
        let mut active = Vec::new();
        if self.color.is_some() {
            active.push("color");
        }
        if self.horizontal_alignment.is_some() {
            active.push("horizontal_alignment");
        }
        if self.vertical_alignment.is_some() {
            active.push("vertical_alignment");
        }
        if self.wrap_strategy.is_some() {
            active.push("wrap_strategy");
        }
        if non_blank(&self.note) {
            active.push("note");
        }
        if self.text_format.is_some() {
            active.push("set_text_format");
        }
        if self.number_format.is_some() {
            active.push("set_number_format");
        }
        if self.text_rotation.is_some() {
            active.push("set_text_rotation");
        }
        active
    }

    fn apply(&self, cell: &mut Cell) -> Result<(), TableError> {
        if let Some(color) = self.color {
            cell.style_mut().set("color", color.into());
        }
        if let Some(v) = self.horizontal_alignment {
            cell.style_mut().set("horizontal_alignment", v.into());
        }
        if let Some(v) = self.vertical_alignment {
            cell.style_mut().set("vertical_alignment", v.into());
        }
        if let Some(v) = self.wrap_strategy {
            cell.style_mut().set("wrap_strategy", v.into());
        }
        if let Some(note) = self.note.as_ref().filter(|n| !n.is_empty()) {
            cell.style_mut().set("note", note.clone().into());
        }
        if let Some((name, value)) = &self.text_format {
            cell.set_text_format(name, value.clone())?;
        }
        if let Some((kind, pattern)) = &self.number_format {
            cell.set_number_format(*kind, pattern.clone());
        }
        if let Some((name, value)) = &self.text_rotation {
            cell.set_text_rotation(name, *value)?;
        }
        Ok(())
    }
}
