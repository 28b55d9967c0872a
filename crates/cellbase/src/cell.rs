//! Cell address model: one storage cell as a (row, column, value) triple.
//!
//! Backends name the three parts differently (`col_idx` on the local workbook,
//! `col` on the remote service). A per-backend [`CellAccessors`] table carries
//! those names so the table engine can address cells uniformly through
//! [`CellField`] while payloads and name-based access still speak the backend's
//! vocabulary.

use crate::error::{IoError, TableError};
use crate::style::{CellStyle, NumberFormat, NumberFormatType, StyleValue};
use cellbase_common::{CellCoord, CellValue};
use serde_json::{Map, Value as JsonValue, json};

/// Attribute names a backend uses for the three parts of a cell.
#[derive(Debug, PartialEq, Eq)]
pub struct CellAccessors {
    pub backend: &'static str,
    pub value: &'static str,
    pub row: &'static str,
    pub column: &'static str,
}

impl CellAccessors {
    /// Resolve a backend attribute name to the field it addresses.
    pub fn field(&self, name: &str) -> Option<CellField> {
        if name == self.value {
            Some(CellField::Value)
        } else if name == self.row {
            Some(CellField::Row)
        } else if name == self.column {
            Some(CellField::Column)
        } else {
            None
        }
    }

    pub fn name(&self, field: CellField) -> &'static str {
        match field {
            CellField::Value => self.value,
            CellField::Row => self.row,
            CellField::Column => self.column,
        }
    }
}

/// File-shaped workbook: `column` is the 1-based physical column index.
pub static LOCAL_ACCESSORS: CellAccessors = CellAccessors {
    backend: "local",
    value: "value",
    row: "row",
    column: "col_idx",
};

/// Remote spreadsheet service: `column` is the 1-based column number.
pub static REMOTE_ACCESSORS: CellAccessors = CellAccessors {
    backend: "remote",
    value: "value",
    row: "row",
    column: "col",
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellField {
    Value,
    Row,
    Column,
}

/// Value read from or written to a [`CellField`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Value(CellValue),
    Index(u32),
}

/// Attributes accepted by [`Cell::set_text_format`].
pub const TEXT_FORMAT_ATTRIBUTES: &[&str] = &[
    "bold",
    "italic",
    "strikethrough",
    "underline",
    "font_family",
    "font_size",
    "foreground_color",
];

/// Attributes accepted by [`Cell::set_text_rotation`].
pub const TEXT_ROTATION_ATTRIBUTES: &[&str] = &["angle", "vertical"];

const PAYLOAD_FORMAT: &str = "format";

#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    row: u32,
    column: u32,
    value: CellValue,
    style: CellStyle,
    accessors: &'static CellAccessors,
}

impl Cell {
    pub fn new(
        accessors: &'static CellAccessors,
        row: u32,
        column: u32,
        value: impl Into<CellValue>,
    ) -> Self {
        Self {
            row,
            column,
            value: value.into(),
            style: CellStyle::default(),
            accessors,
        }
    }

    /// An empty cell with no style, used to clear a grid position.
    pub fn blank(accessors: &'static CellAccessors, row: u32, column: u32) -> Self {
        Self::new(accessors, row, column, CellValue::Empty)
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn coord(&self) -> CellCoord {
        CellCoord {
            row: self.row,
            col: self.column,
        }
    }

    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<CellValue>) {
        self.value = value.into();
    }

    pub fn style(&self) -> &CellStyle {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut CellStyle {
        &mut self.style
    }

    pub fn accessors(&self) -> &'static CellAccessors {
        self.accessors
    }

    /// Position changes belong to the table engine; callers only see them through
    /// compaction.
    pub(crate) fn set_row(&mut self, row: u32) {
        self.row = row;
    }

    pub(crate) fn with_style(mut self, style: CellStyle) -> Self {
        self.style = style;
        self
    }

    pub fn get(&self, field: CellField) -> FieldValue {
        match field {
            CellField::Value => FieldValue::Value(self.value.clone()),
            CellField::Row => FieldValue::Index(self.row),
            CellField::Column => FieldValue::Index(self.column),
        }
    }

    /// Assign a field. Only the value is writable; the position of a cell is fixed
    /// by the row index it belongs to.
    pub fn set(&mut self, field: CellField, value: FieldValue) -> Result<(), TableError> {
        match (field, value) {
            (CellField::Value, FieldValue::Value(v)) => {
                self.value = v;
                Ok(())
            }
            (CellField::Value, FieldValue::Index(i)) => {
                self.value = CellValue::from(i);
                Ok(())
            }
            (CellField::Row | CellField::Column, _) => Err(TableError::InvalidCellAttribute {
                attribute: self.accessors.name(field).to_string(),
                message: "cell position is managed by the table".to_string(),
            }),
        }
    }

    /// Read a field by its backend attribute name.
    pub fn attr(&self, name: &str) -> Result<FieldValue, TableError> {
        let field = self.field(name)?;
        Ok(self.get(field))
    }

    /// Write a field by its backend attribute name.
    pub fn set_attr(&mut self, name: &str, value: FieldValue) -> Result<(), TableError> {
        let field = self.field(name)?;
        self.set(field, value)
    }

    fn field(&self, name: &str) -> Result<CellField, TableError> {
        self.accessors
            .field(name)
            .ok_or_else(|| TableError::UnknownCellAttribute {
                attribute: name.to_string(),
                backend: self.accessors.backend,
            })
    }

    pub fn set_text_format(&mut self, attribute: &str, value: StyleValue) -> Result<(), TableError> {
        if !TEXT_FORMAT_ATTRIBUTES.contains(&attribute) {
            return Err(TableError::InvalidFormatValue {
                attribute: "set_text_format".to_string(),
                message: format!("unknown text format attribute '{attribute}'"),
            });
        }
        self.style.set(format!("text_format.{attribute}"), value);
        Ok(())
    }

    pub fn set_number_format(&mut self, kind: NumberFormatType, pattern: impl Into<String>) {
        self.style.set(
            "number_format",
            StyleValue::NumberFormat(NumberFormat {
                kind,
                pattern: pattern.into(),
            }),
        );
    }

    pub fn set_text_rotation(&mut self, attribute: &str, value: i64) -> Result<(), TableError> {
        check_text_rotation(attribute, value)?;
        self.style.remove("text_rotation.angle");
        self.style.remove("text_rotation.vertical");
        self.style
            .set(format!("text_rotation.{attribute}"), StyleValue::Int(value));
        Ok(())
    }

    /// Serialize for a batched remote write, keyed by this cell's accessor names.
    pub fn to_payload(&self) -> Result<JsonValue, IoError> {
        let mut map = Map::new();
        map.insert(self.accessors.row.to_string(), json!(self.row));
        map.insert(self.accessors.column.to_string(), json!(self.column));
        map.insert(
            self.accessors.value.to_string(),
            serde_json::to_value(&self.value)?,
        );
        if !self.style.is_empty() {
            map.insert(PAYLOAD_FORMAT.to_string(), serde_json::to_value(&self.style)?);
        }
        Ok(JsonValue::Object(map))
    }

    pub fn from_payload(
        accessors: &'static CellAccessors,
        payload: &JsonValue,
    ) -> Result<Self, IoError> {
        let obj = payload
            .as_object()
            .ok_or_else(|| IoError::Payload(format!("expected an object, got {payload}")))?;
        let index = |name: &str| -> Result<u32, IoError> {
            obj.get(name)
                .and_then(JsonValue::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
                .ok_or_else(|| IoError::Payload(format!("missing or invalid '{name}'")))
        };
        let row = index(accessors.row)?;
        let column = index(accessors.column)?;
        let value = match obj.get(accessors.value) {
            Some(v) => serde_json::from_value(v.clone())?,
            None => CellValue::Empty,
        };
        let style = match obj.get(PAYLOAD_FORMAT) {
            Some(v) => serde_json::from_value(v.clone())?,
            None => CellStyle::default(),
        };
        Ok(Cell::new(accessors, row, column, value).with_style(style))
    }
}

/// Validates a `set_text_rotation` call: `angle` within -90..=90, or `vertical`.
pub(crate) fn check_text_rotation(attribute: &str, value: i64) -> Result<(), TableError> {
    match attribute {
        "angle" if (-90..=90).contains(&value) => Ok(()),
        "vertical" => Ok(()),
        "angle" => Err(TableError::InvalidFormatValue {
            attribute: "set_text_rotation".to_string(),
            message: format!("angle {value} outside -90..=90"),
        }),
        other => Err(TableError::InvalidFormatValue {
            attribute: "set_text_rotation".to_string(),
            message: format!(
                "unknown rotation attribute '{other}', expecting one of {TEXT_ROTATION_ATTRIBUTES:?}"
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessor_names_differ_per_backend() {
        let local = Cell::new(&LOCAL_ACCESSORS, 3, 2, "x");
        let remote = Cell::new(&REMOTE_ACCESSORS, 3, 2, "x");

        assert_eq!(local.attr("col_idx").unwrap(), FieldValue::Index(2));
        assert_eq!(remote.attr("col").unwrap(), FieldValue::Index(2));
        assert!(matches!(
            local.attr("col"),
            Err(TableError::UnknownCellAttribute { backend: "local", .. })
        ));
        assert_eq!(local.get(CellField::Row), remote.get(CellField::Row));
    }

    #[test]
    fn only_value_is_writable() {
        let mut cell = Cell::new(&REMOTE_ACCESSORS, 2, 1, 5);
        cell.set_attr("value", FieldValue::Value("y".into())).unwrap();
        assert_eq!(cell.value(), &CellValue::Text("y".into()));
        assert!(cell.set(CellField::Row, FieldValue::Index(9)).is_err());
        assert_eq!(cell.row(), 2);
    }

    #[test]
    fn payload_uses_remote_names() {
        let mut cell = Cell::new(&REMOTE_ACCESSORS, 4, 3, 1.5);
        cell.set_number_format(NumberFormatType::Number, "0.00");
        let payload = cell.to_payload().unwrap();
        assert_eq!(payload["col"], 3);
        assert_eq!(payload["row"], 4);
        assert!(payload.get("format").is_some());

        let back = Cell::from_payload(&REMOTE_ACCESSORS, &payload).unwrap();
        assert_eq!(back, cell);
    }

    #[test]
    fn payload_rejects_zero_row() {
        let payload = json!({"row": 0, "col": 1});
        assert!(matches!(
            Cell::from_payload(&REMOTE_ACCESSORS, &payload),
            Err(IoError::Payload(_))
        ));
    }

    #[test]
    fn method_style_setters_validate() {
        let mut cell = Cell::blank(&REMOTE_ACCESSORS, 2, 1);
        cell.set_text_format("bold", true.into()).unwrap();
        assert_eq!(
            cell.style().get("text_format.bold"),
            Some(&StyleValue::Bool(true))
        );
        assert!(cell.set_text_format("blink", true.into()).is_err());

        cell.set_text_rotation("angle", 45).unwrap();
        cell.set_text_rotation("vertical", 1).unwrap();
        assert!(cell.style().get("text_rotation.angle").is_none());
        assert!(cell.set_text_rotation("angle", 120).is_err());
        assert!(cell.set_text_rotation("spin", 1).is_err());
    }
}
