// Shared table builders for the integration tests.
#![allow(dead_code)]

use cellbase::{
    CellValue, LocalSheet, LocalWorkbook, MemorySpreadsheet, MemoryWorksheet, ROW_IDX,
    RemoteSheet, RemoteSpreadsheet, RemoteWorksheet, Row, Table, WorkbookBackend,
};

pub const SHEET: &str = "people";

pub fn schema() -> Vec<String> {
    vec!["id".to_string(), "name".to_string()]
}

pub fn record<const N: usize>(pairs: [(&str, CellValue); N]) -> Row {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// `{id, name: "p<id>"}`
pub fn person(id: i64) -> Row {
    record([("id", id.into()), ("name", format!("p{id}").into())])
}

pub fn local_table() -> (LocalWorkbook, Table<LocalSheet>) {
    let mut book = LocalWorkbook::new();
    let sheet = book.create_sheet(SHEET, &schema()).unwrap();
    let table = Table::open(sheet).unwrap();
    (book, table)
}

pub fn remote_table(book: &mut MemorySpreadsheet) -> Table<RemoteSheet<MemoryWorksheet>> {
    let mut ws = book.add_worksheet(SHEET, 0).unwrap();
    ws.update_row(1, vec!["id".into(), "name".into()]).unwrap();
    book.reset_calls();
    Table::deferred(RemoteSheet::new(ws))
}

pub fn ids(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}

pub fn row_indices(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .map(|r| r[ROW_IDX].as_i64().unwrap())
        .collect()
}
