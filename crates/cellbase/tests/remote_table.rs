mod common;

use cellbase::{
    CellValue, FormatArg, FormatRequest, MemorySpreadsheet, ROW_IDX, RemoteFormatter, RemoteSheet,
    RemoteSpreadsheet, RemoteWorksheet, Table, TableError, Where,
    style::{Color, NumberFormatType, StyleValue},
};
use common::{SHEET, ids, person, record, remote_table, row_indices};

#[test]
fn nothing_is_read_before_first_use() {
    let mut book = MemorySpreadsheet::new();
    let mut table = remote_table(&mut book);

    assert!(!table.is_fetched());
    assert_eq!(book.calls().total(), 0);

    assert!(table.query(None).unwrap().is_empty());
    assert!(table.is_fetched());
    table.query(None).unwrap();
    assert_eq!(book.calls().count("get_all_values"), 1);
}

#[test]
fn insert_reuses_slack_rows_with_one_write() {
    let mut book = MemorySpreadsheet::new();
    let mut table = remote_table(&mut book);

    let row = table
        .insert(&record([("id", 1.into()), ("name", "a".into())]))
        .unwrap();
    assert_eq!(row, 2);

    let calls = book.calls();
    assert_eq!(calls.count("update_cells"), 1);
    assert_eq!(calls.count("update_row"), 0);
    assert_eq!(calls.count("insert_rows"), 0);
    assert_eq!(calls.count("get_row"), 1);

    assert_eq!(
        table.query(None).unwrap(),
        vec![record([(ROW_IDX, 2.into()), ("id", 1.into()), ("name", "a".into())])]
    );
    assert_eq!(book.value(SHEET, 2, 2), Some(CellValue::from("a")));
}

#[test]
fn insert_into_slack_row_keeps_unrelated_columns() {
    let mut book = MemorySpreadsheet::new();
    let mut ws = book.add_worksheet("notes", 0).unwrap();
    ws.update_row(1, vec!["id".into(), CellValue::Empty, "name".into()])
        .unwrap();
    ws.update_row(2, vec![CellValue::Empty, "keep me".into()])
        .unwrap();
    book.reset_calls();
    let mut table = Table::deferred(RemoteSheet::new(ws));

    assert_eq!(table.insert(&person(7)).unwrap(), 2);
    assert_eq!(table.backend().worksheet().title(), "notes");
    assert_eq!(book.calls().count("update_cells"), 1);
    assert_eq!(book.value("notes", 2, 1), Some(CellValue::Int(7)));
    assert_eq!(book.value("notes", 2, 2), Some(CellValue::from("keep me")));
    assert_eq!(book.value("notes", 2, 3), Some(CellValue::from("p7")));
    assert_eq!(ids(&table.query(None).unwrap()), vec![7]);
}

#[test]
fn insert_grows_a_full_grid() {
    let mut book = MemorySpreadsheet::with_default_rows(1);
    let mut table = remote_table(&mut book);

    assert_eq!(table.insert(&person(0)).unwrap(), 2);
    assert_eq!(table.insert(&person(1)).unwrap(), 3);

    let calls = book.calls();
    assert_eq!(calls.count("insert_rows"), 2);
    assert_eq!(calls.count("update_row"), 0);
    assert_eq!(book.grid_size(SHEET), Some((3, 26)));
    assert_eq!(ids(&table.query(None).unwrap()), vec![0, 1]);
}

#[test]
fn delete_compacts_in_one_batch() {
    let mut book = MemorySpreadsheet::new();
    let mut table = remote_table(&mut book);
    for id in 0..5 {
        table.insert(&person(id)).unwrap();
    }
    book.reset_calls();

    assert_eq!(table.delete(Some(&Where::new().row(3))).unwrap(), 1);
    assert_eq!(book.calls().count("update_cells"), 1);
    assert_eq!(book.calls().total(), 1);

    let rows = table.query(None).unwrap();
    assert_eq!(row_indices(&rows), vec![2, 3, 4, 5]);
    assert_eq!(ids(&rows), vec![0, 2, 3, 4]);
    assert_eq!(book.value(SHEET, 3, 1), Some(CellValue::Int(2)));
    assert_eq!(book.value(SHEET, 6, 1), Some(CellValue::Empty));

    // a fresh table over the same worksheet sees the same rows
    let ws = book.worksheet(SHEET).unwrap();
    let mut fresh = Table::deferred(RemoteSheet::new(ws));
    assert_eq!(fresh.query(None).unwrap(), rows);
}

#[test]
fn scattered_delete_is_still_one_batch() {
    let mut book = MemorySpreadsheet::new();
    let mut table = remote_table(&mut book);
    for id in 0..8 {
        table.insert(&person(id)).unwrap();
    }
    book.reset_calls();

    let deleted = table
        .delete(Some(&Where::new().matching("id", |v| {
            v.as_i64().is_some_and(|i| i % 3 == 0)
        })))
        .unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(book.calls().count("update_cells"), 1);
    assert_eq!(ids(&table.query(None).unwrap()), vec![1, 2, 4, 5, 7]);
    assert!(table.index().unwrap().is_contiguous());
}

#[test]
fn traverse_sends_a_single_batch() {
    let mut book = MemorySpreadsheet::new();
    let mut table = remote_table(&mut book);
    for id in 0..5 {
        table.insert(&person(id)).unwrap();
    }
    book.reset_calls();

    let mut seen = 0;
    let rows = table
        .traverse(
            |cell| {
                seen += 1;
                let text = format!("#{}", cell.value());
                cell.set_value(text);
            },
            Some(&Where::new().row_matching(|r| (3..=5).contains(&r))),
            None,
        )
        .unwrap();

    assert_eq!(rows, 3);
    assert_eq!(seen, 6);
    assert_eq!(book.calls().count("update_cells"), 1);
    assert_eq!(book.calls().total(), 1);
    assert_eq!(book.value(SHEET, 4, 2), Some(CellValue::from("#p2")));
    assert_eq!(book.value(SHEET, 2, 2), Some(CellValue::from("p0")));
}

#[test]
fn empty_formatter_without_clause_does_nothing() {
    let mut book = MemorySpreadsheet::new();
    let mut table = remote_table(&mut book);
    table.insert(&person(0)).unwrap();
    book.reset_calls();

    assert_eq!(table.format(RemoteFormatter::new(), None, None).unwrap(), 0);
    assert_eq!(book.calls().total(), 0);
    assert!(book.cell(SHEET, 2, 1).unwrap().style().is_empty());
}

#[test]
fn format_invokes_method_style_setters() {
    let mut book = MemorySpreadsheet::new();
    let mut table = remote_table(&mut book);
    for id in 0..3 {
        table.insert(&person(id)).unwrap();
    }
    book.reset_calls();

    let formatter = RemoteFormatter {
        color: Some(Color::rgb(1.0, 1.0, 0.0)),
        text_format: Some(("bold".into(), StyleValue::Bool(true))),
        number_format: Some((NumberFormatType::Number, "0".into())),
        ..Default::default()
    };
    let n = table
        .format(formatter, Some(&Where::new().eq("id", 1)), Some(&["id"][..]))
        .unwrap();
    assert_eq!(n, 1);
    assert_eq!(book.calls().count("update_cells"), 1);

    let cell = book.cell(SHEET, 3, 1).unwrap();
    assert_eq!(
        cell.style().get("text_format.bold"),
        Some(&StyleValue::Bool(true))
    );
    assert!(cell.style().get("number_format").is_some());
    assert!(cell.style().get("color").is_some());
    assert!(book.cell(SHEET, 3, 2).unwrap().style().is_empty());
}

#[test]
fn bad_format_attributes_fail_before_any_write() {
    let mut book = MemorySpreadsheet::new();
    let mut table = remote_table(&mut book);
    table.insert(&person(0)).unwrap();
    book.reset_calls();

    let request = FormatRequest::<RemoteFormatter>::attributes([
        ("set_text_rotation", FormatArg::call("angle", 45i64)),
        ("shadow", FormatArg::value(true)),
    ]);
    assert!(matches!(
        table.format(request, None, None),
        Err(TableError::UnknownFormatAttribute { attribute, .. }) if attribute == "shadow"
    ));
    assert_eq!(book.calls().total(), 0);
}

#[test]
fn update_by_row_index_is_one_batch() {
    let mut book = MemorySpreadsheet::new();
    let mut table = remote_table(&mut book);
    for id in 0..5 {
        table.insert(&person(id)).unwrap();
    }
    book.reset_calls();

    let data = record([(ROW_IDX, 4.into()), ("id", 99.into()), ("name", "z".into())]);
    assert_eq!(
        table
            .update(&data, Some(&Where::new().eq("id", 0)))
            .unwrap(),
        1
    );
    assert_eq!(book.calls().count("update_cells"), 1);
    assert_eq!(ids(&table.query(None).unwrap()), vec![0, 1, 99, 3, 4]);
    assert_eq!(book.value(SHEET, 4, 1), Some(CellValue::Int(99)));
}

#[test]
fn no_op_delete_makes_no_calls() {
    let mut book = MemorySpreadsheet::new();
    let mut table = remote_table(&mut book);
    table.insert(&person(0)).unwrap();
    book.reset_calls();

    assert_eq!(
        table
            .delete(Some(&Where::new().eq("id", "nonexistent")))
            .unwrap(),
        0
    );
    assert_eq!(book.calls().total(), 0);
    assert_eq!(table.len().unwrap(), 1);
}

#[test]
fn trailing_blank_rows_are_not_data() {
    let mut book = MemorySpreadsheet::new();
    let mut table = remote_table(&mut book);
    for id in 0..4 {
        table.insert(&person(id)).unwrap();
    }
    table
        .delete(Some(&Where::new().row_matching(|r| r >= 4)))
        .unwrap();

    table.fetch().unwrap();
    assert_eq!(table.len().unwrap(), 2);
    assert_eq!(table.insert(&person(9)).unwrap(), 4);
    assert_eq!(ids(&table.query(None).unwrap()), vec![0, 1, 9]);
}
