mod common;

use cellbase::{
    Cellbase, CellbaseConfig, CellValue, IoError, LocalFormatter, LocalWorkbook,
    MemorySpreadsheet, RemoteSpreadsheet, RemoteWorkbook, RemoteWorksheet, TableError, Where,
    WorkbookBackend,
    style::{Fill, StyleValue},
};
use common::{ids, person, schema};
use tempfile::tempdir;

#[test]
fn worksheets_are_created_from_registered_schemas() {
    let mut db = Cellbase::new(LocalWorkbook::new()).unwrap();
    db.register_all([("a", vec!["id", "name"]), ("b", vec!["id", "name"])]);
    assert!(db.is_empty());

    db.insert("a", &person(1)).unwrap();
    db.insert("b", &person(2)).unwrap();

    assert!(db.contains("a"));
    assert_eq!(db.len(), 2);
    assert_eq!(db.sheet_names(), vec!["a", "b"]);
    // new worksheets go to the front
    assert_eq!(db.backend().sheet_names().unwrap(), vec!["b", "a"]);
    assert_eq!(db.schema("a").unwrap(), schema().as_slice());
    assert_eq!(ids(&db.query("b", None).unwrap()), vec![2]);
}

#[test]
fn missing_schema_is_an_error() {
    let mut db = Cellbase::new(LocalWorkbook::new()).unwrap();
    match db.query("ghost", None) {
        Err(TableError::SchemaNotRegistered(name)) => assert_eq!(name, "ghost"),
        other => panic!("expected SchemaNotRegistered, got {other:?}"),
    }
    assert!(!db.contains("ghost"));
}

#[test]
fn drop_removes_worksheet_and_table() {
    let mut db = Cellbase::new(LocalWorkbook::new()).unwrap();
    db.register("a", schema());
    db.insert("a", &person(1)).unwrap();

    db.drop("a").unwrap();
    assert!(!db.contains("a"));
    assert!(db.backend().sheet_names().unwrap().is_empty());
    assert!(matches!(
        db.drop("a"),
        Err(TableError::Io(IoError::SheetNotFound(_)))
    ));

    // the schema is still registered, so the next access recreates it empty
    assert!(db.query("a", None).unwrap().is_empty());
}

#[test]
fn operations_route_through_named_tables() {
    let mut db = Cellbase::new(LocalWorkbook::new()).unwrap();
    db.register("people", schema());
    for id in 0..4 {
        db.insert("people", &person(id)).unwrap();
    }

    let mut data = person(0);
    data.insert("name".into(), "renamed".into());
    assert_eq!(
        db.update("people", &data, Some(&Where::new().eq("id", 0)))
            .unwrap(),
        1
    );
    assert_eq!(
        db.traverse(
            "people",
            |cell| cell.set_value(0),
            Some(&Where::new().eq("id", 3)),
            Some(&["id"][..]),
        )
        .unwrap(),
        1
    );
    assert_eq!(db.delete("people", Some(&Where::new().eq("id", 1))).unwrap(), 1);
    let formatter = LocalFormatter {
        fill: Some(Fill::solid("FFFF0000")),
        ..Default::default()
    };
    assert_eq!(db.format("people", formatter, None, None).unwrap(), 3);

    let table = db.table("people").unwrap();
    assert_eq!(table.len().unwrap(), 3);
    let rows = table.query(None).unwrap();
    assert_eq!(ids(&rows), vec![0, 2, 0]);
    assert_eq!(rows[0]["name"], CellValue::from("renamed"));
}

#[test]
fn workbook_persists_between_sessions() {
    let dir = tempdir().unwrap();
    let config = CellbaseConfig::new(dir.path(), "book.json").with_schema("people", schema());

    {
        let mut db = Cellbase::open(config.clone()).unwrap();
        for id in 0..3 {
            db.insert("people", &person(id)).unwrap();
        }
        db.delete("people", Some(&Where::new().row(2))).unwrap();
        let formatter = LocalFormatter {
            fill: Some(Fill::solid("00FFFF00")),
            ..Default::default()
        };
        db.format("people", formatter, Some(&Where::new().eq("id", 2)), None)
            .unwrap();
        db.save().unwrap();
    }
    assert!(config.location().exists());

    let text = std::fs::read_to_string(config.location()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["version"], 1);
    assert_eq!(json["sheets"][0]["title"], "people");
    assert_eq!(json["sheets"][0]["cells"][0]["value"]["type"], "Text");

    let mut db = Cellbase::open(config).unwrap();
    assert!(db.contains("people"));
    let rows = db.query("people", None).unwrap();
    assert_eq!(ids(&rows), vec![1, 2]);

    let workbook = db.backend();
    let styled = workbook.sheet("people").unwrap().cell(3, 1).unwrap();
    assert_eq!(
        styled.style().get("fill"),
        Some(&StyleValue::Fill(Fill::solid("00FFFF00")))
    );
}

#[test]
fn save_as_refuses_to_clobber() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("copy.json");
    std::fs::write(&target, "{}").unwrap();

    let mut db = Cellbase::new(LocalWorkbook::new()).unwrap();
    db.register("t", schema());
    db.insert("t", &person(1)).unwrap();

    assert!(matches!(
        db.save_as(&target, false),
        Err(TableError::Io(IoError::FileExists(path))) if path == target
    ));
    db.save_as(&target, true).unwrap();

    let reloaded = LocalWorkbook::open_path(&target).unwrap();
    assert_eq!(reloaded.sheet_names().unwrap(), vec!["t"]);
    assert_eq!(reloaded.path(), Some(target.as_path()));
}

#[test]
fn missing_workbook_fails_when_creation_disabled() {
    let dir = tempdir().unwrap();
    let mut config = CellbaseConfig::new(dir.path(), "absent.json");
    config.create_if_missing = false;

    assert!(matches!(
        Cellbase::open(config),
        Err(TableError::Io(IoError::WorkbookNotFound(_)))
    ));
}

#[test]
fn remote_tables_open_unfetched() {
    let mut book = MemorySpreadsheet::new();
    let mut ws = book.add_worksheet("existing", 0).unwrap();
    ws.update_row(1, vec!["id".into(), "name".into()]).unwrap();
    ws.update_row(2, vec![7.into(), "seven".into()]).unwrap();
    book.reset_calls();

    let config = CellbaseConfig::default().with_schema("fresh", schema());
    let mut db = Cellbase::with_config(RemoteWorkbook::new(book.clone()), config).unwrap();
    assert!(db.contains("existing"));
    assert_eq!(book.calls().count("get_all_values"), 0);

    assert_eq!(ids(&db.query("existing", None).unwrap()), vec![7]);
    assert_eq!(book.calls().count("get_all_values"), 1);

    assert_eq!(db.insert("fresh", &person(1)).unwrap(), 2);
    assert_eq!(book.calls().count("add_worksheet"), 1);
    assert_eq!(
        db.backend().spreadsheet().worksheet_titles().unwrap(),
        vec!["fresh".to_string(), "existing".to_string()]
    );
    assert_eq!(book.value("fresh", 1, 2), Some(CellValue::from("name")));
}

#[test]
fn config_schemas_are_registered() {
    let config = CellbaseConfig::from_json_str(r#"{"schemas": {"t": ["id", "name"]}}"#).unwrap();
    let mut db = Cellbase::with_config(LocalWorkbook::new(), config).unwrap();
    assert_eq!(db.insert("t", &person(4)).unwrap(), 2);
    assert_eq!(db.config().filename, "cellbase.json");
}
