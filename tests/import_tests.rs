//! Workbook import tests: sheet resolution, coercion failures and report accounting

use pretty_assertions::assert_eq;
use sheetbridge::excel::codec::{write_workbook, Sheet};
use sheetbridge::excel::{ExcelExporter, ExcelImporter, ExportRequest, ImportOptions};
use sheetbridge::registry::TableRegistry;
use sheetbridge::store::{MemoryStore, StoreReader};
use sheetbridge::types::{
    CellValue, ColumnSpec, ColumnType, ImportReport, ImportStatus, RowErrorKind, TableSchema, TypedValue,
};
use sheetbridge::InterchangeError;

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

fn productos_sheet(name: &str, rows: &[[&str; 3]]) -> Sheet {
    let mut sheet = Sheet::with_header(name, &["nombre", "precio_costo", "stock"]);
    for row in rows {
        sheet.push_row(row.iter().map(|c| text(c)).collect());
    }
    sheet
}

fn usuarios_sheet(name: &str, rows: &[[&str; 3]]) -> Sheet {
    let mut sheet = Sheet::with_header(name, &["usuario", "nombre", "rol"]);
    for row in rows {
        sheet.push_row(row.iter().map(|c| text(c)).collect());
    }
    sheet
}

fn import(sheets: &[Sheet], table: Option<&str>) -> (ImportReport, MemoryStore) {
    let registry = TableRegistry::builtin();
    let store = MemoryStore::for_registry(&registry);
    let bytes = write_workbook(sheets).unwrap();
    let report = ExcelImporter::new(&registry, &store).import(&bytes, table).unwrap();
    (report, store)
}

fn assert_accounting(report: &ImportReport) {
    assert_eq!(report.attempted, report.inserted + report.failed);
    for table in &report.tables {
        assert_eq!(table.attempted, table.inserted + table.errors.len(), "table {}", table.table);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_clean_import() {
    let (report, store) = import(&[productos_sheet("productos", &[["Alimento X", "10.5", "20"]])], None);

    assert_eq!(report.attempted, 1);
    assert_eq!(report.inserted, 1);
    assert!(report.errors.is_empty());
    assert_eq!(report.status(), ImportStatus::Complete);
    assert_eq!(store.count("productos"), 1);

    let registry = TableRegistry::builtin();
    let records = store.fetch_all(registry.lookup("productos").unwrap()).unwrap();
    assert_eq!(records[0]["nombre"], TypedValue::Text("Alimento X".to_string()));
    assert_eq!(records[0]["precio_costo"], TypedValue::Decimal(10.5));
    assert_eq!(records[0]["stock"], TypedValue::Integer(20));
    assert_eq!(records[0]["id"], TypedValue::Integer(1));
}

#[test]
fn test_missing_required_value() {
    let (report, store) = import(&[productos_sheet("productos", &[["", "10.5", "20"]])], None);

    assert_eq!(report.attempted, 1);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.errors.len(), 1);
    let error = &report.errors[0];
    assert_eq!(error.row, 1);
    assert_eq!(error.column.as_deref(), Some("nombre"));
    assert_eq!(error.reason, "required");
    assert_eq!(error.kind, RowErrorKind::Required);
    assert_eq!(store.count("productos"), 0);
    assert_accounting(&report);
}

#[test]
fn test_unmatched_sheet_is_excluded() {
    let mut datos = Sheet::with_header("Datos", &["a", "b"]);
    datos.push_row(vec![text("1"), text("2")]);
    datos.push_row(vec![text("3"), text("4")]);

    let (report, _) = import(&[datos, productos_sheet("Productos", &[["A", "1", "1"]])], None);

    assert_eq!(report.unmatched_sheets, vec!["Datos".to_string()]);
    assert_eq!(report.attempted, 1);
    assert_eq!(report.tables.len(), 1);
    assert!(report.table("productos").is_some());
}

#[test]
fn test_multi_table_workbook() {
    let sheets = [
        productos_sheet("productos", &[["A", "1", "1"], ["B", "2.25", "3"]]),
        usuarios_sheet("usuarios", &[["ana", "Ana", "admin"]]),
    ];
    let (report, store) = import(&sheets, None);

    assert_eq!(report.tables.len(), 2);
    let productos = report.table("productos").unwrap();
    assert_eq!((productos.attempted, productos.inserted), (2, 2));
    let usuarios = report.table("usuarios").unwrap();
    assert_eq!((usuarios.attempted, usuarios.inserted), (1, 1));
    assert_eq!(report.tables_touched(), vec!["productos", "usuarios"]);
    assert_eq!(store.count("productos"), 2);
    assert_eq!(store.count("usuarios"), 1);
}

#[test]
fn test_header_only_sheet() {
    let (report, _) = import(&[productos_sheet("Productos", &[])], None);

    let result = report.table("productos").unwrap();
    assert_eq!(result.attempted, 0);
    assert_eq!(result.inserted, 0);
    assert!(result.errors.is_empty());
    assert!(result.sheet_error.is_none());
    assert_eq!(report.status(), ImportStatus::Nothing);
}

#[test]
fn test_missing_header_column_fails_sheet_once() {
    let mut sheet = Sheet::with_header("Productos", &["nombre", "stock"]);
    sheet.push_row(vec![text("A"), text("1")]);
    sheet.push_row(vec![text("B"), text("2")]);

    let (report, store) = import(&[sheet, usuarios_sheet("Usuarios", &[["ana", "Ana", "admin"]])], None);

    let productos = report.table("productos").unwrap();
    assert_eq!(productos.attempted, 0);
    let sheet_error = productos.sheet_error.as_ref().unwrap();
    assert_eq!(sheet_error.kind, RowErrorKind::MissingColumn);
    assert_eq!(sheet_error.column.as_deref(), Some("precio_costo"));

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(store.count("productos"), 0);
    assert_eq!(store.count("usuarios"), 1);
    assert_accounting(&report);
}

// ═══════════════════════════════════════════════════════════════════════════
// MATCHING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_fuzzy_and_alias_sheet_names() {
    let sheets = [
        productos_sheet("PRODUCTO", &[["A", "1", "1"]]),
        usuarios_sheet("Usuários", &[["ana", "Ana", "admin"]]),
        productos_sheet("Inventario", &[["B", "2", "2"]]),
    ];
    let (report, store) = import(&sheets, None);

    assert!(report.unmatched_sheets.is_empty());
    assert_eq!(report.tables.len(), 3);
    assert_eq!(report.tables[0].sheet, "PRODUCTO");
    assert_eq!(report.tables[2].sheet, "Inventario");
    assert_eq!(store.count("productos"), 2);
}

#[test]
fn test_explicit_table_overrides_sheet_names() {
    let sheets = [
        productos_sheet("Hoja1", &[["A", "1", "1"]]),
        productos_sheet("Usuarios", &[["B", "2", "2"]]),
    ];
    let (report, store) = import(&sheets, Some("productos"));

    assert!(report.unmatched_sheets.is_empty());
    assert!(report.tables.iter().all(|t| t.table == "productos"));
    assert_eq!(store.count("productos"), 2);
    assert_eq!(store.count("usuarios"), 0);
}

#[test]
fn test_unknown_explicit_table_is_fatal() {
    let registry = TableRegistry::builtin();
    let store = MemoryStore::for_registry(&registry);
    let bytes = write_workbook(&[productos_sheet("Productos", &[["A", "1", "1"]])]).unwrap();

    let err = ExcelImporter::new(&registry, &store)
        .import(&bytes, Some("proveedores"))
        .unwrap_err();
    assert!(matches!(err, InterchangeError::UnknownTable(t) if t == "proveedores"));
    assert_eq!(store.count("productos"), 0);
}

#[test]
fn test_undecodable_workbook_is_fatal() {
    let registry = TableRegistry::builtin();
    let store = MemoryStore::for_registry(&registry);
    let err = ExcelImporter::new(&registry, &store)
        .import(b"definitely not a zip archive", None)
        .unwrap_err();
    assert!(matches!(err, InterchangeError::Workbook(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// ROW-LEVEL FAILURES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_bad_rows_do_not_block_good_rows() {
    let sheet = productos_sheet(
        "Productos",
        &[
            ["A", "1.5", "10"],
            ["B", "uno", "10"],
            ["C", "2", "diez"],
            ["D", "1,5", "1"],
            ["E", "3", "4"],
        ],
    );
    let (report, store) = import(&[sheet], None);

    assert_eq!(report.attempted, 5);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.failed, 3);
    let rows: Vec<usize> = report.errors.iter().map(|e| e.row).collect();
    assert_eq!(rows, vec![2, 3, 4]);
    assert!(report.errors.iter().all(|e| e.kind == RowErrorKind::InvalidValue));
    assert_eq!(report.status(), ImportStatus::Partial);
    assert_eq!(store.count("productos"), 2);
    assert_accounting(&report);
}

#[test]
fn test_duplicate_keys_rejected_per_row() {
    let mut sheet = Sheet::with_header("Usuarios", &["id", "usuario", "nombre", "rol"]);
    sheet.push_row(vec![text("1"), text("ana"), text("Ana"), text("admin")]);
    sheet.push_row(vec![text("1"), text("ana2"), text("Ana"), text("admin")]);
    sheet.push_row(vec![text("2"), text("luis"), text("Luis"), text("vendedor")]);

    let (report, store) = import(&[sheet], None);

    assert_eq!(report.inserted, 2);
    assert_eq!(report.errors.len(), 1);
    let error = &report.errors[0];
    assert_eq!(error.row, 2);
    assert_eq!(error.kind, RowErrorKind::Rejected);
    assert_eq!(error.key.as_deref(), Some("1"));
    assert_eq!(store.count("usuarios"), 2);
}

#[test]
fn test_blank_rows_are_not_counted() {
    let mut sheet = productos_sheet("Productos", &[["A", "1", "1"]]);
    sheet.push_row(vec![CellValue::Empty, CellValue::Empty, CellValue::Empty]);
    sheet.push_row(vec![text("B"), text("2"), text("2")]);

    let (report, _) = import(&[sheet], None);
    assert_eq!(report.attempted, 2);
    assert_eq!(report.inserted, 2);
}

// ═══════════════════════════════════════════════════════════════════════════
// ROUND TRIP / CONCURRENCY
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_export_then_import_rejects_existing_keys() {
    let registry = TableRegistry::builtin();
    let store = MemoryStore::for_registry(&registry);
    let seed = productos_sheet("Productos", &[["A", "1.5", "10"], ["B", "2", "20"], ["C", "3", "30"]]);
    let bytes = write_workbook(&[seed]).unwrap();
    ExcelImporter::new(&registry, &store).import(&bytes, None).unwrap();
    assert_eq!(store.count("productos"), 3);

    let request = ExportRequest::new(&registry, ["productos"]).unwrap();
    let exported = ExcelExporter::new(&registry, &store).export(&request).unwrap();
    let report = ExcelImporter::new(&registry, &store).import(&exported, None).unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.failed, 3);
    assert!(report.errors.iter().all(|e| e.kind == RowErrorKind::Rejected));
    assert_eq!(store.count("productos"), 3);
    assert_accounting(&report);
}

#[test]
fn test_round_trip_into_empty_store_preserves_records() {
    let registry = TableRegistry::builtin();
    let source = MemoryStore::for_registry(&registry);
    let mut sheet = Sheet::with_header(
        "Productos",
        &["nombre", "precio_costo", "stock", "activo", "fecha_vencimiento"],
    );
    sheet.push_row(vec![text("Vacuna"), text("12.75"), text("4"), text("sí"), text("31/12/2025")]);
    sheet.push_row(vec![text("Collar"), text("3"), text("0"), text("no"), CellValue::Empty]);
    let bytes = write_workbook(&[sheet]).unwrap();
    ExcelImporter::new(&registry, &source).import(&bytes, None).unwrap();

    let request = ExportRequest::new(&registry, ["productos"]).unwrap();
    let exported = ExcelExporter::new(&registry, &source).export(&request).unwrap();

    let target = MemoryStore::for_registry(&registry);
    let report = ExcelImporter::new(&registry, &target).import(&exported, None).unwrap();
    assert_eq!(report.inserted, 2);

    let schema = registry.lookup("productos").unwrap();
    assert_eq!(source.fetch_all(schema).unwrap(), target.fetch_all(schema).unwrap());
}

#[test]
fn test_round_trip_keeps_integers_beyond_float_precision() {
    let registry = TableRegistry::builtin();
    let source = MemoryStore::for_registry(&registry);
    let mut sheet = Sheet::with_header("Usuarios", &["id", "usuario", "nombre", "rol"]);
    for (id, usuario) in [("9007199254740993", "ana"), ("9223372036854775807", "luis"), ("-9007199254740995", "eva")] {
        sheet.push_row(vec![text(id), text(usuario), text(usuario), text("admin")]);
    }
    let bytes = write_workbook(&[sheet]).unwrap();
    let report = ExcelImporter::new(&registry, &source).import(&bytes, None).unwrap();
    assert_eq!(report.inserted, 3);

    let request = ExportRequest::new(&registry, ["usuarios"]).unwrap();
    let exported = ExcelExporter::new(&registry, &source).export(&request).unwrap();

    let target = MemoryStore::for_registry(&registry);
    let report = ExcelImporter::new(&registry, &target).import(&exported, None).unwrap();
    assert_eq!(report.inserted, 3);

    let schema = registry.lookup("usuarios").unwrap();
    let ids: Vec<TypedValue> = target.fetch_all(schema).unwrap().iter().map(|r| r["id"].clone()).collect();
    assert_eq!(
        ids,
        vec![
            TypedValue::Integer(-9_007_199_254_740_995),
            TypedValue::Integer(9_007_199_254_740_993),
            TypedValue::Integer(i64::MAX),
        ]
    );
    assert_eq!(source.fetch_all(schema).unwrap(), target.fetch_all(schema).unwrap());
}

#[test]
fn test_blank_key_after_largest_key_fails_only_its_row() {
    let mut sheet = Sheet::with_header("Usuarios", &["id", "usuario", "nombre", "rol"]);
    sheet.push_row(vec![text("9223372036854775807"), text("ana"), text("Ana"), text("admin")]);
    sheet.push_row(vec![CellValue::Empty, text("luis"), text("Luis"), text("admin")]);
    let (report, store) = import(&[sheet], None);

    assert_accounting(&report);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors[0].row, 2);
    assert_eq!(report.status(), ImportStatus::Partial);
    assert_eq!(store.count("usuarios"), 1);
}

#[test]
fn test_ambiguous_sheet_is_unmatched() {
    let columns = || {
        vec![
            ColumnSpec::optional("id", ColumnType::Integer),
            ColumnSpec::required("nombre", ColumnType::Text),
        ]
    };
    let registry = TableRegistry::from_schemas(vec![
        TableSchema::new("ventas", "Ventas", "id", columns()).with_aliases(&["Movimientos"]),
        TableSchema::new("compras", "Compras", "id", columns()).with_aliases(&["Movimiento"]),
    ])
    .unwrap();
    let store = MemoryStore::for_registry(&registry);

    let mut ambiguous = Sheet::with_header("MOVIMIENTOS!", &["nombre"]);
    ambiguous.push_row(vec![text("uno")]);
    ambiguous.push_row(vec![text("dos")]);
    let mut ventas = Sheet::with_header("Ventas", &["nombre"]);
    ventas.push_row(vec![text("tres")]);
    let bytes = write_workbook(&[ambiguous, ventas]).unwrap();

    let report = ExcelImporter::new(&registry, &store).import(&bytes, None).unwrap();

    assert_eq!(report.unmatched_sheets, vec!["MOVIMIENTOS!".to_string()]);
    assert_eq!(report.tables.len(), 1);
    assert!(report.tables.iter().all(|t| t.sheet != "MOVIMIENTOS!"));
    assert!(report.table("compras").is_none());
    assert_eq!(report.attempted, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(store.count("ventas"), 1);
    assert_eq!(store.count("compras"), 0);
    assert_eq!(report.status(), ImportStatus::Partial);
}

#[test]
fn test_parallel_and_sequential_reports_match() {
    let sheets = [
        productos_sheet("Productos", &[["A", "1", "1"], ["B", "x", "2"]]),
        usuarios_sheet("Usuarios", &[["ana", "Ana", "admin"]]),
        productos_sheet("Inventario", &[["C", "3", "3"]]),
        usuarios_sheet("Datos", &[["x", "y", "z"]]),
    ];
    let bytes = write_workbook(&sheets).unwrap();
    let registry = TableRegistry::builtin();

    let run = |parallel: bool| {
        let store = MemoryStore::for_registry(&registry);
        ExcelImporter::new(&registry, &store)
            .with_options(ImportOptions { parallel })
            .import(&bytes, None)
            .unwrap()
    };

    let parallel = run(true);
    let sequential = run(false);
    assert_eq!(parallel, sequential);

    let sheets: Vec<&str> = parallel.tables.iter().map(|t| t.sheet.as_str()).collect();
    assert_eq!(sheets, vec!["Productos", "Usuarios", "Inventario"]);
    assert_eq!(parallel.unmatched_sheets, vec!["Datos".to_string()]);
}
