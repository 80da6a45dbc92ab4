//! CLI integration tests
//!
//! Runs the `sheetbridge` binary with assert_cmd against scratch databases.

#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

use assert_cmd::Command;
use predicates::prelude::*;
use sheetbridge::excel::codec::{read_workbook, write_workbook, Sheet};
use sheetbridge::types::CellValue;
use std::path::Path;
use tempfile::TempDir;

fn sheetbridge(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sheetbridge").unwrap();
    cmd.env_remove("SHEETBRIDGE_REGISTRY")
        .env_remove("RUST_LOG")
        .arg("--db")
        .arg(db);
    cmd
}

fn mascotas_workbook(dir: &TempDir) -> std::path::PathBuf {
    let mut sheet = Sheet::with_header("Mascotas", &["nombre", "especie", "paciente_id", "fecha_nacimiento"]);
    for (nombre, especie, dueno, nacimiento) in [
        ("Luna", "perro", "1", "2020-04-12"),
        ("Michi", "gato", "2", "12/09/2021"),
        ("Rocky", "", "3", ""),
    ] {
        sheet.push_row(vec![
            CellValue::Text(nombre.to_string()),
            CellValue::Text(especie.to_string()),
            CellValue::Text(dueno.to_string()),
            CellValue::Text(nacimiento.to_string()),
        ]);
    }
    let path = dir.path().join("mascotas.xlsx");
    std::fs::write(&path, write_workbook(&[sheet]).unwrap()).unwrap();
    path
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    Command::cargo_bin("sheetbridge")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("COMMANDS"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("sheetbridge")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_export_requires_tables_or_all() {
    let dir = TempDir::new().unwrap();
    sheetbridge(&dir.path().join("app.db"))
        .args(["export", "-o"])
        .arg(dir.path().join("out.xlsx"))
        .assert()
        .failure();
}

// ═══════════════════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_tables_command() {
    let dir = TempDir::new().unwrap();
    sheetbridge(&dir.path().join("app.db"))
        .arg("tables")
        .assert()
        .success()
        .stdout(predicate::str::contains("detalle_factura"))
        .stdout(predicate::str::contains("Detalle Factura"));
}

#[test]
fn test_import_then_export() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("app.db");
    let input = mascotas_workbook(&dir);

    sheetbridge(&db)
        .arg("import")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Partial Import"))
        .stdout(predicate::str::contains("especie"));

    let output = dir.path().join("out.xlsx");
    sheetbridge(&db)
        .args(["export", "-t", "mascotas,pacientes", "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Export Complete"));

    let sheets = read_workbook(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(sheets[0].name, "Mascotas");
    assert_eq!(sheets[0].data_row_count(), 2);
    assert_eq!(sheets[1].name, "Pacientes");
}

#[test]
fn test_import_json_report() {
    let dir = TempDir::new().unwrap();
    let input = mascotas_workbook(&dir);

    let output = sheetbridge(&dir.path().join("app.db"))
        .args(["import", "--json", "--sequential"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["attempted"], 3);
    assert_eq!(report["inserted"], 2);
    assert_eq!(report["errors"][0]["row"], 3);
    assert_eq!(report["errors"][0]["reason"], "required");
}

#[test]
fn test_import_unknown_table_fails() {
    let dir = TempDir::new().unwrap();
    let input = mascotas_workbook(&dir);

    sheetbridge(&dir.path().join("app.db"))
        .args(["import", "--table", "proveedores"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("proveedores"));
}

#[test]
fn test_export_unknown_table_fails() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.xlsx");

    sheetbridge(&dir.path().join("app.db"))
        .args(["export", "-t", "proveedores", "-o"])
        .arg(&output)
        .assert()
        .failure();
    assert!(!output.exists());
}

#[test]
fn test_export_missing_database_fails_without_creating_it() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("typo.db");
    let output = dir.path().join("out.xlsx");

    sheetbridge(&db)
        .args(["export", "-t", "productos", "-o"])
        .arg(&output)
        .assert()
        .failure();
    assert!(!db.exists());
    assert!(!output.exists());
}

#[test]
fn test_custom_registry() {
    let dir = TempDir::new().unwrap();
    let catalog = dir.path().join("catalog.yaml");
    std::fs::write(
        &catalog,
        "tables:\n  - id: proveedores\n    sheet_name: Proveedores\n    primary_key: id\n    columns:\n      - { name: id, type: integer }\n      - { name: nombre, type: text, required: true }\n",
    )
    .unwrap();

    sheetbridge(&dir.path().join("app.db"))
        .arg("--registry")
        .arg(&catalog)
        .arg("tables")
        .assert()
        .success()
        .stdout(predicate::str::contains("proveedores"))
        .stdout(predicate::str::contains("productos").not());
}
