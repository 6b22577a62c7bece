//! Snapshot files and the command-line entry point.

use std::process::Command;

use oxide_schemadiff::prelude::*;
use tempfile::tempdir;

fn shop(with_price: bool) -> SchemaSnapshot {
    let mut product = TableSchema::new("product")
        .column(
            ColumnSchema::new("id", SqlType::Integer)
                .primary_key()
                .auto_increment(),
        )
        .column(ColumnSchema::new("name", SqlType::Varchar(100)).not_null());
    if with_price {
        product = product.column(
            ColumnSchema::new("price", SqlType::Decimal(10, 2))
                .not_null()
                .default(DefaultValue::Integer(0)),
        );
    }
    SchemaSnapshot::new().app("shop", AppSchema::new().table(product))
}

#[test]
fn snapshot_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("shop.json");

    shop(true).save(&path).unwrap();
    let loaded = SchemaSnapshot::load(&path).unwrap();
    assert_eq!(loaded, shop(true));
}

#[test]
fn missing_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");
    match SchemaSnapshot::load(&path) {
        Err(MigrateError::SnapshotNotFound(missing)) => assert_eq!(missing, path),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn malformed_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"apps\": [").unwrap();
    assert!(matches!(
        SchemaSnapshot::load(&path),
        Err(MigrateError::Serialization(_))
    ));
}

#[test]
fn plan_from_saved_baseline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shop.json");

    let dialect = MysqlDialect::new();
    let planner = MigrationPlanner::new(&dialect);

    let first = planner.plan(None, &shop(false)).unwrap();
    first.snapshot.save(&path).unwrap();

    let baseline = SchemaSnapshot::load(&path).unwrap();
    let second = planner.plan(Some(&baseline), &shop(true)).unwrap();
    let migration = second.get("shop").unwrap();
    assert_eq!(
        migration.sql.upgrade,
        ["ALTER TABLE `product` ADD `price` DECIMAL(10,2) NOT NULL DEFAULT 0"]
    );
    assert_eq!(
        migration.sql.downgrade,
        ["ALTER TABLE `product` DROP COLUMN `price`"]
    );

    second.snapshot.save(&path).unwrap();
    let third = planner
        .plan(Some(&SchemaSnapshot::load(&path).unwrap()), &shop(true))
        .unwrap();
    assert!(third.is_empty());
}

#[test]
fn cli_prints_upgrade_and_writes_snapshot() {
    let dir = tempdir().unwrap();
    let from = dir.path().join("from.json");
    let to = dir.path().join("to.json");
    let written = dir.path().join("out").join("snapshot.json");
    shop(false).save(&from).unwrap();
    shop(true).save(&to).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_oxide-schemadiff"))
        .arg("--from")
        .arg(&from)
        .arg("--to")
        .arg(&to)
        .args(["--dialect", "postgres"])
        .arg("--write-snapshot")
        .arg(&written)
        .env_remove("SCHEMADIFF_DIALECT")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("-- shop (postgres)"));
    assert!(stdout
        .contains(r#"ALTER TABLE "product" ADD "price" DECIMAL(10,2) NOT NULL DEFAULT 0;"#));
    assert_eq!(SchemaSnapshot::load(&written).unwrap(), shop(true));
}

#[test]
fn cli_prints_downgrade() {
    let dir = tempdir().unwrap();
    let to = dir.path().join("to.json");
    shop(false).save(&to).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_oxide-schemadiff"))
        .arg("--to")
        .arg(&to)
        .args(["--dialect", "sqlite", "--downgrade"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(r#"DROP TABLE IF EXISTS "product";"#));
}

#[test]
fn cli_missing_snapshot_fails() {
    let dir = tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_oxide-schemadiff"))
        .arg("--to")
        .arg(dir.path().join("absent.json"))
        .output()
        .unwrap();
    assert!(!output.status.success());
}
