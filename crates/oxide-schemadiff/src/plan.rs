//! End-to-end planning: snapshots in, per-app migrations out.

use tracing::info;

use crate::autodetector::{Autodetector, DiffWarning};
use crate::dialect::MigrationDialect;
use crate::error::Result;
use crate::schema::SchemaSnapshot;
use crate::sequencer::{MigrationPlan, RenderedMigration, Sequencer};

/// The migration of one app, rendered for one dialect.
#[derive(Debug, Clone)]
pub struct Migration {
    /// App name.
    pub app: String,
    /// Ordered operators in both directions.
    pub plan: MigrationPlan,
    /// Statements in both directions.
    pub sql: RenderedMigration,
    /// Detected changes that are not part of the migration.
    pub warnings: Vec<DiffWarning>,
}

/// Result of planning: the migrations to write and the new baseline.
#[derive(Debug, Clone)]
pub struct PlannedMigrations {
    /// One migration per app with changes, ordered by app name.
    pub migrations: Vec<Migration>,
    /// The snapshot to record once the migrations are written.
    pub snapshot: SchemaSnapshot,
}

impl PlannedMigrations {
    /// Returns true if no app changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Gets the migration of an app.
    #[must_use]
    pub fn get(&self, app: &str) -> Option<&Migration> {
        self.migrations.iter().find(|m| m.app == app)
    }
}

/// Diffs, sequences and renders migrations for a dialect.
pub struct MigrationPlanner<'d> {
    dialect: &'d dyn MigrationDialect,
    autodetector: Autodetector,
    sequencer: Sequencer,
}

impl<'d> MigrationPlanner<'d> {
    /// Creates a planner rendering with `dialect`.
    #[must_use]
    pub fn new(dialect: &'d dyn MigrationDialect) -> Self {
        Self {
            dialect,
            autodetector: Autodetector::new(),
            sequencer: Sequencer::new(),
        }
    }

    /// Plans the migrations from `old` to `new`.
    ///
    /// A missing `old` snapshot is a first run: everything in `new` is
    /// created. Any failure (malformed input, a cycle, an operation the
    /// dialect cannot express) fails the whole plan.
    pub fn plan(
        &self,
        old: Option<&SchemaSnapshot>,
        new: &SchemaSnapshot,
    ) -> Result<PlannedMigrations> {
        let empty = SchemaSnapshot::default();
        let old = old.unwrap_or(&empty);

        let mut migrations = Vec::new();
        for changes in self.autodetector.diff(old, new)? {
            if changes.is_empty() {
                continue;
            }
            let plan = self.sequencer.sequence(&changes)?;
            let sql = plan.render(self.dialect)?;
            info!(
                app = %changes.app,
                dialect = self.dialect.name(),
                upgrade = sql.upgrade.len(),
                downgrade = sql.downgrade.len(),
                "Planned migration"
            );
            migrations.push(Migration {
                app: changes.app,
                plan,
                sql,
                warnings: changes.warnings,
            });
        }

        Ok(PlannedMigrations {
            migrations,
            snapshot: new.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqliteDialect};
    use crate::error::MigrateError;
    use crate::schema::{AppSchema, ColumnSchema, SqlType, TableSchema};

    fn snapshot(name_type: SqlType) -> SchemaSnapshot {
        SchemaSnapshot::new().app(
            "models",
            AppSchema::new().table(
                TableSchema::new("tag")
                    .column(
                        ColumnSchema::new("id", SqlType::Integer)
                            .primary_key()
                            .auto_increment(),
                    )
                    .column(ColumnSchema::new("name", name_type)),
            ),
        )
    }

    #[test]
    fn test_first_run() {
        let dialect = PostgresDialect::new();
        let planned = MigrationPlanner::new(&dialect)
            .plan(None, &snapshot(SqlType::Text))
            .unwrap();
        let migration = planned.get("models").unwrap();
        assert_eq!(
            migration.sql.upgrade,
            ["CREATE TABLE IF NOT EXISTS \"tag\" (\n    \
              \"id\" SERIAL NOT NULL PRIMARY KEY,\n    \
              \"name\" TEXT\n)"]
        );
        assert_eq!(migration.sql.downgrade, ["DROP TABLE IF EXISTS \"tag\""]);
        assert_eq!(planned.snapshot, snapshot(SqlType::Text));
    }

    #[test]
    fn test_no_changes() {
        let dialect = PostgresDialect::new();
        let current = snapshot(SqlType::Text);
        let planned = MigrationPlanner::new(&dialect)
            .plan(Some(&current), &current)
            .unwrap();
        assert!(planned.is_empty());
    }

    #[test]
    fn test_unsupported_fails_whole_plan() {
        let dialect = SqliteDialect::new();
        let result = MigrationPlanner::new(&dialect)
            .plan(Some(&snapshot(SqlType::Text)), &snapshot(SqlType::Varchar(50)));
        assert!(matches!(
            result,
            Err(MigrateError::UnsupportedOperation { dialect: "sqlite", .. })
        ));
    }

    #[test]
    fn test_dropping_a_referenced_table_is_rejected() {
        let tag = || {
            TableSchema::new("tag")
                .column(ColumnSchema::new("id", SqlType::Integer).primary_key().auto_increment())
        };
        let post = TableSchema::new("post")
            .column(ColumnSchema::new("id", SqlType::Integer).primary_key().auto_increment())
            .column(
                ColumnSchema::new("tag_id", SqlType::Integer)
                    .not_null()
                    .references("tag", "id"),
            );
        let old = SchemaSnapshot::new().app(
            "models",
            AppSchema::new().table(tag()).table(post.clone()),
        );
        let new = SchemaSnapshot::new().app("models", AppSchema::new().table(post));

        let dialect = PostgresDialect::new();
        let result = MigrationPlanner::new(&dialect).plan(Some(&old), &new);
        assert!(matches!(result, Err(MigrateError::MalformedDescription(_))));
    }

    #[test]
    fn test_same_plan_many_dialects() {
        let old = snapshot(SqlType::Text);
        let new = snapshot(SqlType::Varchar(50));
        let pg = PostgresDialect::new();
        let planned = MigrationPlanner::new(&pg).plan(Some(&old), &new).unwrap();
        let migration = planned.get("models").unwrap();
        assert_eq!(
            migration.sql.upgrade,
            ["ALTER TABLE \"tag\" ALTER COLUMN \"name\" \
              TYPE VARCHAR(50) USING \"name\"::VARCHAR(50)"]
        );

        let mysql = crate::dialect::MysqlDialect::new();
        let rendered = migration.plan.render(&mysql).unwrap();
        assert_eq!(
            rendered.downgrade,
            ["ALTER TABLE `tag` MODIFY COLUMN `name` LONGTEXT"]
        );
    }
}
