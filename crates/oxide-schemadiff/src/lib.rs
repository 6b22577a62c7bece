//! Schema diffing and dialect-aware DDL generation.
//!
//! `oxide-schemadiff` compares a recorded schema snapshot with a declared
//! data model and produces the statements that migrate one into the other,
//! in both directions:
//! - Changes are detected per table, column, index, foreign key and
//!   many-to-many relation
//! - Operators are ordered so that referenced tables exist before the keys
//!   pointing at them
//! - Every upgrade operator has an inverse, and the downgrade undoes the
//!   upgrade in reverse order
//! - SQL generation is dialect-aware (MySQL, PostgreSQL, SQLite)
//!
//! Nothing here talks to a database: the output is text.
//!
//! # Architecture
//!
//! - **Schema** - Snapshot descriptions: tables, columns, indexes, relations
//! - **Naming** - Deterministic hashed names for indexes and constraints
//! - **Autodetector** - Diffs two snapshots into change operators
//! - **Sequencer** - Orders operators and builds the downgrade
//! - **Dialect** - Database-specific SQL generation
//! - **State** - Replays operators against a schema description
//!
//! # Example
//!
//! ```rust
//! use oxide_schemadiff::prelude::*;
//!
//! let new = SchemaSnapshot::new().app(
//!     "models",
//!     AppSchema::new().table(
//!         TableSchema::new("user")
//!             .column(
//!                 ColumnSchema::new("id", SqlType::Integer)
//!                     .primary_key()
//!                     .auto_increment(),
//!             )
//!             .column(ColumnSchema::new("username", SqlType::Varchar(20)).not_null().unique()),
//!     ),
//! );
//!
//! let dialect = PostgresDialect::new();
//! let planned = MigrationPlanner::new(&dialect).plan(None, &new).unwrap();
//! let migration = planned.get("models").unwrap();
//! assert_eq!(migration.sql.downgrade, ["DROP TABLE IF EXISTS \"user\""]);
//! ```

pub mod autodetector;
pub mod dialect;
pub mod error;
pub mod naming;
pub mod operations;
pub mod plan;
pub mod schema;
pub mod sequencer;
pub mod state;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::autodetector::{AppChanges, Autodetector, DiffWarning, TableChanges};
    pub use crate::dialect::{
        DialectKind, DialectOptions, MigrationDialect, MysqlDialect, PostgresDialect,
        SqliteDialect,
    };
    pub use crate::error::{MigrateError, Result};
    pub use crate::naming::{derive_name, foreign_key_name, NameKind};
    pub use crate::operations::{ChangeOperator, Phase};
    pub use crate::plan::{Migration, MigrationPlanner, PlannedMigrations};
    pub use crate::schema::{
        AppSchema, ColumnSchema, DefaultValue, ForeignKeyAction, ForeignKeySchema, IndexSchema,
        IndexType, M2MSchema, SchemaSnapshot, SqlType, TableOptions, TableSchema,
    };
    pub use crate::sequencer::{dependency_order, MigrationPlan, RenderedMigration, Sequencer};
    pub use crate::state::SchemaState;
}
