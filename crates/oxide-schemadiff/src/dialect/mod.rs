//! Database dialect implementations.
//!
//! Each dialect is a capability table (quoting, type names, default
//! syntax, what can be altered in place) plus one emitter per structural
//! operation. Emitters are pure: they build SQL text from descriptions and
//! never look at a live database.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MigrateError, Result};
use crate::operations::ChangeOperator;
use crate::schema::{
    ColumnSchema, DefaultValue, ForeignKeySchema, IndexSchema, SqlType, TableSchema,
};

/// Trait for database-specific SQL generation.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        format!("{q}{name}{q}")
    }

    /// Returns the SQL type name for the given type.
    fn type_name(&self, sql_type: &SqlType) -> String;

    /// Returns the literal for a boolean default.
    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    /// Returns the expression for a "current timestamp" default.
    fn now_literal(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    /// Renders a default value, or `None` when no default is declared.
    fn render_default(&self, default: &DefaultValue) -> Option<String> {
        match default {
            DefaultValue::None => None,
            DefaultValue::Null => Some("NULL".to_string()),
            DefaultValue::Bool(b) => Some(self.bool_literal(*b).to_string()),
            DefaultValue::Integer(i) => Some(i.to_string()),
            DefaultValue::Float(f) => Some(f.to_string()),
            DefaultValue::String(s) => Some(quote_literal(s)),
            DefaultValue::Now => Some(self.now_literal().to_string()),
            DefaultValue::Expression(e) => Some(e.clone()),
        }
    }

    /// Maximum length of an identifier, in bytes.
    fn max_identifier_length(&self) -> usize;

    /// Returns whether this dialect stores column comments.
    fn supports_comments(&self) -> bool {
        true
    }

    /// Returns whether a column comment is part of the column definition.
    ///
    /// When false, a commented column needs a separate comment statement.
    fn comment_is_inline(&self) -> bool {
        true
    }

    /// Returns whether this dialect can alter a column in place.
    fn supports_alter_column(&self) -> bool {
        true
    }

    /// Returns whether `ADD <column>` may carry an inline UNIQUE.
    ///
    /// When false, column uniqueness is always a separate named index.
    fn supports_unique_on_add_column(&self) -> bool {
        true
    }

    /// Returns whether `DROP COLUMN` can be guarded with `IF EXISTS`.
    fn supports_drop_column_guard(&self) -> bool {
        false
    }

    /// Generates the column definition used inside `CREATE TABLE` and `ADD`.
    ///
    /// A relation is not part of it: `create_table` and `add_fk` render
    /// foreign keys under their derived constraint name.
    fn column_definition(&self, column: &ColumnSchema) -> String;

    /// Generates `CREATE TABLE` for a table, including its indexes and foreign
    /// keys. Dialects that need separate index statements append them after
    /// `;`.
    fn create_table(&self, table: &TableSchema) -> Result<String>;

    /// Generates SQL for dropping a table.
    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_identifier(table))
    }

    /// Generates SQL for adding a column.
    fn add_column(&self, table: &str, column: &ColumnSchema) -> String {
        let definition = if column.unique && !self.supports_unique_on_add_column() {
            self.column_definition(&ColumnSchema {
                unique: false,
                ..column.clone()
            })
        } else {
            self.column_definition(column)
        };
        format!(
            "ALTER TABLE {} ADD {}",
            self.quote_identifier(table),
            definition
        )
    }

    /// Generates SQL for dropping a column.
    fn drop_column(&self, table: &str, column: &str) -> String {
        let guard = if self.supports_drop_column_guard() {
            "IF EXISTS "
        } else {
            ""
        };
        format!(
            "ALTER TABLE {} DROP COLUMN {}{}",
            self.quote_identifier(table),
            guard,
            self.quote_identifier(column)
        )
    }

    /// Generates SQL changing the type of a column to that of `column`.
    fn modify_column(&self, table: &str, column: &ColumnSchema) -> Result<String>;

    /// Generates SQL setting (or dropping) the default of a column.
    fn alter_column_default(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        if !self.supports_alter_column() {
            return Err(MigrateError::unsupported(
                self.name(),
                format!("alter default of {table}.{}", column.name),
            ));
        }
        let action = match self.render_default(&column.default) {
            Some(value) => format!("SET DEFAULT {value}"),
            None => "DROP DEFAULT".to_string(),
        };
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} {}",
            self.quote_identifier(table),
            self.quote_identifier(&column.name),
            action
        ))
    }

    /// Generates SQL changing the nullability of a column.
    fn alter_column_null(&self, table: &str, column: &ColumnSchema) -> Result<String>;

    /// Generates SQL setting the comment of a column.
    fn set_comment(&self, table: &str, column: &ColumnSchema) -> Result<String>;

    /// Name of the index backing a column-level UNIQUE.
    fn column_unique_name(&self, table: &str, column: &str) -> String;

    /// Generates SQL making a single column unique.
    fn add_column_unique(&self, table: &str, column: &ColumnSchema) -> Result<String>;

    /// Generates SQL removing the uniqueness of a single column.
    fn drop_column_unique(&self, table: &str, column: &ColumnSchema) -> Result<String>;

    /// Generates SQL for creating an index on an existing table.
    fn add_index(&self, table: &str, index: &IndexSchema) -> Result<String>;

    /// Generates SQL for dropping an index.
    fn drop_index(&self, table: &str, index: &IndexSchema) -> String;

    /// Generates SQL for adding a foreign key constraint to `table.column`.
    fn add_fk(&self, table: &str, column: &str, foreign_key: &ForeignKeySchema) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            self.quote_identifier(table),
            self.quote_identifier(&foreign_key.constraint_name(table, column)),
            self.quote_identifier(column),
            self.quote_identifier(&foreign_key.references_table),
            self.quote_identifier(&foreign_key.references_column),
            foreign_key.on_delete.to_sql()
        )
    }

    /// Generates SQL for dropping the foreign key constraint of `table.column`.
    fn drop_fk(&self, table: &str, column: &str, foreign_key: &ForeignKeySchema) -> String;

    /// Checks that an explicitly supplied identifier fits this dialect.
    fn check_identifier(&self, name: &str) -> Result<()> {
        if name.len() > self.max_identifier_length() {
            return Err(MigrateError::MalformedDescription(format!(
                "Identifier '{name}' exceeds the {}-byte limit of {}",
                self.max_identifier_length(),
                self.name()
            )));
        }
        Ok(())
    }

    /// Generates the statements for one change operator.
    ///
    /// An empty list means the dialect has nothing to store for this change
    /// (a comment on a dialect without comments).
    fn emit(&self, operator: &ChangeOperator) -> Result<Vec<String>> {
        debug!(dialect = self.name(), operator = %operator.description(), "Emitting");
        let statements = match operator {
            ChangeOperator::AddTable { table } => vec![self.create_table(table)?],
            ChangeOperator::DropTable { table } => vec![self.drop_table(&table.name)],
            ChangeOperator::AddColumn { table, column } => {
                let mut sql = vec![self.add_column(table, column)];
                if column.unique && !self.supports_unique_on_add_column() {
                    sql.push(self.add_column_unique(table, column)?);
                }
                if column.comment.is_some() && self.supports_comments() && !self.comment_is_inline()
                {
                    sql.push(self.set_comment(table, column)?);
                }
                sql
            }
            ChangeOperator::DropColumn { table, column } => {
                let mut sql = Vec::with_capacity(2);
                if column.unique && !self.supports_unique_on_add_column() {
                    sql.push(self.drop_column_unique(table, column)?);
                }
                sql.push(self.drop_column(table, &column.name));
                sql
            }
            ChangeOperator::ModifyColumn { table, new, .. } => {
                vec![self.modify_column(table, new)?]
            }
            ChangeOperator::AlterDefault { table, new, .. } => {
                vec![self.alter_column_default(table, new)?]
            }
            ChangeOperator::AlterNullability { table, new, .. } => {
                vec![self.alter_column_null(table, new)?]
            }
            ChangeOperator::SetComment { table, new, .. } => {
                if self.supports_comments() {
                    vec![self.set_comment(table, new)?]
                } else {
                    warn!(
                        dialect = self.name(),
                        "Skipping comment change on {}.{}: not stored by this dialect",
                        table,
                        new.name
                    );
                    Vec::new()
                }
            }
            ChangeOperator::AlterUnique { table, new, .. } => {
                if new.unique {
                    vec![self.add_column_unique(table, new)?]
                } else {
                    vec![self.drop_column_unique(table, new)?]
                }
            }
            ChangeOperator::AddIndex { table, index } => vec![self.add_index(table, index)?],
            ChangeOperator::DropIndex { table, index } => vec![self.drop_index(table, index)],
            ChangeOperator::AddForeignKey {
                table,
                column,
                foreign_key,
            } => vec![self.add_fk(table, column, foreign_key)],
            ChangeOperator::DropForeignKey {
                table,
                column,
                foreign_key,
            } => vec![self.drop_fk(table, column, foreign_key)],
            ChangeOperator::AddM2M { m2m } => vec![self.create_table(&m2m.junction_table())?],
            ChangeOperator::DropM2M { m2m } => vec![self.drop_table(&m2m.through)],
        };
        Ok(statements)
    }
}

/// Quotes a string literal, doubling embedded single quotes.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Joins quoted column names with `, `.
pub(crate) fn quoted_columns<D: MigrationDialect + ?Sized>(
    dialect: &D,
    columns: &[String],
) -> String {
    columns
        .iter()
        .map(|c| dialect.quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Per-dialect switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectOptions {
    /// MySQL: embed typed (full-text, spatial, hash) indexes in `CREATE TABLE`
    /// instead of appending separate `CREATE INDEX` statements.
    pub mysql_inline_indexes: bool,
    /// MySQL: table character set used when a table declares none.
    pub charset: String,
}

impl Default for DialectOptions {
    fn default() -> Self {
        Self {
            mysql_inline_indexes: true,
            charset: "utf8mb4".to_string(),
        }
    }
}

/// Names a supported dialect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// MySQL and MariaDB.
    Mysql,
    /// PostgreSQL.
    #[default]
    Postgres,
    /// SQLite.
    Sqlite,
}

impl DialectKind {
    /// Builds the dialect this kind names.
    #[must_use]
    pub fn build(self, options: &DialectOptions) -> Box<dyn MigrationDialect> {
        match self {
            Self::Mysql => Box::new(
                MysqlDialect::new()
                    .inline_indexes(options.mysql_inline_indexes)
                    .charset(options.charset.clone()),
            ),
            Self::Postgres => Box::new(PostgresDialect::new()),
            Self::Sqlite => Box::new(SqliteDialect::new()),
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(MigrateError::UnknownDialect(s.to_string())),
        }
    }
}
