//! SQLite dialect for migrations.
//!
//! SQLite has limited ALTER TABLE support: columns can be added and dropped
//! but never altered in place, so type, default, nullability and comment
//! changes are reported as unsupported. Column comments are kept as SQL
//! comments in the table definition, which SQLite does not store as
//! metadata.
//!
//! Column-level uniqueness is always a named unique index rather than an
//! inline `UNIQUE`, because an inline constraint cannot be dropped later.

use crate::error::{MigrateError, Result};
use crate::schema::{ColumnSchema, ForeignKeySchema, IndexSchema, SqlType, TableSchema};

use super::{quoted_columns, MigrationDialect};

/// SQLite migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn create_index(&self, table: &str, index: &IndexSchema, if_not_exists: bool) -> String {
        let mut sql = String::from("CREATE ");
        if index.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        if if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.quote_identifier(&index.name_for(table)));
        sql.push_str(" ON ");
        sql.push_str(&self.quote_identifier(table));
        sql.push_str(" (");
        sql.push_str(&quoted_columns(self, &index.columns));
        sql.push(')');
        sql
    }

    fn unique_index(column: &ColumnSchema) -> IndexSchema {
        IndexSchema::new([column.name.as_str()]).unique()
    }

    /// Column definition. Inside `CREATE TABLE` (`table` set) a relation
    /// becomes an inline constraint carrying the derived foreign key name.
    fn table_column(&self, table: Option<&str>, column: &ColumnSchema) -> String {
        let name = self.quote_identifier(&column.name);
        let mut sql = if column.primary_key && column.auto_increment {
            format!("{name} INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL")
        } else {
            let mut sql = format!("{name} {}", self.type_name(&column.sql_type));
            if !column.nullable {
                sql.push_str(" NOT NULL");
            }
            if column.primary_key {
                sql.push_str(" PRIMARY KEY");
            }
            sql
        };

        if let Some(default) = self.render_default(&column.default) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default);
        }
        if let (Some(table), Some(fk)) = (table, &column.relation) {
            sql.push_str(&format!(
                " CONSTRAINT {} REFERENCES {} ({}) ON DELETE {}",
                self.quote_identifier(&fk.constraint_name(table, &column.name)),
                self.quote_identifier(&fk.references_table),
                self.quote_identifier(&fk.references_column),
                fk.on_delete.to_sql()
            ));
        }
        if let Some(comment) = &column.comment {
            sql.push_str(&format!(" /* {} */", comment.replace("*/", "* /")));
        }
        sql
    }

    fn unsupported(&self, what: &str, table: &str, column: &ColumnSchema) -> MigrateError {
        MigrateError::unsupported(self.name(), format!("{what} of {table}.{}", column.name))
    }
}

impl MigrationDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn type_name(&self, sql_type: &SqlType) -> String {
        match sql_type {
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer | SqlType::Boolean => "INT".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Varchar(n) => format!("VARCHAR({n})"),
            SqlType::Char(n) => format!("CHAR({n})"),
            SqlType::Text => "TEXT".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::Real | SqlType::Double => "REAL".to_string(),
            // Stored as text to keep exact precision
            SqlType::Decimal(_, _) => "VARCHAR(40)".to_string(),
            SqlType::Blob => "BLOB".to_string(),
            SqlType::Json => "JSON".to_string(),
            SqlType::Uuid => "CHAR(36)".to_string(),
            SqlType::Custom(name) => name.clone(),
        }
    }

    fn max_identifier_length(&self) -> usize {
        usize::MAX
    }

    fn supports_comments(&self) -> bool {
        false
    }

    fn supports_alter_column(&self) -> bool {
        false
    }

    fn supports_unique_on_add_column(&self) -> bool {
        false
    }

    fn column_definition(&self, column: &ColumnSchema) -> String {
        self.table_column(None, column)
    }

    fn create_table(&self, table: &TableSchema) -> Result<String> {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.table_column(Some(&table.name), c))
            .collect();
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.quote_identifier(&table.name),
            columns.join(",\n    ")
        )];

        for column in table.columns.iter().filter(|c| c.unique && !c.primary_key) {
            statements.push(self.create_index(&table.name, &Self::unique_index(column), true));
        }
        for index in &table.indexes {
            statements.push(self.create_index(&table.name, index, true));
        }

        Ok(statements.join(";\n"))
    }

    fn modify_column(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Err(self.unsupported("modify column", table, column))
    }

    fn alter_column_null(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Err(self.unsupported("alter nullability", table, column))
    }

    fn set_comment(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Err(self.unsupported("set comment", table, column))
    }

    fn column_unique_name(&self, table: &str, column: &str) -> String {
        IndexSchema::new([column]).unique().name_for(table)
    }

    fn add_column_unique(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Ok(self.create_index(table, &Self::unique_index(column), false))
    }

    fn drop_column_unique(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Ok(format!(
            "DROP INDEX IF EXISTS {}",
            self.quote_identifier(&self.column_unique_name(table, &column.name))
        ))
    }

    /// Index types are ignored: SQLite only has B-tree indexes.
    fn add_index(&self, table: &str, index: &IndexSchema) -> Result<String> {
        Ok(self.create_index(table, index, false))
    }

    fn drop_index(&self, table: &str, index: &IndexSchema) -> String {
        format!(
            "DROP INDEX IF EXISTS {}",
            self.quote_identifier(&index.name_for(table))
        )
    }

    fn drop_fk(&self, table: &str, column: &str, foreign_key: &ForeignKeySchema) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote_identifier(table),
            self.quote_identifier(&foreign_key.constraint_name(table, column))
        )
    }
}
