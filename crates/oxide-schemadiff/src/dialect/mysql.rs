//! MySQL dialect for migrations.
//!
//! MySQL stores comments inline in the column definition, so any change to
//! nullability or comment is a full `MODIFY COLUMN` that restates the whole
//! definition.

use crate::error::{MigrateError, Result};
use crate::schema::{ColumnSchema, ForeignKeySchema, IndexSchema, IndexType, SqlType, TableSchema};

use super::{quote_literal, quoted_columns, MigrationDialect};

/// MySQL (and MariaDB) migration dialect.
#[derive(Debug, Clone)]
pub struct MysqlDialect {
    inline_indexes: bool,
    charset: String,
}

impl Default for MysqlDialect {
    fn default() -> Self {
        Self {
            inline_indexes: true,
            charset: "utf8mb4".to_string(),
        }
    }
}

impl MysqlDialect {
    /// Creates a new MySQL dialect with inline indexes and `utf8mb4`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Chooses whether typed indexes are embedded in `CREATE TABLE`.
    #[must_use]
    pub fn inline_indexes(mut self, inline: bool) -> Self {
        self.inline_indexes = inline;
        self
    }

    /// Sets the default table character set.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Column definition for `MODIFY COLUMN`: uniqueness and the primary key
    /// are left alone, they are not part of what is being changed.
    fn modify_definition(&self, column: &ColumnSchema) -> String {
        self.column_definition(&ColumnSchema {
            unique: false,
            primary_key: false,
            relation: None,
            ..column.clone()
        })
    }

    fn check_index_type(&self, table: &str, index: &IndexSchema) -> Result<()> {
        match index.index_type {
            IndexType::Gin | IndexType::Gist => Err(MigrateError::unsupported(
                self.name(),
                format!(
                    "{:?} index on {table} ({})",
                    index.index_type,
                    index.columns.join(", ")
                ),
            )),
            _ => Ok(()),
        }
    }

    /// `KEY ...` clause inside `CREATE TABLE`.
    fn inline_index(&self, table: &str, index: &IndexSchema) -> String {
        let keyword = match (index.index_type, index.unique) {
            (IndexType::FullText, _) => "FULLTEXT KEY",
            (IndexType::Spatial, _) => "SPATIAL KEY",
            (_, true) => "UNIQUE KEY",
            (_, false) => "KEY",
        };
        let mut sql = format!(
            "{keyword} {} ({})",
            self.quote_identifier(&index.name_for(table)),
            quoted_columns(self, &index.columns)
        );
        if index.index_type == IndexType::Hash {
            sql.push_str(" USING HASH");
        }
        sql
    }

    /// Standalone `CREATE ... INDEX` statement.
    fn create_index(&self, table: &str, index: &IndexSchema) -> String {
        let kind = match (index.index_type, index.unique) {
            (IndexType::FullText, _) => "FULLTEXT ",
            (IndexType::Spatial, _) => "SPATIAL ",
            (_, true) => "UNIQUE ",
            (_, false) => "",
        };
        let mut sql = format!(
            "CREATE {kind}INDEX {} ON {} ({})",
            self.quote_identifier(&index.name_for(table)),
            self.quote_identifier(table),
            quoted_columns(self, &index.columns)
        );
        if index.index_type == IndexType::Hash {
            sql.push_str(" USING HASH");
        }
        sql
    }

    fn table_suffix(&self, table: &TableSchema) -> String {
        let mut suffix = String::new();
        if let Some(engine) = &table.options.engine {
            suffix.push_str(&format!("ENGINE={engine} "));
        }
        let charset = table.options.charset.as_deref().unwrap_or(&self.charset);
        suffix.push_str(&format!("CHARACTER SET {charset}"));
        if let Some(collation) = &table.options.collation {
            suffix.push_str(&format!(" COLLATE {collation}"));
        }
        if let Some(comment) = &table.comment {
            suffix.push_str(&format!(" COMMENT={}", quote_literal(comment)));
        }
        suffix
    }
}

impl MigrationDialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn type_name(&self, sql_type: &SqlType) -> String {
        match sql_type {
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INT".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Varchar(n) => format!("VARCHAR({n})"),
            SqlType::Char(n) => format!("CHAR({n})"),
            SqlType::Text => "LONGTEXT".to_string(),
            SqlType::Boolean => "BOOL".to_string(),
            SqlType::Timestamp => "DATETIME(6)".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME(6)".to_string(),
            SqlType::Real => "FLOAT".to_string(),
            SqlType::Double => "DOUBLE".to_string(),
            SqlType::Decimal(p, s) => format!("DECIMAL({p},{s})"),
            SqlType::Blob => "LONGBLOB".to_string(),
            SqlType::Json => "JSON".to_string(),
            SqlType::Uuid => "CHAR(36)".to_string(),
            SqlType::Custom(name) => name.clone(),
        }
    }

    fn now_literal(&self) -> &'static str {
        "CURRENT_TIMESTAMP(6)"
    }

    fn max_identifier_length(&self) -> usize {
        64
    }

    fn column_definition(&self, column: &ColumnSchema) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.type_name(&column.sql_type)
        );
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if column.unique && !column.primary_key {
            sql.push_str(" UNIQUE");
        }
        if column.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if column.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        if let Some(comment) = &column.comment {
            sql.push_str(" COMMENT ");
            sql.push_str(&quote_literal(comment));
        }
        if let Some(default) = self.render_default(&column.default) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default);
        }
        sql
    }

    fn create_table(&self, table: &TableSchema) -> Result<String> {
        for index in &table.indexes {
            self.check_index_type(&table.name, index)?;
            if let Some(name) = &index.name {
                self.check_identifier(name)?;
            }
        }

        let mut items: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();

        for (column, fk) in table.relations() {
            items.push(format!(
                "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
                self.quote_identifier(&fk.constraint_name(&table.name, &column.name)),
                self.quote_identifier(&column.name),
                self.quote_identifier(&fk.references_table),
                self.quote_identifier(&fk.references_column),
                fk.on_delete.to_sql()
            ));
        }

        let mut trailing = Vec::new();
        for index in &table.indexes {
            let typed = index.index_type != IndexType::BTree;
            if typed && !self.inline_indexes {
                trailing.push(self.create_index(&table.name, index));
            } else {
                items.push(self.inline_index(&table.name, index));
            }
        }

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n) {}",
            self.quote_identifier(&table.name),
            items.join(",\n    "),
            self.table_suffix(table)
        );
        for statement in trailing {
            sql.push_str(";\n");
            sql.push_str(&statement);
        }
        Ok(sql)
    }

    fn modify_column(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.quote_identifier(table),
            self.modify_definition(column)
        ))
    }

    fn alter_column_null(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        self.modify_column(table, column)
    }

    fn set_comment(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        self.modify_column(table, column)
    }

    /// MySQL names the index behind an inline UNIQUE after the column.
    fn column_unique_name(&self, _table: &str, column: &str) -> String {
        column.to_string()
    }

    fn add_column_unique(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD UNIQUE INDEX {} ({})",
            self.quote_identifier(table),
            self.quote_identifier(&self.column_unique_name(table, &column.name)),
            self.quote_identifier(&column.name)
        ))
    }

    fn drop_column_unique(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP INDEX {}",
            self.quote_identifier(table),
            self.quote_identifier(&self.column_unique_name(table, &column.name))
        ))
    }

    fn add_index(&self, table: &str, index: &IndexSchema) -> Result<String> {
        self.check_index_type(table, index)?;
        let name = index.name_for(table);
        self.check_identifier(&name)?;
        let kind = match (index.index_type, index.unique) {
            (IndexType::FullText, _) => "FULLTEXT ",
            (IndexType::Spatial, _) => "SPATIAL ",
            (_, true) => "UNIQUE ",
            (_, false) => "",
        };
        let mut sql = format!(
            "ALTER TABLE {} ADD {kind}INDEX {} ({})",
            self.quote_identifier(table),
            self.quote_identifier(&name),
            quoted_columns(self, &index.columns)
        );
        if index.index_type == IndexType::Hash {
            sql.push_str(" USING HASH");
        }
        Ok(sql)
    }

    fn drop_index(&self, table: &str, index: &IndexSchema) -> String {
        format!(
            "ALTER TABLE {} DROP INDEX {}",
            self.quote_identifier(table),
            self.quote_identifier(&index.name_for(table))
        )
    }

    /// MySQL has no `IF EXISTS` for foreign keys.
    fn drop_fk(&self, table: &str, column: &str, foreign_key: &ForeignKeySchema) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote_identifier(table),
            self.quote_identifier(&foreign_key.constraint_name(table, column))
        )
    }
}
