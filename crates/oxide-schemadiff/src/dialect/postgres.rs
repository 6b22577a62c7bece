//! PostgreSQL dialect for migrations.

use crate::error::{MigrateError, Result};
use crate::schema::{ColumnSchema, ForeignKeySchema, IndexSchema, IndexType, SqlType, TableSchema};

use super::{quote_literal, quoted_columns, MigrationDialect};

/// PostgreSQL dialect for migration SQL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn create_index(&self, table: &str, index: &IndexSchema) -> Result<String> {
        let method = match index.index_type {
            IndexType::BTree => "",
            IndexType::Hash => "USING HASH ",
            IndexType::Gin => "USING GIN ",
            IndexType::Gist => "USING GIST ",
            IndexType::FullText | IndexType::Spatial => {
                return Err(MigrateError::unsupported(
                    self.name(),
                    format!(
                        "{:?} index on {table} ({})",
                        index.index_type,
                        index.columns.join(", ")
                    ),
                ))
            }
        };
        let name = index.name_for(table);
        self.check_identifier(&name)?;
        Ok(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} {method}({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&name),
            self.quote_identifier(table),
            quoted_columns(self, &index.columns)
        ))
    }

    /// Column definition inside `CREATE TABLE`. A relation becomes an inline
    /// constraint carrying the derived foreign key name.
    fn table_column(&self, table: &str, column: &ColumnSchema) -> String {
        let mut sql = self.column_definition(column);
        if let Some(fk) = &column.relation {
            sql.push_str(&format!(
                " CONSTRAINT {} REFERENCES {} ({}) ON DELETE {}",
                self.quote_identifier(&fk.constraint_name(table, &column.name)),
                self.quote_identifier(&fk.references_table),
                self.quote_identifier(&fk.references_column),
                fk.on_delete.to_sql()
            ));
        }
        sql
    }

    fn comment_literal(comment: Option<&str>) -> String {
        comment.map_or_else(|| "NULL".to_string(), quote_literal)
    }
}

impl MigrationDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn type_name(&self, sql_type: &SqlType) -> String {
        match sql_type {
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INT".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Varchar(n) => format!("VARCHAR({n})"),
            SqlType::Char(n) => format!("CHAR({n})"),
            SqlType::Text => "TEXT".to_string(),
            SqlType::Boolean => "BOOL".to_string(),
            SqlType::Timestamp => "TIMESTAMPTZ".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIMETZ".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Decimal(p, s) => format!("DECIMAL({p},{s})"),
            SqlType::Blob => "BYTEA".to_string(),
            SqlType::Json => "JSONB".to_string(),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::Custom(name) => name.clone(),
        }
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn max_identifier_length(&self) -> usize {
        63
    }

    fn comment_is_inline(&self) -> bool {
        false
    }

    fn supports_drop_column_guard(&self) -> bool {
        true
    }

    fn column_definition(&self, column: &ColumnSchema) -> String {
        // SERIAL types carry the sequence for auto-increment
        let data_type = if column.auto_increment {
            match column.sql_type {
                SqlType::SmallInt => "SMALLSERIAL".to_string(),
                SqlType::Integer => "SERIAL".to_string(),
                SqlType::BigInt => "BIGSERIAL".to_string(),
                _ => self.type_name(&column.sql_type),
            }
        } else {
            self.type_name(&column.sql_type)
        };

        let mut sql = format!("{} {}", self.quote_identifier(&column.name), data_type);
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if column.unique && !column.primary_key {
            sql.push_str(" UNIQUE");
        }
        if column.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if let Some(default) = self.render_default(&column.default) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default);
        }
        sql
    }

    fn create_table(&self, table: &TableSchema) -> Result<String> {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.table_column(&table.name, c))
            .collect();
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.quote_identifier(&table.name),
            columns.join(",\n    ")
        )];

        for index in &table.indexes {
            statements.push(self.create_index(&table.name, index)?);
        }
        if let Some(comment) = &table.comment {
            statements.push(format!(
                "COMMENT ON TABLE {} IS {}",
                self.quote_identifier(&table.name),
                quote_literal(comment)
            ));
        }
        for column in table.columns.iter().filter(|c| c.comment.is_some()) {
            statements.push(self.set_comment(&table.name, column)?);
        }

        Ok(statements.join(";\n"))
    }

    fn modify_column(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        let type_name = self.type_name(&column.sql_type);
        let name = self.quote_identifier(&column.name);
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {name} TYPE {type_name} USING {name}::{type_name}",
            self.quote_identifier(table)
        ))
    }

    fn alter_column_null(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL",
            self.quote_identifier(table),
            self.quote_identifier(&column.name),
            if column.nullable { "DROP" } else { "SET" }
        ))
    }

    fn set_comment(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Ok(format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.quote_identifier(table),
            self.quote_identifier(&column.name),
            Self::comment_literal(column.comment.as_deref())
        ))
    }

    /// PostgreSQL names an inline UNIQUE constraint `{table}_{column}_key`.
    fn column_unique_name(&self, table: &str, column: &str) -> String {
        format!("{table}_{column}_key")
    }

    fn add_column_unique(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            self.quote_identifier(table),
            self.quote_identifier(&self.column_unique_name(table, &column.name)),
            self.quote_identifier(&column.name)
        ))
    }

    fn drop_column_unique(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
            self.quote_identifier(table),
            self.quote_identifier(&self.column_unique_name(table, &column.name))
        ))
    }

    fn add_index(&self, table: &str, index: &IndexSchema) -> Result<String> {
        self.create_index(table, index)
    }

    fn drop_index(&self, table: &str, index: &IndexSchema) -> String {
        format!(
            "DROP INDEX IF EXISTS {}",
            self.quote_identifier(&index.name_for(table))
        )
    }

    fn drop_fk(&self, table: &str, column: &str, foreign_key: &ForeignKeySchema) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
            self.quote_identifier(table),
            self.quote_identifier(&foreign_key.constraint_name(table, column))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DefaultValue;

    #[test]
    fn test_serial_types() {
        let pg = PostgresDialect::new();
        let id = ColumnSchema::new("id", SqlType::BigInt).primary_key().auto_increment();
        assert_eq!(pg.column_definition(&id), "\"id\" BIGSERIAL NOT NULL PRIMARY KEY");
        let id = ColumnSchema::new("id", SqlType::SmallInt).primary_key().auto_increment();
        assert_eq!(pg.column_definition(&id), "\"id\" SMALLSERIAL NOT NULL PRIMARY KEY");
    }

    #[test]
    fn test_modify_column_casts() {
        let col = ColumnSchema::new("is_active", SqlType::Boolean)
            .not_null()
            .default(DefaultValue::Bool(true));
        assert_eq!(
            PostgresDialect::new().modify_column("user", &col).unwrap(),
            "ALTER TABLE \"user\" ALTER COLUMN \"is_active\" TYPE BOOL USING \"is_active\"::BOOL"
        );
    }

    #[test]
    fn test_alter_null_both_ways() {
        let pg = PostgresDialect::new();
        let col = ColumnSchema::new("name", SqlType::Varchar(200));
        assert_eq!(
            pg.alter_column_null("category", &col).unwrap(),
            "ALTER TABLE \"category\" ALTER COLUMN \"name\" DROP NOT NULL"
        );
        assert_eq!(
            pg.alter_column_null("category", &col.not_null()).unwrap(),
            "ALTER TABLE \"category\" ALTER COLUMN \"name\" SET NOT NULL"
        );
    }

    #[test]
    fn test_alter_default() {
        let pg = PostgresDialect::new();
        let col = ColumnSchema::new("view_num", SqlType::Integer).default(DefaultValue::Integer(0));
        assert_eq!(
            pg.alter_column_default("product", &col).unwrap(),
            "ALTER TABLE \"product\" ALTER COLUMN \"view_num\" SET DEFAULT 0"
        );
        let col = ColumnSchema::new("view_num", SqlType::Integer);
        assert_eq!(
            pg.alter_column_default("product", &col).unwrap(),
            "ALTER TABLE \"product\" ALTER COLUMN \"view_num\" DROP DEFAULT"
        );
    }

    #[test]
    fn test_gin_index() {
        let index = IndexSchema::new(["tags"]).index_type(IndexType::Gin);
        assert_eq!(
            PostgresDialect::new().add_index("post", &index).unwrap(),
            format!(
                "CREATE INDEX IF NOT EXISTS \"{}\" ON \"post\" USING GIN (\"tags\")",
                index.name_for("post")
            )
        );
    }

    #[test]
    fn test_fulltext_unsupported() {
        let index = IndexSchema::new(["body"]).index_type(IndexType::FullText);
        assert!(PostgresDialect::new().add_index("post", &index).is_err());
    }

    #[test]
    fn test_table_comment() {
        let table = TableSchema::new("tag")
            .column(ColumnSchema::new("id", SqlType::Integer).primary_key().auto_increment())
            .comment("Tags");
        assert_eq!(
            PostgresDialect::new().create_table(&table).unwrap(),
            "CREATE TABLE IF NOT EXISTS \"tag\" (\n    \"id\" SERIAL NOT NULL PRIMARY KEY\n);\n\
             COMMENT ON TABLE \"tag\" IS 'Tags'"
        );
    }

    #[test]
    fn test_column_unique() {
        let pg = PostgresDialect::new();
        let col = ColumnSchema::new("email", SqlType::Varchar(100)).unique();
        assert_eq!(
            pg.add_column_unique("user", &col).unwrap(),
            "ALTER TABLE \"user\" ADD CONSTRAINT \"user_email_key\" UNIQUE (\"email\")"
        );
        assert_eq!(
            pg.drop_column_unique("user", &col).unwrap(),
            "ALTER TABLE \"user\" DROP CONSTRAINT IF EXISTS \"user_email_key\""
        );
    }
}
