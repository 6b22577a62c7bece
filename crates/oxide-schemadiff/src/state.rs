//! Schema-level application of change operators.
//!
//! [`SchemaState`] replays operators against an app description without a
//! database. Applying a plan's upgrade to the old schema must yield the new
//! schema, and applying the downgrade must yield the old one again.

use crate::error::{MigrateError, Result};
use crate::operations::ChangeOperator;
use crate::schema::{AppSchema, ColumnSchema, TableSchema};

/// An app schema that operators can be applied to.
#[derive(Debug, Clone, Default)]
pub struct SchemaState {
    schema: AppSchema,
}

impl SchemaState {
    /// Creates a new empty schema state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing schema.
    #[must_use]
    pub fn from_schema(schema: AppSchema) -> Self {
        Self { schema }
    }

    /// Returns the current schema.
    #[must_use]
    pub fn schema(&self) -> &AppSchema {
        &self.schema
    }

    /// Consumes and returns the schema.
    #[must_use]
    pub fn into_schema(self) -> AppSchema {
        self.schema
    }

    /// Applies operators in order, stopping at the first one that does not fit.
    pub fn apply_all<'a>(
        &mut self,
        operators: impl IntoIterator<Item = &'a ChangeOperator>,
    ) -> Result<()> {
        for operator in operators {
            self.apply_operator(operator)?;
        }
        Ok(())
    }

    /// Applies a single operator.
    ///
    /// Column alterations only touch their own dimension of the column.
    pub fn apply_operator(&mut self, operator: &ChangeOperator) -> Result<()> {
        match operator {
            ChangeOperator::AddTable { table } => {
                if self.schema.get_table(&table.name).is_some() {
                    return Err(MigrateError::InvalidState(format!(
                        "Table '{}' already exists",
                        table.name
                    )));
                }
                self.schema.tables.push(table.clone());
            }

            ChangeOperator::DropTable { table } => {
                let idx = self
                    .schema
                    .tables
                    .iter()
                    .position(|t| t.name == table.name)
                    .ok_or_else(|| missing_table(&table.name))?;
                self.schema.tables.remove(idx);
            }

            ChangeOperator::AddColumn { table, column } => {
                let t = self.table_mut(table)?;
                if t.get_column(&column.name).is_some() {
                    return Err(MigrateError::InvalidState(format!(
                        "Column '{}' already exists in table '{}'",
                        column.name, table
                    )));
                }
                t.columns.push(column.clone());
            }

            ChangeOperator::DropColumn { table, column } => {
                let t = self.table_mut(table)?;
                let idx = t
                    .columns
                    .iter()
                    .position(|c| c.name == column.name)
                    .ok_or_else(|| missing_column(table, &column.name))?;
                t.columns.remove(idx);
            }

            ChangeOperator::ModifyColumn { table, new, .. } => {
                self.column_mut(table, &new.name)?.sql_type = new.sql_type.clone();
            }

            ChangeOperator::AlterDefault { table, new, .. } => {
                self.column_mut(table, &new.name)?.default = new.default.clone();
            }

            ChangeOperator::AlterNullability { table, new, .. } => {
                self.column_mut(table, &new.name)?.nullable = new.nullable;
            }

            ChangeOperator::SetComment { table, new, .. } => {
                self.column_mut(table, &new.name)?.comment = new.comment.clone();
            }

            ChangeOperator::AlterUnique { table, new, .. } => {
                self.column_mut(table, &new.name)?.unique = new.unique;
            }

            ChangeOperator::AddIndex { table, index } => {
                let t = self.table_mut(table)?;
                let key = index.key(table);
                if t.indexes.iter().any(|i| i.key(table) == key) {
                    return Err(MigrateError::InvalidState(format!(
                        "Index over ({}) already exists on table '{}'",
                        index.columns.join(", "),
                        table
                    )));
                }
                t.indexes.push(index.clone());
            }

            ChangeOperator::DropIndex { table, index } => {
                let t = self.table_mut(table)?;
                let key = index.key(table);
                let idx = t
                    .indexes
                    .iter()
                    .position(|i| i.key(table) == key)
                    .ok_or_else(|| {
                        MigrateError::InvalidState(format!(
                            "Index '{}' does not exist on table '{}'",
                            index.name_for(table),
                            table
                        ))
                    })?;
                t.indexes.remove(idx);
            }

            ChangeOperator::AddForeignKey {
                table,
                column,
                foreign_key,
            } => {
                let c = self.column_mut(table, column)?;
                if c.relation.is_some() {
                    return Err(MigrateError::InvalidState(format!(
                        "Column '{table}.{column}' already has a foreign key"
                    )));
                }
                c.relation = Some(foreign_key.clone());
            }

            ChangeOperator::DropForeignKey { table, column, .. } => {
                let c = self.column_mut(table, column)?;
                if c.relation.take().is_none() {
                    return Err(MigrateError::InvalidState(format!(
                        "Column '{table}.{column}' has no foreign key"
                    )));
                }
            }

            ChangeOperator::AddM2M { m2m } => {
                let key = m2m.key();
                if self.schema.m2m.iter().any(|m| m.key() == key) {
                    return Err(MigrateError::InvalidState(format!(
                        "Many-to-many '{}.{}' already exists",
                        m2m.table, m2m.field
                    )));
                }
                self.schema.m2m.push(m2m.clone());
            }

            ChangeOperator::DropM2M { m2m } => {
                let key = m2m.key();
                let idx = self
                    .schema
                    .m2m
                    .iter()
                    .position(|m| m.key() == key)
                    .ok_or_else(|| {
                        MigrateError::InvalidState(format!(
                            "Many-to-many '{}.{}' does not exist",
                            m2m.table, m2m.field
                        ))
                    })?;
                self.schema.m2m.remove(idx);
            }
        }

        Ok(())
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut TableSchema> {
        self.schema
            .get_table_mut(name)
            .ok_or_else(|| missing_table(name))
    }

    fn column_mut(&mut self, table: &str, column: &str) -> Result<&mut ColumnSchema> {
        self.table_mut(table)?
            .get_column_mut(column)
            .ok_or_else(|| missing_column(table, column))
    }
}

fn missing_table(name: &str) -> MigrateError {
    MigrateError::InvalidState(format!("Table '{name}' does not exist"))
}

fn missing_column(table: &str, column: &str) -> MigrateError {
    MigrateError::InvalidState(format!(
        "Column '{column}' does not exist in table '{table}'"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ForeignKeySchema, IndexSchema, M2MSchema, SqlType};

    fn users() -> TableSchema {
        TableSchema::new("users")
            .column(ColumnSchema::new("id", SqlType::Integer).primary_key())
            .column(ColumnSchema::new("name", SqlType::Text))
    }

    #[test]
    fn test_add_and_drop_table() {
        let mut state = SchemaState::new();
        state
            .apply_operator(&ChangeOperator::AddTable { table: users() })
            .unwrap();
        assert!(state.schema().get_table("users").is_some());

        let err = state
            .apply_operator(&ChangeOperator::AddTable { table: users() })
            .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidState(_)));

        state
            .apply_operator(&ChangeOperator::DropTable { table: users() })
            .unwrap();
        assert!(state.schema().tables.is_empty());
    }

    #[test]
    fn test_alterations_touch_one_dimension() {
        let mut state = SchemaState::from_schema(AppSchema::new().table(users()));
        let old = ColumnSchema::new("name", SqlType::Text);
        // `new` also differs in nullability, which ModifyColumn must ignore.
        let new = ColumnSchema::new("name", SqlType::Varchar(50)).not_null();
        state
            .apply_operator(&ChangeOperator::ModifyColumn {
                table: "users".into(),
                old,
                new,
            })
            .unwrap();

        let column = state.schema().get_table("users").unwrap().get_column("name").unwrap();
        assert_eq!(column.sql_type, SqlType::Varchar(50));
        assert!(column.nullable);
    }

    #[test]
    fn test_foreign_keys() {
        let posts = TableSchema::new("posts")
            .column(ColumnSchema::new("id", SqlType::Integer).primary_key())
            .column(ColumnSchema::new("user_id", SqlType::Integer));
        let mut state = SchemaState::from_schema(AppSchema::new().table(users()).table(posts));
        let add = ChangeOperator::AddForeignKey {
            table: "posts".into(),
            column: "user_id".into(),
            foreign_key: ForeignKeySchema::new("users", "id"),
        };
        state.apply_operator(&add).unwrap();
        assert!(state.apply_operator(&add).is_err());
        state.apply_operator(&add.reverse()).unwrap();
        assert!(state.apply_operator(&add.reverse()).is_err());
    }

    #[test]
    fn test_indexes_and_m2m() {
        let mut state = SchemaState::from_schema(AppSchema::new().table(users()));
        let ops = [
            ChangeOperator::AddIndex {
                table: "users".into(),
                index: IndexSchema::new(["name"]),
            },
            ChangeOperator::AddM2M {
                m2m: M2MSchema::new("friends", "users", "users").through("friendship"),
            },
        ];
        state.apply_all(&ops).unwrap();
        assert_eq!(state.schema().tables[0].indexes.len(), 1);
        assert_eq!(state.schema().m2m.len(), 1);

        let reversed: Vec<ChangeOperator> = ops.iter().rev().map(ChangeOperator::reverse).collect();
        state.apply_all(&reversed).unwrap();
        assert!(state.schema().tables[0].indexes.is_empty());
        assert!(state.into_schema().m2m.is_empty());
    }

    #[test]
    fn test_missing_targets() {
        let mut state = SchemaState::new();
        let err = state
            .apply_operator(&ChangeOperator::DropColumn {
                table: "users".into(),
                column: ColumnSchema::new("name", SqlType::Text),
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid schema state: Table 'users' does not exist"
        );
    }
}
