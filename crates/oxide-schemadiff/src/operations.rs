//! Change operators.
//!
//! A [`ChangeOperator`] is one atomic structural change. Every operator
//! carries enough of the schema description to be emitted in either
//! direction, so [`ChangeOperator::reverse`] is total: reversing never
//! needs to look the schema up again.

use serde::{Deserialize, Serialize};

use crate::schema::{ColumnSchema, ForeignKeySchema, IndexSchema, M2MSchema, TableSchema};

/// A single structural change to an app's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeOperator {
    /// Create a table, with its indexes and foreign keys.
    AddTable {
        /// Full table description.
        table: TableSchema,
    },

    /// Drop a table.
    DropTable {
        /// Full table description (for reversal).
        table: TableSchema,
    },

    /// Add a column to a table. Relations are added separately.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition, without relation.
        column: ColumnSchema,
    },

    /// Drop a column from a table.
    DropColumn {
        /// Table name.
        table: String,
        /// Column definition (for reversal).
        column: ColumnSchema,
    },

    /// Change the type of a column.
    ModifyColumn {
        /// Table name.
        table: String,
        /// Column before the change.
        old: ColumnSchema,
        /// Column after the change.
        new: ColumnSchema,
    },

    /// Change the default of a column.
    AlterDefault {
        /// Table name.
        table: String,
        /// Column before the change.
        old: ColumnSchema,
        /// Column after the change.
        new: ColumnSchema,
    },

    /// Change the nullability of a column.
    AlterNullability {
        /// Table name.
        table: String,
        /// Column before the change.
        old: ColumnSchema,
        /// Column after the change.
        new: ColumnSchema,
    },

    /// Change the comment of a column.
    SetComment {
        /// Table name.
        table: String,
        /// Column before the change.
        old: ColumnSchema,
        /// Column after the change.
        new: ColumnSchema,
    },

    /// Add or remove the column-level UNIQUE of a column.
    AlterUnique {
        /// Table name.
        table: String,
        /// Column before the change.
        old: ColumnSchema,
        /// Column after the change.
        new: ColumnSchema,
    },

    /// Create an index.
    AddIndex {
        /// Table name.
        table: String,
        /// Index definition.
        index: IndexSchema,
    },

    /// Drop an index.
    DropIndex {
        /// Table name.
        table: String,
        /// Index definition (for reversal).
        index: IndexSchema,
    },

    /// Add a foreign key constraint on an existing column.
    AddForeignKey {
        /// Table name.
        table: String,
        /// Relation column.
        column: String,
        /// Referenced table and column.
        foreign_key: ForeignKeySchema,
    },

    /// Drop a foreign key constraint.
    DropForeignKey {
        /// Table name.
        table: String,
        /// Relation column.
        column: String,
        /// Referenced table and column (for naming and reversal).
        foreign_key: ForeignKeySchema,
    },

    /// Create a many-to-many junction table.
    AddM2M {
        /// Relation description.
        m2m: M2MSchema,
    },

    /// Drop a many-to-many junction table.
    DropM2M {
        /// Relation description (for reversal).
        m2m: M2MSchema,
    },
}

/// Coarse position of an operator in a migration.
///
/// Operators in an earlier phase never depend on operators in a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Foreign key removal.
    DropForeignKey,
    /// Junction table removal.
    DropM2M,
    /// Table removal.
    DropTable,
    /// Index (and column-level unique) removal.
    DropIndex,
    /// Column addition, removal and alteration.
    Column,
    /// Index (and column-level unique) creation.
    AddIndex,
    /// Table creation.
    AddTable,
    /// Foreign key creation.
    AddForeignKey,
    /// Junction table creation.
    AddM2M,
}

impl ChangeOperator {
    /// Returns the operator that undoes this one.
    #[must_use]
    pub fn reverse(&self) -> Self {
        match self.clone() {
            Self::AddTable { table } => Self::DropTable { table },
            Self::DropTable { table } => Self::AddTable { table },
            Self::AddColumn { table, column } => Self::DropColumn { table, column },
            Self::DropColumn { table, column } => Self::AddColumn { table, column },
            Self::ModifyColumn { table, old, new } => Self::ModifyColumn {
                table,
                old: new,
                new: old,
            },
            Self::AlterDefault { table, old, new } => Self::AlterDefault {
                table,
                old: new,
                new: old,
            },
            Self::AlterNullability { table, old, new } => Self::AlterNullability {
                table,
                old: new,
                new: old,
            },
            Self::SetComment { table, old, new } => Self::SetComment {
                table,
                old: new,
                new: old,
            },
            Self::AlterUnique { table, old, new } => Self::AlterUnique {
                table,
                old: new,
                new: old,
            },
            Self::AddIndex { table, index } => Self::DropIndex { table, index },
            Self::DropIndex { table, index } => Self::AddIndex { table, index },
            Self::AddForeignKey {
                table,
                column,
                foreign_key,
            } => Self::DropForeignKey {
                table,
                column,
                foreign_key,
            },
            Self::DropForeignKey {
                table,
                column,
                foreign_key,
            } => Self::AddForeignKey {
                table,
                column,
                foreign_key,
            },
            Self::AddM2M { m2m } => Self::DropM2M { m2m },
            Self::DropM2M { m2m } => Self::AddM2M { m2m },
        }
    }

    /// Returns the name of the table this operator touches.
    ///
    /// For many-to-many operators this is the junction table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::AddTable { table } | Self::DropTable { table } => &table.name,
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::ModifyColumn { table, .. }
            | Self::AlterDefault { table, .. }
            | Self::AlterNullability { table, .. }
            | Self::SetComment { table, .. }
            | Self::AlterUnique { table, .. }
            | Self::AddIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. } => table,
            Self::AddM2M { m2m } | Self::DropM2M { m2m } => &m2m.through,
        }
    }

    /// Returns the phase this operator belongs to.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::DropForeignKey { .. } => Phase::DropForeignKey,
            Self::DropM2M { .. } => Phase::DropM2M,
            Self::DropTable { .. } => Phase::DropTable,
            Self::DropIndex { .. } => Phase::DropIndex,
            Self::AlterUnique { new, .. } if !new.unique => Phase::DropIndex,
            Self::AlterUnique { .. } | Self::AddIndex { .. } => Phase::AddIndex,
            Self::AddColumn { .. }
            | Self::DropColumn { .. }
            | Self::ModifyColumn { .. }
            | Self::AlterDefault { .. }
            | Self::AlterNullability { .. }
            | Self::SetComment { .. } => Phase::Column,
            Self::AddTable { .. } => Phase::AddTable,
            Self::AddForeignKey { .. } => Phase::AddForeignKey,
            Self::AddM2M { .. } => Phase::AddM2M,
        }
    }

    /// Returns true if this operator destroys data.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::DropTable { .. } | Self::DropColumn { .. } | Self::DropM2M { .. }
        )
    }

    /// Returns a human-readable description of this operator.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::AddTable { table } => format!("Create table '{}'", table.name),
            Self::DropTable { table } => format!("Drop table '{}'", table.name),
            Self::AddColumn { table, column } => {
                format!("Add column '{}' to table '{}'", column.name, table)
            }
            Self::DropColumn { table, column } => {
                format!("Drop column '{}' from table '{}'", column.name, table)
            }
            Self::ModifyColumn { table, old, new } => format!(
                "Change type of '{}.{}' from {:?} to {:?}",
                table, new.name, old.sql_type, new.sql_type
            ),
            Self::AlterDefault { table, new, .. } => {
                format!("Alter default of '{}.{}'", table, new.name)
            }
            Self::AlterNullability { table, new, .. } => format!(
                "Make '{}.{}' {}",
                table,
                new.name,
                if new.nullable { "nullable" } else { "NOT NULL" }
            ),
            Self::SetComment { table, new, .. } => {
                format!("Set comment of '{}.{}'", table, new.name)
            }
            Self::AlterUnique { table, new, .. } => format!(
                "{} unique constraint on '{}.{}'",
                if new.unique { "Add" } else { "Drop" },
                table,
                new.name
            ),
            Self::AddIndex { table, index } => format!(
                "Create index '{}' on table '{}'",
                index.name_for(table),
                table
            ),
            Self::DropIndex { table, index } => format!(
                "Drop index '{}' on table '{}'",
                index.name_for(table),
                table
            ),
            Self::AddForeignKey {
                table,
                column,
                foreign_key,
            } => format!(
                "Add foreign key '{}' from '{}.{}' to '{}.{}'",
                foreign_key.constraint_name(table, column),
                table,
                column,
                foreign_key.references_table,
                foreign_key.references_column
            ),
            Self::DropForeignKey {
                table,
                column,
                foreign_key,
            } => format!(
                "Drop foreign key '{}' from table '{}'",
                foreign_key.constraint_name(table, column),
                table
            ),
            Self::AddM2M { m2m } => format!(
                "Create junction table '{}' for '{}.{}'",
                m2m.through, m2m.table, m2m.field
            ),
            Self::DropM2M { m2m } => format!(
                "Drop junction table '{}' for '{}.{}'",
                m2m.through, m2m.table, m2m.field
            ),
        }
    }
}
