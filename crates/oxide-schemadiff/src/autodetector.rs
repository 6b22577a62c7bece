//! Schema differ.
//!
//! Compares two snapshots app by app and produces the change operators
//! needed to turn the old schema into the new one. The result of a diff is
//! an explicit [`AppChanges`] value per app; nothing is accumulated across
//! calls.
//!
//! Columns are matched by name, so a renamed column shows up as a drop
//! followed by an add.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::operations::ChangeOperator;
use crate::schema::{AppSchema, ColumnSchema, M2MSchema, SchemaSnapshot, TableSchema};

/// A change the differ detects but does not migrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffWarning {
    /// A column gained or lost its primary key flag.
    PrimaryKeyChange {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// A column gained or lost auto-increment.
    AutoincrementChange {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// Table options (engine, charset, collation) or the table comment changed.
    TableOptionsChanged {
        /// Table name.
        table: String,
    },
}

impl fmt::Display for DiffWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryKeyChange { table, column } => write!(
                f,
                "Primary key change on '{table}.{column}' needs a manual migration"
            ),
            Self::AutoincrementChange { table, column } => write!(
                f,
                "Auto-increment change on '{table}.{column}' needs a manual migration"
            ),
            Self::TableOptionsChanged { table } => write!(
                f,
                "Options or comment of table '{table}' changed and are not migrated"
            ),
        }
    }
}

/// Operators for one table present in both snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct TableChanges {
    /// Table name.
    pub table: String,
    /// Operators in per-table order: foreign key drops, index drops, column
    /// drops, column alterations, column additions, index additions, foreign
    /// key additions.
    pub operators: Vec<ChangeOperator>,
}

/// Everything that changed in one app.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppChanges {
    /// App name.
    pub app: String,
    /// Tables only in the new snapshot, in declared order.
    pub created: Vec<TableSchema>,
    /// Tables only in the old snapshot, in declared order.
    pub dropped: Vec<TableSchema>,
    /// Tables in both snapshots with at least one operator.
    pub altered: Vec<TableChanges>,
    /// Junction table drops followed by junction table additions.
    pub m2m: Vec<ChangeOperator>,
    /// Detected changes that are not migrated.
    pub warnings: Vec<DiffWarning>,
}

impl AppChanges {
    fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
            ..Self::default()
        }
    }

    /// Returns true if no operator was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.dropped.is_empty()
            && self.altered.is_empty()
            && self.m2m.is_empty()
    }

    /// Returns every operator in discovery order. This order is not safe to
    /// execute as is; see [`crate::sequencer::Sequencer`].
    #[must_use]
    pub fn operators(&self) -> Vec<ChangeOperator> {
        let created = self
            .created
            .iter()
            .map(|t| ChangeOperator::AddTable { table: t.clone() });
        let altered = self
            .altered
            .iter()
            .flat_map(|t| t.operators.iter().cloned());
        let dropped = self
            .dropped
            .iter()
            .map(|t| ChangeOperator::DropTable { table: t.clone() });
        created
            .chain(altered)
            .chain(dropped)
            .chain(self.m2m.iter().cloned())
            .collect()
    }
}

/// Detects schema changes and generates change operators.
#[derive(Debug, Default)]
pub struct Autodetector;

impl Autodetector {
    /// Creates a new autodetector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compares two snapshots. Apps missing on one side are treated as empty.
    ///
    /// Both snapshots are validated first; a malformed description fails the
    /// whole diff.
    pub fn diff(&self, old: &SchemaSnapshot, new: &SchemaSnapshot) -> Result<Vec<AppChanges>> {
        old.validate()?;
        new.validate()?;

        let empty = AppSchema::default();
        let apps: std::collections::BTreeSet<&String> =
            old.apps.keys().chain(new.apps.keys()).collect();

        Ok(apps
            .into_iter()
            .map(|app| {
                let from = old.apps.get(app).unwrap_or(&empty);
                let to = new.apps.get(app).unwrap_or(&empty);
                self.diff_app(app, from, to)
            })
            .collect())
    }

    /// Compares one app. Inputs are assumed valid.
    #[must_use]
    pub fn diff_app(&self, app: &str, old: &AppSchema, new: &AppSchema) -> AppChanges {
        let mut changes = AppChanges::new(app);

        let old_tables: HashMap<&str, &TableSchema> =
            old.tables.iter().map(|t| (t.name.as_str(), t)).collect();
        let new_names: HashSet<&str> = new.table_names().collect();

        for table in &new.tables {
            match old_tables.get(table.name.as_str()) {
                None => {
                    debug!(app, table = %table.name, "New table");
                    changes.created.push(table.clone());
                }
                Some(previous) => {
                    let operators = self.diff_table(previous, table, &mut changes.warnings);
                    if !operators.is_empty() {
                        changes.altered.push(TableChanges {
                            table: table.name.clone(),
                            operators,
                        });
                    }
                }
            }
        }

        for table in &old.tables {
            if !new_names.contains(table.name.as_str()) {
                debug!(app, table = %table.name, "Dropped table");
                changes.dropped.push(table.clone());
            }
        }

        changes.m2m = self.diff_m2m(&old.m2m, &new.m2m);

        for warning in &changes.warnings {
            warn!(app, "{}", warning);
        }
        if !changes.is_empty() {
            info!(
                app,
                created = changes.created.len(),
                dropped = changes.dropped.len(),
                altered = changes.altered.len(),
                m2m = changes.m2m.len(),
                "Detected changes"
            );
        }
        changes
    }

    fn diff_table(
        &self,
        old: &TableSchema,
        new: &TableSchema,
        warnings: &mut Vec<DiffWarning>,
    ) -> Vec<ChangeOperator> {
        let table = new.name.as_str();
        let mut drop_fks = Vec::new();
        let mut drop_indexes = Vec::new();
        let mut drop_columns = Vec::new();
        let mut alter_columns = Vec::new();
        let mut add_columns = Vec::new();
        let mut add_indexes = Vec::new();
        let mut add_fks = Vec::new();

        if old.options != new.options || old.comment != new.comment {
            warnings.push(DiffWarning::TableOptionsChanged {
                table: table.to_string(),
            });
        }

        for column in &old.columns {
            if new.get_column(&column.name).is_none() {
                if let Some(fk) = &column.relation {
                    drop_fks.push(ChangeOperator::DropForeignKey {
                        table: table.to_string(),
                        column: column.name.clone(),
                        foreign_key: fk.clone(),
                    });
                }
                drop_columns.push(ChangeOperator::DropColumn {
                    table: table.to_string(),
                    column: column.without_relation(),
                });
            }
        }

        for column in &new.columns {
            let Some(previous) = old.get_column(&column.name) else {
                add_columns.push(ChangeOperator::AddColumn {
                    table: table.to_string(),
                    column: column.without_relation(),
                });
                if let Some(fk) = &column.relation {
                    add_fks.push(ChangeOperator::AddForeignKey {
                        table: table.to_string(),
                        column: column.name.clone(),
                        foreign_key: fk.clone(),
                    });
                }
                continue;
            };

            if previous.primary_key != column.primary_key {
                warnings.push(DiffWarning::PrimaryKeyChange {
                    table: table.to_string(),
                    column: column.name.clone(),
                });
            }
            if previous.auto_increment != column.auto_increment {
                warnings.push(DiffWarning::AutoincrementChange {
                    table: table.to_string(),
                    column: column.name.clone(),
                });
            }

            if previous.relation != column.relation {
                if let Some(fk) = &previous.relation {
                    drop_fks.push(ChangeOperator::DropForeignKey {
                        table: table.to_string(),
                        column: column.name.clone(),
                        foreign_key: fk.clone(),
                    });
                }
                if let Some(fk) = &column.relation {
                    add_fks.push(ChangeOperator::AddForeignKey {
                        table: table.to_string(),
                        column: column.name.clone(),
                        foreign_key: fk.clone(),
                    });
                }
            }

            let (dropped_unique, alterations, added_unique) =
                self.diff_column(table, previous, column);
            drop_indexes.extend(dropped_unique);
            alter_columns.extend(alterations);
            add_indexes.extend(added_unique);
        }

        let old_indexes: HashMap<String, _> =
            old.indexes.iter().map(|i| (i.key(&old.name), i)).collect();
        let new_indexes: HashMap<String, _> =
            new.indexes.iter().map(|i| (i.key(table), i)).collect();

        for index in &old.indexes {
            if new_indexes.get(&index.key(&old.name)) != Some(&index) {
                drop_indexes.push(ChangeOperator::DropIndex {
                    table: table.to_string(),
                    index: index.clone(),
                });
            }
        }
        for index in &new.indexes {
            if old_indexes.get(&index.key(table)) != Some(&index) {
                add_indexes.push(ChangeOperator::AddIndex {
                    table: table.to_string(),
                    index: index.clone(),
                });
            }
        }

        let operators: Vec<ChangeOperator> = drop_fks
            .into_iter()
            .chain(drop_indexes)
            .chain(drop_columns)
            .chain(alter_columns)
            .chain(add_columns)
            .chain(add_indexes)
            .chain(add_fks)
            .collect();
        for op in &operators {
            debug!(table, "{}", op.description());
        }
        operators
    }

    /// Splits a column change into one operator per changed dimension.
    ///
    /// Each operator's `old` is the previous operator's `new`, so applying
    /// them in order walks the column from `previous` to `column`. Returns
    /// (unique removal, alterations, unique addition).
    fn diff_column(
        &self,
        table: &str,
        previous: &ColumnSchema,
        column: &ColumnSchema,
    ) -> (Option<ChangeOperator>, Vec<ChangeOperator>, Option<ChangeOperator>) {
        let mut current = previous.without_relation();
        let target = column.without_relation();

        let step = |current: &mut ColumnSchema, next: ColumnSchema| {
            let old = std::mem::replace(current, next);
            (table.to_string(), old, current.clone())
        };

        let mut dropped_unique = None;
        if current.unique && !target.unique {
            let next = ColumnSchema {
                unique: false,
                ..current.clone()
            };
            let (table, old, new) = step(&mut current, next);
            dropped_unique = Some(ChangeOperator::AlterUnique { table, old, new });
        }

        let mut alterations = Vec::new();
        if current.sql_type != target.sql_type {
            let next = ColumnSchema {
                sql_type: target.sql_type.clone(),
                ..current.clone()
            };
            let (table, old, new) = step(&mut current, next);
            alterations.push(ChangeOperator::ModifyColumn { table, old, new });
        }
        if current.nullable != target.nullable {
            let next = ColumnSchema {
                nullable: target.nullable,
                ..current.clone()
            };
            let (table, old, new) = step(&mut current, next);
            alterations.push(ChangeOperator::AlterNullability { table, old, new });
        }
        if current.default != target.default {
            let next = ColumnSchema {
                default: target.default.clone(),
                ..current.clone()
            };
            let (table, old, new) = step(&mut current, next);
            alterations.push(ChangeOperator::AlterDefault { table, old, new });
        }
        if current.comment != target.comment {
            let next = ColumnSchema {
                comment: target.comment.clone(),
                ..current.clone()
            };
            let (table, old, new) = step(&mut current, next);
            alterations.push(ChangeOperator::SetComment { table, old, new });
        }

        let mut added_unique = None;
        if !current.unique && target.unique {
            let next = ColumnSchema {
                unique: true,
                ..current.clone()
            };
            let (table, old, new) = step(&mut current, next);
            added_unique = Some(ChangeOperator::AlterUnique { table, old, new });
        }

        (dropped_unique, alterations, added_unique)
    }

    fn diff_m2m(&self, old: &[M2MSchema], new: &[M2MSchema]) -> Vec<ChangeOperator> {
        let old_keys: HashMap<String, &M2MSchema> = old.iter().map(|m| (m.key(), m)).collect();
        let new_keys: HashMap<String, &M2MSchema> = new.iter().map(|m| (m.key(), m)).collect();

        let drops = old
            .iter()
            .filter(|m| new_keys.get(&m.key()) != Some(m))
            .map(|m| ChangeOperator::DropM2M { m2m: m.clone() });
        let adds = new
            .iter()
            .filter(|m| old_keys.get(&m.key()) != Some(m))
            .map(|m| ChangeOperator::AddM2M { m2m: m.clone() });
        drops.chain(adds).collect()
    }
}
