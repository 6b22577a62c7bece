//! Operator sequencer.
//!
//! Turns the per-table output of the differ into one executable order for
//! an app and pairs it with the downgrade. The global order is:
//!
//! 1. foreign key drops on altered tables
//! 2. junction table drops
//! 3. foreign key drops that break cycles between dropped tables
//! 4. table drops, dependents first
//! 5. index and column changes on altered tables
//! 6. table creations, referenced tables first
//! 7. foreign key additions on altered tables
//! 8. foreign key additions deferred out of cyclic table creations
//! 9. junction table creations
//!
//! The downgrade is the upgrade reversed, with every operator inverted.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::autodetector::AppChanges;
use crate::dialect::MigrationDialect;
use crate::error::{MigrateError, Result};
use crate::operations::{ChangeOperator, Phase};
use crate::schema::{ForeignKeySchema, TableSchema};

/// A foreign key edge between two tables of the same set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredForeignKey {
    /// Table holding the relation column.
    pub table: String,
    /// Relation column.
    pub column: String,
    /// Referenced table and column.
    pub foreign_key: ForeignKeySchema,
}

impl DeferredForeignKey {
    fn add(&self) -> ChangeOperator {
        ChangeOperator::AddForeignKey {
            table: self.table.clone(),
            column: self.column.clone(),
            foreign_key: self.foreign_key.clone(),
        }
    }
}

/// Creation order of a set of tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOrder {
    /// Table names, referenced tables before the tables referencing them.
    pub order: Vec<String>,
    /// Nullable foreign keys removed from the creation statements to break
    /// cycles. They are added once every table exists.
    pub deferred: Vec<DeferredForeignKey>,
}

#[derive(Debug)]
struct Edge<'a> {
    from: &'a str,
    to: &'a str,
    column: &'a str,
    nullable: bool,
    foreign_key: &'a ForeignKeySchema,
    active: bool,
}

/// Orders `tables` so that every table comes after the tables it references.
///
/// Ties are broken by input order. Self references and references to tables
/// outside the set do not constrain the order. When the remaining tables form
/// a cycle, the first nullable foreign key on that cycle is deferred; a cycle
/// made only of NOT NULL foreign keys is a [`MigrateError::DependencyCycle`].
pub fn dependency_order(tables: &[TableSchema]) -> Result<TableOrder> {
    let names: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    let mut edges: Vec<Edge<'_>> = tables
        .iter()
        .flat_map(|t| {
            t.relations().map(move |(column, fk)| Edge {
                from: t.name.as_str(),
                to: fk.references_table.as_str(),
                column: column.name.as_str(),
                nullable: column.nullable,
                foreign_key: fk,
                active: true,
            })
        })
        .filter(|e| e.from != e.to && names.contains(e.to))
        .collect();

    let mut placed: HashSet<&str> = HashSet::new();
    let mut order = TableOrder::default();

    while order.order.len() < tables.len() {
        let ready = tables.iter().find(|t| {
            !placed.contains(t.name.as_str())
                && edges
                    .iter()
                    .filter(|e| e.active && e.from == t.name)
                    .all(|e| placed.contains(e.to))
        });
        if let Some(table) = ready {
            placed.insert(&table.name);
            order.order.push(table.name.clone());
            continue;
        }

        let breakable = (0..edges.len()).find(|&i| {
            let edge = &edges[i];
            edge.active
                && edge.nullable
                && !placed.contains(edge.from)
                && reaches(&edges, &placed, edge.to, edge.from)
        });
        match breakable {
            Some(i) => {
                let edge = &mut edges[i];
                edge.active = false;
                debug!(
                    table = edge.from,
                    column = edge.column,
                    references = edge.to,
                    "Deferring foreign key to break a cycle"
                );
                order.deferred.push(DeferredForeignKey {
                    table: edge.from.to_string(),
                    column: edge.column.to_string(),
                    foreign_key: edge.foreign_key.clone(),
                });
            }
            None => {
                let mut cycle: Vec<String> = tables
                    .iter()
                    .map(|t| t.name.as_str())
                    .filter(|name| !placed.contains(name))
                    .filter(|name| {
                        edges.iter().any(|e| {
                            e.active
                                && e.from == *name
                                && !placed.contains(e.to)
                                && reaches(&edges, &placed, e.to, name)
                        })
                    })
                    .map(str::to_string)
                    .collect();
                cycle.sort();
                return Err(MigrateError::DependencyCycle { tables: cycle });
            }
        }
    }

    Ok(order)
}

/// Returns true if `to` is reachable from `from` over active edges between
/// unplaced tables.
fn reaches<'a>(edges: &[Edge<'a>], placed: &HashSet<&str>, from: &'a str, to: &str) -> bool {
    let mut stack = vec![from];
    let mut seen = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        stack.extend(
            edges
                .iter()
                .filter(|e| e.active && e.from == current && !placed.contains(e.to))
                .map(|e| e.to),
        );
    }
    false
}

/// Removes the deferred relations from the tables they belong to.
fn strip_deferred(
    tables: &[TableSchema],
    deferred: &[DeferredForeignKey],
) -> HashMap<String, TableSchema> {
    tables
        .iter()
        .map(|table| {
            let mut table = table.clone();
            let columns: Vec<&str> = deferred
                .iter()
                .filter(|fk| fk.table == table.name)
                .map(|fk| fk.column.as_str())
                .collect();
            for name in columns {
                if let Some(column) = table.get_column_mut(name) {
                    column.relation = None;
                }
            }
            (table.name.clone(), table)
        })
        .collect()
}

/// Statements of a migration for one dialect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedMigration {
    /// Upgrade statements, in execution order.
    pub upgrade: Vec<String>,
    /// Downgrade statements, in execution order.
    pub downgrade: Vec<String>,
}

/// The ordered operators of one app, in both directions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    /// App name.
    pub app: String,
    /// Operators turning the old schema into the new one.
    pub upgrade: Vec<ChangeOperator>,
    /// Operators turning the new schema back into the old one.
    pub downgrade: Vec<ChangeOperator>,
}

impl MigrationPlan {
    /// Returns true if the plan has no operator.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upgrade.is_empty()
    }

    /// Renders both directions with `dialect`.
    ///
    /// Fails as a whole if any operator cannot be expressed; no statement is
    /// returned in that case.
    pub fn render(&self, dialect: &dyn MigrationDialect) -> Result<RenderedMigration> {
        Ok(RenderedMigration {
            upgrade: render_all(dialect, &self.upgrade)?,
            downgrade: render_all(dialect, &self.downgrade)?,
        })
    }
}

fn render_all(
    dialect: &dyn MigrationDialect,
    operators: &[ChangeOperator],
) -> Result<Vec<String>> {
    let mut statements = Vec::with_capacity(operators.len());
    for operator in operators {
        statements.extend(dialect.emit(operator)?);
    }
    Ok(statements)
}

/// Orders the changes of an app for execution.
#[derive(Debug, Default)]
pub struct Sequencer;

impl Sequencer {
    /// Creates a new sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Builds the upgrade order and its downgrade.
    pub fn sequence(&self, changes: &AppChanges) -> Result<MigrationPlan> {
        let created = dependency_order(&changes.created)?;
        let dropped = dependency_order(&changes.dropped)?;
        let created_tables = strip_deferred(&changes.created, &created.deferred);
        let dropped_tables = strip_deferred(&changes.dropped, &dropped.deferred);

        let altered = || changes.altered.iter().flat_map(|t| t.operators.iter());
        let (drop_m2m, add_m2m): (Vec<_>, Vec<_>) = changes
            .m2m
            .iter()
            .cloned()
            .partition(|op| op.phase() == Phase::DropM2M);

        let mut upgrade = Vec::new();
        upgrade.extend(
            altered()
                .filter(|op| op.phase() == Phase::DropForeignKey)
                .cloned(),
        );
        upgrade.extend(drop_m2m);
        upgrade.extend(dropped.deferred.iter().map(|fk| fk.add().reverse()));
        upgrade.extend(
            dropped
                .order
                .iter()
                .rev()
                .filter_map(|name| dropped_tables.get(name))
                .map(|table| ChangeOperator::DropTable {
                    table: table.clone(),
                }),
        );
        upgrade.extend(
            altered()
                .filter(|op| {
                    !matches!(op.phase(), Phase::DropForeignKey | Phase::AddForeignKey)
                })
                .cloned(),
        );
        upgrade.extend(
            created
                .order
                .iter()
                .filter_map(|name| created_tables.get(name))
                .map(|table| ChangeOperator::AddTable {
                    table: table.clone(),
                }),
        );
        upgrade.extend(
            altered()
                .filter(|op| op.phase() == Phase::AddForeignKey)
                .cloned(),
        );
        upgrade.extend(created.deferred.iter().map(DeferredForeignKey::add));
        upgrade.extend(add_m2m);

        let downgrade: Vec<ChangeOperator> =
            upgrade.iter().rev().map(ChangeOperator::reverse).collect();

        info!(
            app = %changes.app,
            operators = upgrade.len(),
            "Sequenced migration"
        );

        Ok(MigrationPlan {
            app: changes.app.clone(),
            upgrade,
            downgrade,
        })
    }
}
