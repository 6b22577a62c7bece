//! Schema description types.
//!
//! These types describe the declared data model and the recorded snapshot
//! of it. The engine treats them as read-only input: a diff consumes two
//! snapshots and never mutates either.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::naming::{derive_name, NameKind};

/// Abstract SQL data types. Each dialect maps them to a concrete type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// Small integer (16-bit).
    SmallInt,
    /// Integer (32-bit).
    Integer,
    /// Big integer (64-bit).
    BigInt,
    /// Variable-length character string.
    Varchar(usize),
    /// Fixed-length character string.
    Char(usize),
    /// Unbounded text.
    Text,
    /// Boolean.
    Boolean,
    /// Date and time with sub-second precision.
    Timestamp,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Floating point (single precision).
    Real,
    /// Floating point (double precision).
    Double,
    /// Decimal with precision and scale.
    Decimal(u8, u8),
    /// Binary large object.
    Blob,
    /// JSON document.
    Json,
    /// UUID.
    Uuid,
    /// Dialect-specific type name, emitted verbatim.
    Custom(String),
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum DefaultValue {
    /// No default value.
    #[default]
    None,
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// The current timestamp, rendered per dialect.
    Now,
    /// SQL expression emitted verbatim.
    Expression(String),
}

impl DefaultValue {
    /// Returns true if no default is declared.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Foreign key action (ON DELETE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ForeignKeyAction {
    /// Cascade the delete to referencing rows.
    #[default]
    Cascade,
    /// Restrict (checked immediately).
    Restrict,
    /// Set the foreign key column to NULL.
    SetNull,
    /// Set the foreign key column to its default value.
    SetDefault,
    /// No action (checked at the end of the statement).
    NoAction,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub const fn to_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// The target of a relation column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeySchema {
    /// Referenced table.
    pub references_table: String,
    /// Referenced column.
    pub references_column: String,
    /// Action on delete.
    pub on_delete: ForeignKeyAction,
}

impl ForeignKeySchema {
    /// Creates a reference to `table.column` with the default action.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            references_table: table.into(),
            references_column: column.into(),
            on_delete: ForeignKeyAction::default(),
        }
    }

    /// Returns the derived constraint name for this key on `table.column`.
    #[must_use]
    pub fn constraint_name(&self, table: &str, column: &str) -> String {
        crate::naming::foreign_key_name(
            table,
            column,
            &self.references_table,
            &self.references_column,
        )
    }
}

/// Description of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Abstract SQL type.
    pub sql_type: SqlType,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Whether the column has a UNIQUE constraint.
    pub unique: bool,
    /// Default value.
    #[serde(default)]
    pub default: DefaultValue,
    /// Human-readable comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// Whether this column is the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether this column auto-increments.
    #[serde(default)]
    pub auto_increment: bool,
    /// Relation target if this is a foreign key column.
    #[serde(default)]
    pub relation: Option<ForeignKeySchema>,
}

impl ColumnSchema {
    /// Creates a nullable column with no default.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            unique: false,
            default: DefaultValue::None,
            comment: None,
            primary_key: false,
            auto_increment: false,
            relation: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the column as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = value;
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the column as the primary key. Primary keys are always NOT NULL.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Makes this a relation column referencing `table.column`.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.relation = Some(ForeignKeySchema::new(table, column));
        self
    }

    /// Sets the ON DELETE action of the relation.
    ///
    /// Has no effect on a column without a relation.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        if let Some(relation) = self.relation.as_mut() {
            relation.on_delete = action;
        }
        self
    }

    /// Returns a copy of this column without its relation.
    #[must_use]
    pub fn without_relation(&self) -> Self {
        Self {
            relation: None,
            ..self.clone()
        }
    }
}

/// Dialect-specific index type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexType {
    /// The dialect's default index (B-tree everywhere).
    #[default]
    BTree,
    /// Hash index.
    Hash,
    /// Full-text index (MySQL family).
    FullText,
    /// Spatial index (MySQL family).
    Spatial,
    /// Generalized inverted index (PostgreSQL).
    Gin,
    /// Generalized search tree (PostgreSQL).
    Gist,
}

/// Description of an index.
///
/// The name is derived from the owning table and the columns unless one is
/// given explicitly, so identical column sets always produce the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    pub unique: bool,
    /// Index type.
    #[serde(default)]
    pub index_type: IndexType,
    /// Explicit name, overriding the derived one.
    #[serde(default)]
    pub name: Option<String>,
}

impl IndexSchema {
    /// Creates a non-unique index over `columns`.
    #[must_use]
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            index_type: IndexType::BTree,
            name: None,
        }
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the index type.
    #[must_use]
    pub fn index_type(mut self, index_type: IndexType) -> Self {
        self.index_type = index_type;
        self
    }

    /// Sets an explicit name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the name of this index on `table`.
    #[must_use]
    pub fn name_for(&self, table: &str) -> String {
        self.name.clone().unwrap_or_else(|| {
            let kind = if self.unique {
                NameKind::Unique
            } else {
                NameKind::Index
            };
            derive_name(kind, table, &self.columns)
        })
    }

    /// Returns the identity of this index on `table`.
    ///
    /// Two indexes with the same key cover the same columns; they may still
    /// differ in uniqueness, type or name.
    #[must_use]
    pub fn key(&self, table: &str) -> String {
        derive_name(NameKind::Index, table, &self.columns)
    }
}

/// MySQL-family table options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableOptions {
    /// Storage engine.
    #[serde(default)]
    pub engine: Option<String>,
    /// Character set. Falls back to the dialect default when absent.
    #[serde(default)]
    pub charset: Option<String>,
    /// Collation.
    #[serde(default)]
    pub collation: Option<String>,
}

/// Description of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns in declared order.
    pub columns: Vec<ColumnSchema>,
    /// Indexes (excluding column-level UNIQUE).
    #[serde(default)]
    pub indexes: Vec<IndexSchema>,
    /// Table comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// MySQL-family options.
    #[serde(default)]
    pub options: TableOptions,
}

impl TableSchema {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            comment: None,
            options: TableOptions::default(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Sets the table comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the MySQL-family options.
    #[must_use]
    pub fn options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Gets a mutable column by name.
    #[must_use]
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut ColumnSchema> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Iterates over `(column, relation)` for every relation column.
    pub fn relations(&self) -> impl Iterator<Item = (&ColumnSchema, &ForeignKeySchema)> {
        self.columns
            .iter()
            .filter_map(|c| c.relation.as_ref().map(|r| (c, r)))
    }

    /// Checks the table's internal invariants.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(MigrateError::MalformedDescription(format!(
                    "Column '{}' is declared twice in table '{}'",
                    column.name, self.name
                )));
            }
        }

        let mut index_names = HashSet::new();
        for index in &self.indexes {
            if index.columns.is_empty() {
                return Err(MigrateError::MalformedDescription(format!(
                    "Index without columns in table '{}'",
                    self.name
                )));
            }
            if let Some(missing) = index.columns.iter().find(|c| !seen.contains(c.as_str())) {
                return Err(MigrateError::MalformedDescription(format!(
                    "Index on table '{}' references unknown column '{}'",
                    self.name, missing
                )));
            }
            if !index_names.insert(index.key(&self.name)) {
                return Err(MigrateError::MalformedDescription(format!(
                    "Table '{}' declares two indexes over ({})",
                    self.name,
                    index.columns.join(", ")
                )));
            }
        }

        Ok(())
    }

    /// Returns a copy with columns and indexes in a canonical order.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut table = self.clone();
        table.columns.sort_by(|a, b| a.name.cmp(&b.name));
        table
            .indexes
            .sort_by_cached_key(|index| index.key(&self.name));
        table
    }
}

/// Description of a many-to-many relation and its junction table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct M2MSchema {
    /// Relation field name on the declaring table.
    pub field: String,
    /// Declaring table.
    pub table: String,
    /// Related table.
    pub related_table: String,
    /// Junction table name.
    pub through: String,
    /// Junction column referencing the declaring table.
    pub backward_key: String,
    /// Junction column referencing the related table.
    pub forward_key: String,
    /// Primary key column of the declaring table.
    pub table_pk: String,
    /// Primary key column of the related table.
    pub related_pk: String,
    /// Type of the declaring table's primary key.
    pub table_pk_type: SqlType,
    /// Type of the related table's primary key.
    pub related_pk_type: SqlType,
    /// Action on delete for both junction foreign keys.
    pub on_delete: ForeignKeyAction,
    /// Whether a (backward, forward) pair may appear only once.
    pub unique: bool,
    /// Junction table comment.
    pub comment: Option<String>,
}

impl M2MSchema {
    /// Creates a relation `table.field` ↔ `related_table` with conventional
    /// junction naming (`{table}_{related}`, `{table}_id`, `{related}_id`).
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        table: impl Into<String>,
        related_table: impl Into<String>,
    ) -> Self {
        let table = table.into();
        let related_table = related_table.into();
        Self {
            field: field.into(),
            through: format!("{table}_{related_table}"),
            backward_key: format!("{table}_id"),
            forward_key: format!("{related_table}_id"),
            table,
            related_table,
            table_pk: "id".to_string(),
            related_pk: "id".to_string(),
            table_pk_type: SqlType::Integer,
            related_pk_type: SqlType::Integer,
            on_delete: ForeignKeyAction::Cascade,
            unique: false,
            comment: None,
        }
    }

    /// Sets the junction table name.
    #[must_use]
    pub fn through(mut self, through: impl Into<String>) -> Self {
        self.through = through.into();
        self
    }

    /// Sets the junction column names.
    #[must_use]
    pub fn keys(mut self, backward: impl Into<String>, forward: impl Into<String>) -> Self {
        self.backward_key = backward.into();
        self.forward_key = forward.into();
        self
    }

    /// Makes each pair unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the junction table comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns the identity of this relation.
    #[must_use]
    pub fn key(&self) -> String {
        derive_name(
            NameKind::M2M,
            &self.table,
            &[self.related_table.as_str(), self.field.as_str()],
        )
    }

    /// Synthesizes the junction table: two NOT NULL foreign key columns and,
    /// for unique relations, a unique index over the pair.
    #[must_use]
    pub fn junction_table(&self) -> TableSchema {
        let backward = ColumnSchema::new(&self.backward_key, self.table_pk_type.clone())
            .not_null()
            .references(&self.table, &self.table_pk)
            .on_delete(self.on_delete);
        let forward = ColumnSchema::new(&self.forward_key, self.related_pk_type.clone())
            .not_null()
            .references(&self.related_table, &self.related_pk)
            .on_delete(self.on_delete);

        let mut table = TableSchema::new(&self.through).column(backward).column(forward);
        if self.unique {
            table = table.index(
                IndexSchema::new([self.backward_key.as_str(), self.forward_key.as_str()]).unique(),
            );
        }
        table.comment = self.comment.clone();
        table
    }
}

/// All tables and many-to-many relations of one app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSchema {
    /// Tables in declared order.
    #[serde(default)]
    pub tables: Vec<TableSchema>,
    /// Many-to-many relations.
    #[serde(default)]
    pub m2m: Vec<M2MSchema>,
}

impl AppSchema {
    /// Creates an empty app.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    #[must_use]
    pub fn table(mut self, table: TableSchema) -> Self {
        self.tables.push(table);
        self
    }

    /// Adds a many-to-many relation.
    #[must_use]
    pub fn m2m(mut self, relation: M2MSchema) -> Self {
        self.m2m.push(relation);
        self
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Gets a mutable table by name.
    #[must_use]
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut TableSchema> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Returns table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Checks every table and relation of the app.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for table in &self.tables {
            if !names.insert(table.name.as_str()) {
                return Err(MigrateError::MalformedDescription(format!(
                    "Table '{}' is declared twice",
                    table.name
                )));
            }
            table.validate()?;

            for (column, relation) in table.relations() {
                let Some(target) = self.get_table(&relation.references_table) else {
                    // Resolved across apps by `SchemaSnapshot::validate`.
                    continue;
                };
                if target.get_column(&relation.references_column).is_none() {
                    return Err(MigrateError::MalformedDescription(format!(
                        "Column '{}.{}' references unknown column '{}.{}'",
                        table.name,
                        column.name,
                        relation.references_table,
                        relation.references_column
                    )));
                }
            }
        }

        let mut keys = HashSet::new();
        for relation in &self.m2m {
            for endpoint in [&relation.table, &relation.related_table] {
                if self.get_table(endpoint).is_none() {
                    return Err(MigrateError::MalformedDescription(format!(
                        "Many-to-many '{}.{}' references unknown table '{}'",
                        relation.table, relation.field, endpoint
                    )));
                }
            }
            if !names.insert(relation.through.as_str()) {
                return Err(MigrateError::MalformedDescription(format!(
                    "Junction table '{}' clashes with another table",
                    relation.through
                )));
            }
            if !keys.insert(relation.key()) {
                return Err(MigrateError::MalformedDescription(format!(
                    "Many-to-many '{}.{}' is declared twice",
                    relation.table, relation.field
                )));
            }
        }

        Ok(())
    }

    /// Returns a copy in a canonical order, for structural comparison.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut tables: Vec<TableSchema> =
            self.tables.iter().map(TableSchema::normalized).collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        let mut m2m = self.m2m.clone();
        m2m.sort_by_cached_key(M2MSchema::key);
        Self { tables, m2m }
    }

    /// Structural equality: same tables, columns, indexes and relations,
    /// regardless of declaration order.
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

/// The schema of every app, as of one migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Apps by name.
    pub apps: BTreeMap<String, AppSchema>,
}

impl SchemaSnapshot {
    /// Creates an empty snapshot (the baseline of a first run).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an app.
    #[must_use]
    pub fn app(mut self, name: impl Into<String>, app: AppSchema) -> Self {
        self.apps.insert(name.into(), app);
        self
    }

    /// Gets an app by name.
    #[must_use]
    pub fn get_app(&self, name: &str) -> Option<&AppSchema> {
        self.apps.get(name)
    }

    /// Checks every app, then resolves relations that leave their app
    /// against the other apps of the snapshot.
    pub fn validate(&self) -> Result<()> {
        for (name, app) in &self.apps {
            app.validate().map_err(|e| match e {
                MigrateError::MalformedDescription(msg) => {
                    MigrateError::MalformedDescription(format!("app '{name}': {msg}"))
                }
                other => other,
            })?;
        }

        for (name, app) in &self.apps {
            for table in &app.tables {
                for (column, relation) in table.relations() {
                    if app.get_table(&relation.references_table).is_some() {
                        continue;
                    }
                    let resolved = self.apps.values().any(|other| {
                        other
                            .get_table(&relation.references_table)
                            .is_some_and(|t| t.get_column(&relation.references_column).is_some())
                    });
                    if !resolved {
                        return Err(MigrateError::MalformedDescription(format!(
                            "app '{name}': Column '{}.{}' references unknown column '{}.{}'",
                            table.name,
                            column.name,
                            relation.references_table,
                            relation.references_column
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Parses a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the snapshot to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MigrateError::SnapshotNotFound(path.to_path_buf()));
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Writes the snapshot to a file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_table() -> TableSchema {
        TableSchema::new("user")
            .column(
                ColumnSchema::new("id", SqlType::Integer)
                    .primary_key()
                    .auto_increment(),
            )
            .column(ColumnSchema::new("username", SqlType::Varchar(20)).not_null().unique())
    }

    #[test]
    fn test_column_schema_builder() {
        let col = ColumnSchema::new("id", SqlType::BigInt)
            .primary_key()
            .auto_increment();

        assert_eq!(col.name, "id");
        assert!(col.primary_key);
        assert!(col.auto_increment);
        assert!(!col.nullable);
    }

    #[test]
    fn test_relation_builder() {
        let col = ColumnSchema::new("owner_id", SqlType::Integer)
            .references("user", "id")
            .on_delete(ForeignKeyAction::SetNull);
        let relation = col.relation.as_ref().unwrap();
        assert_eq!(relation.references_table, "user");
        assert_eq!(relation.on_delete, ForeignKeyAction::SetNull);
        assert!(col.without_relation().relation.is_none());
    }

    #[test]
    fn test_on_delete_without_relation() {
        let col = ColumnSchema::new("x", SqlType::Integer).on_delete(ForeignKeyAction::SetNull);
        assert!(col.relation.is_none());
    }

    #[test]
    fn test_index_names() {
        let index = IndexSchema::new(["name"]);
        assert_eq!(index.name_for("category"), "idx_category_name_8b0cb9");
        assert_eq!(
            index.clone().unique().name_for("category"),
            "uid_category_name_8b0cb9"
        );
        assert_eq!(index.clone().named("by_name").name_for("category"), "by_name");
        assert_eq!(index.key("category"), index.unique().key("category"));
    }

    #[test]
    fn test_validate_duplicate_column() {
        let table = user_table().column(ColumnSchema::new("id", SqlType::Integer));
        assert!(matches!(
            table.validate(),
            Err(MigrateError::MalformedDescription(_))
        ));
    }

    #[test]
    fn test_validate_index_unknown_column() {
        let table = user_table().index(IndexSchema::new(["email"]));
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("unknown column 'email'"));
    }

    #[test]
    fn test_validate_empty_index() {
        let table = user_table().index(IndexSchema::new(Vec::<String>::new()));
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_validate_relation_to_unknown_local_column() {
        let app = AppSchema::new().table(user_table()).table(
            TableSchema::new("post")
                .column(ColumnSchema::new("id", SqlType::Integer).primary_key())
                .column(
                    ColumnSchema::new("author_id", SqlType::Integer).references("user", "uuid"),
                ),
        );
        assert!(app.validate().is_err());
    }

    #[test]
    fn test_validate_external_relation_is_allowed() {
        let app = AppSchema::new().table(
            TableSchema::new("post")
                .column(ColumnSchema::new("id", SqlType::Integer).primary_key())
                .column(ColumnSchema::new("author_id", SqlType::Integer).references("user", "id")),
        );
        assert!(app.validate().is_ok());
    }

    #[test]
    fn test_snapshot_resolves_relations_across_apps() {
        let blog = AppSchema::new().table(
            TableSchema::new("post")
                .column(ColumnSchema::new("id", SqlType::Integer).primary_key())
                .column(ColumnSchema::new("author_id", SqlType::Integer).references("user", "id")),
        );
        let accounts = AppSchema::new().table(user_table());

        let snapshot = SchemaSnapshot::new()
            .app("blog", blog.clone())
            .app("accounts", accounts);
        assert!(snapshot.validate().is_ok());

        // `user` dropped while `post.author_id` still points at it.
        let dangling = SchemaSnapshot::new().app("blog", blog);
        let err = dangling.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed schema description: app 'blog': \
             Column 'post.author_id' references unknown column 'user.id'"
        );
    }

    #[test]
    fn test_validate_m2m() {
        let app = AppSchema::new()
            .table(user_table())
            .m2m(M2MSchema::new("groups", "user", "group"));
        let err = app.validate().unwrap_err();
        assert!(err.to_string().contains("unknown table 'group'"));

        let app = AppSchema::new()
            .table(user_table())
            .m2m(M2MSchema::new("friends", "user", "user").through("user"));
        assert!(app.validate().is_err());
    }

    #[test]
    fn test_junction_table() {
        let relation = M2MSchema::new("categories", "product", "category").unique();
        let junction = relation.junction_table();

        assert_eq!(junction.name, "product_category");
        assert_eq!(junction.columns.len(), 2);
        let backward = junction.get_column("product_id").unwrap();
        assert!(!backward.nullable);
        assert_eq!(backward.relation.as_ref().unwrap().references_table, "product");
        assert_eq!(junction.indexes.len(), 1);
        assert!(junction.indexes[0].unique);
    }

    #[test]
    fn test_structural_equality_ignores_order() {
        let a = AppSchema::new()
            .table(user_table())
            .table(TableSchema::new("tag").column(ColumnSchema::new("id", SqlType::Integer)));
        let mut b = a.clone();
        b.tables.reverse();
        b.tables[1].columns.reverse();
        assert!(a.structurally_eq(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot = SchemaSnapshot::new().app("models", AppSchema::new().table(user_table()));
        let json = snapshot.to_json().unwrap();
        let parsed = SchemaSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_snapshot_json_defaults() {
        let json = r#"{"apps": {"models": {"tables": [{"name": "t", "columns": [
            {"name": "id", "sql_type": "Integer", "nullable": false, "unique": false}
        ]}]}}}"#;
        let snapshot = SchemaSnapshot::from_json(json).unwrap();
        let table = snapshot.get_app("models").unwrap().get_table("t").unwrap();
        assert_eq!(table.columns[0].default, DefaultValue::None);
        assert!(table.indexes.is_empty());
    }
}
