//! Deterministic names for generated indexes and constraints.
//!
//! Upgrade and downgrade statements are generated independently, so every
//! name the engine invents must be a pure function of the objects it names.
//! A name is a truncated human-readable prefix followed by a fixed-length
//! SHA-256 digest of the full, untruncated inputs:
//!
//! ```text
//! idx_category_slug_e9bcff
//! uid_category_name_8b0cb9
//! fk_category_user_110d4c63
//! m2m_product_category_cc1b7607
//! ```
//!
//! Every derived name is at most [`MAX_DERIVED_NAME_LEN`] bytes, which fits
//! the identifier limit of all supported dialects.

use sha2::{Digest, Sha256};

/// Upper bound (in bytes) of any derived identifier.
pub const MAX_DERIVED_NAME_LEN: usize = 30;

/// The kind of object a derived name identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    /// Non-unique index.
    Index,
    /// Unique index.
    Unique,
    /// Foreign key constraint.
    ForeignKey,
    /// Many-to-many relation key.
    M2M,
}

impl NameKind {
    /// Returns the name prefix for this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Index => "idx",
            Self::Unique => "uid",
            Self::ForeignKey => "fk",
            Self::M2M => "m2m",
        }
    }
}

/// Derives the identifier for an object of `kind` on `table`.
///
/// The meaning of `columns` depends on the kind:
///
/// - `Index` / `Unique`: the indexed columns, in index order.
/// - `ForeignKey`: `[local column, referenced table, referenced column]`.
/// - `M2M`: `[related table, relation field]`.
#[must_use]
pub fn derive_name<S: AsRef<str>>(kind: NameKind, table: &str, columns: &[S]) -> String {
    let mut parts = Vec::with_capacity(columns.len() + 1);
    parts.push(table);
    parts.extend(columns.iter().map(AsRef::as_ref));

    match kind {
        NameKind::Index | NameKind::Unique => {
            let first = parts.get(1).copied().unwrap_or_default();
            format!(
                "{}_{}_{}_{}",
                kind.prefix(),
                truncate(table, 11),
                truncate(first, 7),
                digest(&parts, 6)
            )
        }
        NameKind::ForeignKey | NameKind::M2M => {
            let target = match kind {
                NameKind::ForeignKey => parts.get(2),
                _ => parts.get(1),
            }
            .copied()
            .unwrap_or_default();
            format!(
                "{}_{}_{}_{}",
                kind.prefix(),
                truncate(table, 8),
                truncate(target, 8),
                digest(&parts, 8)
            )
        }
    }
}

/// Derives the name of the foreign key from `table.column` to
/// `references_table.references_column`.
#[must_use]
pub fn foreign_key_name(
    table: &str,
    column: &str,
    references_table: &str,
    references_column: &str,
) -> String {
    derive_name(
        NameKind::ForeignKey,
        table,
        &[column, references_table, references_column],
    )
}

/// Hex-encoded SHA-256 of the `;`-joined parts, cut to `len` characters.
fn digest(parts: &[&str], len: usize) -> String {
    let hash = Sha256::digest(parts.join(";").as_bytes());
    let mut hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(len);
    hex
}

/// Cuts `s` to at most `max_bytes` bytes without splitting a character.
fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_names() {
        assert_eq!(
            derive_name(NameKind::Index, "category", &["slug"]),
            "idx_category_slug_e9bcff"
        );
        assert_eq!(
            derive_name(NameKind::Index, "category", &["name"]),
            "idx_category_name_8b0cb9"
        );
        assert_eq!(
            derive_name(NameKind::Unique, "category", &["name"]),
            "uid_category_name_8b0cb9"
        );
    }

    #[test]
    fn test_unique_and_plain_share_digest() {
        let idx = derive_name(NameKind::Index, "category", &["name"]);
        let uid = derive_name(NameKind::Unique, "category", &["name"]);
        assert_ne!(idx, uid);
        assert_eq!(idx[3..], uid[3..]);
    }

    #[test]
    fn test_foreign_key_name() {
        assert_eq!(
            foreign_key_name("category", "owner_id", "user", "id"),
            "fk_category_user_110d4c63"
        );
    }

    #[test]
    fn test_m2m_name() {
        assert_eq!(
            derive_name(NameKind::M2M, "product", &["category", "categories"]),
            "m2m_product_category_cc1b7607"
        );
    }

    #[test]
    fn test_long_names_are_truncated() {
        let name = derive_name(
            NameKind::Index,
            "organization_membership",
            &["created_at", "user_id"],
        );
        assert_eq!(name, "idx_organizatio_created_bc7ef2");
        assert!(name.len() <= MAX_DERIVED_NAME_LEN);
    }

    #[test]
    fn test_deterministic() {
        let a = derive_name(NameKind::Index, "user", &["email"]);
        let b = derive_name(NameKind::Index, "user", &["email"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_digest_covers_untruncated_input() {
        let a = derive_name(NameKind::Index, "organization_a", &["column_one"]);
        let b = derive_name(NameKind::Index, "organization_b", &["column_one"]);
        assert_eq!(a[..23], b[..23]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_column_order_matters() {
        let a = derive_name(NameKind::Index, "category", &["name", "title"]);
        let b = derive_name(NameKind::Index, "category", &["title", "name"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_multibyte_truncation() {
        let name = derive_name(NameKind::Index, "ééééééééééé", &["ñññññññ"]);
        assert!(name.len() <= MAX_DERIVED_NAME_LEN);
        assert!(name.starts_with("idx_ééééé_ñññ_"));
    }

    #[test]
    fn test_empty_columns() {
        let name = derive_name::<&str>(NameKind::Index, "t", &[]);
        assert!(name.starts_with("idx_t__"));
    }
}
