//! Deployment schema: the single allowed table and its alias vocabulary.
//!
//! Everything in here is interpolated into SQL text by the query builder, so
//! the whole schema is a closed, config-time set. Nothing derived from user
//! text or model output ever becomes a table or column name.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::validator::FORBIDDEN_KEYWORDS;

pub const DEFAULT_LIMIT: u32 = 10;
pub const DEFAULT_MAX_LIMIT: u32 = 1_000;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("`{0}` is not a valid SQL identifier (expected [a-z_][a-z0-9_]*)")]
    InvalidIdentifier(String),
    #[error("`{0}` is a reserved statement keyword and cannot be used as an identifier")]
    ReservedIdentifier(String),
    #[error("alias table is empty")]
    EmptyAliasTable,
    #[error("alias `{0}` is blank")]
    BlankAlias(String),
    #[error("identifier column `{0}` is not the target of any alias")]
    UnknownIdentifierColumn(String),
    #[error("limits must satisfy 1 <= default_limit ({default_limit}) <= max_limit ({max_limit})")]
    InvalidLimits { default_limit: u32, max_limit: u32 },
}

/// Lowercase user vocabulary mapped onto canonical column names. One alias
/// may name several columns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeSet<(String, String)>,
}

impl AliasTable {
    pub fn new<I, A, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: Into<String>,
        C: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(alias, column)| (alias.into().trim().to_lowercase(), column.into()))
            .collect();
        Self { entries }
    }

    /// Columns whose alias occurs as a substring of `normalized_text`.
    ///
    /// Callers pass text that is already lower-cased.
    pub fn columns_mentioned(&self, normalized_text: &str) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|(alias, _)| normalized_text.contains(alias.as_str()))
            .map(|(_, column)| column.clone())
            .collect()
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.entries.iter().any(|(_, known)| known == column)
    }

    pub fn columns(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|(_, column)| column.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(alias, column)| (alias.as_str(), column.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub identifier_column: String,
    pub aliases: AliasTable,
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            table: "ccod_bal".to_string(),
            identifier_column: "accountno".to_string(),
            aliases: AliasTable::new([
                ("customer", "cust_name"),
                ("name", "cust_name"),
                ("acc_no", "accountno"),
                ("balance", "currentbalance"),
                ("amount", "currentbalance"),
                ("amt", "currentbalance"),
                ("interest", "intrate"),
                ("rate", "intrate"),
                ("branch", "branchno"),
                ("branch", "branch_name"),
                ("branch_no", "branchno"),
                ("br_no", "branchno"),
                ("branch_name", "branch_name"),
                ("brname", "branch_name"),
            ]),
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

impl TableSchema {
    pub fn validate(&self) -> Result<(), SchemaError> {
        check_identifier(&self.table)?;
        check_identifier(&self.identifier_column)?;

        if self.aliases.is_empty() {
            return Err(SchemaError::EmptyAliasTable);
        }
        for (alias, column) in self.aliases.iter() {
            if alias.is_empty() {
                return Err(SchemaError::BlankAlias(column.to_string()));
            }
            check_identifier(column)?;
        }

        if !self.aliases.contains_column(&self.identifier_column) {
            return Err(SchemaError::UnknownIdentifierColumn(self.identifier_column.clone()));
        }

        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(SchemaError::InvalidLimits {
                default_limit: self.default_limit,
                max_limit: self.max_limit,
            });
        }

        Ok(())
    }
}

fn check_identifier(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid_head = chars.next().is_some_and(|ch| ch.is_ascii_lowercase() || ch == '_');
    let valid_tail = chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');
    if !valid_head || !valid_tail {
        return Err(SchemaError::InvalidIdentifier(name.to_string()));
    }

    if FORBIDDEN_KEYWORDS.contains(&name) || matches!(name, "select" | "with") {
        return Err(SchemaError::ReservedIdentifier(name.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AliasTable, SchemaError, TableSchema};

    #[test]
    fn default_schema_is_valid() {
        assert_eq!(TableSchema::default().validate(), Ok(()));
    }

    #[test]
    fn aliases_are_lowercased_and_matched_as_substrings() {
        let aliases = AliasTable::new([("Balance", "currentbalance"), ("amt", "currentbalance")]);

        let columns = aliases.columns_mentioned("what is the balance and amt?");
        assert_eq!(columns.len(), 1);
        assert!(columns.contains("currentbalance"));
        assert!(aliases.columns_mentioned("nothing here").is_empty());
    }

    #[test]
    fn one_alias_can_select_several_columns() {
        let schema = TableSchema::default();

        let columns = schema.aliases.columns_mentioned("which branch is 1234567890");
        assert_eq!(
            columns.into_iter().collect::<Vec<_>>(),
            vec!["branch_name".to_string(), "branchno".to_string()]
        );
    }

    #[test]
    fn rejects_identifiers_that_are_not_sql_safe() {
        let schema =
            TableSchema { table: "accounts; drop table x".to_string(), ..TableSchema::default() };
        assert!(matches!(schema.validate(), Err(SchemaError::InvalidIdentifier(_))));

        let schema = TableSchema {
            aliases: AliasTable::new([("acc", "accountno"), ("gone", "drop")]),
            ..TableSchema::default()
        };
        assert_eq!(schema.validate(), Err(SchemaError::ReservedIdentifier("drop".to_string())));
    }

    #[test]
    fn identifier_column_must_be_an_alias_target() {
        let schema = TableSchema {
            aliases: AliasTable::new([("balance", "currentbalance")]),
            ..TableSchema::default()
        };
        assert_eq!(
            schema.validate(),
            Err(SchemaError::UnknownIdentifierColumn("accountno".to_string()))
        );
    }

    #[test]
    fn default_limit_must_fit_under_max_limit() {
        let schema = TableSchema { default_limit: 50, max_limit: 20, ..TableSchema::default() };
        assert!(matches!(schema.validate(), Err(SchemaError::InvalidLimits { .. })));
    }
}
