//! Parameterized query construction.
//!
//! Only schema identifiers (table and column names from the alias table) are
//! written into SQL text. Every value travels as a positional `$n` parameter,
//! numbered from 1 in the order it was appended.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::extract::FastIntent;
use crate::intent::ParsedIntent;
use crate::schema::TableSchema;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl BuiltQuery {
    /// Number of `$n` placeholders in the template.
    pub fn placeholder_count(&self) -> usize {
        placeholder_pattern().find_iter(&self.sql).count()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct QueryBuilder<'a> {
    schema: &'a TableSchema,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(schema: &'a TableSchema) -> Self {
        Self { schema }
    }

    pub fn build_fast(&self, intent: &FastIntent) -> BuiltQuery {
        let columns = self.known_columns(intent.columns.iter().map(String::as_str));
        let select = select_list(&columns);
        let table = &self.schema.table;

        match intent.identifier.as_deref() {
            Some(identifier) => BuiltQuery {
                sql: format!(
                    "SELECT {select} FROM {table} WHERE {} = $1",
                    self.schema.identifier_column
                ),
                params: vec![coerce_identifier(identifier)],
            },
            None => BuiltQuery {
                sql: format!("SELECT {select} FROM {table} LIMIT {}", self.schema.default_limit),
                params: Vec::new(),
            },
        }
    }

    pub fn build_from_intent(&self, intent: &ParsedIntent) -> BuiltQuery {
        let columns = self.known_columns(intent.columns.iter().map(String::as_str));
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(identifier) = intent.identifier.as_ref().and_then(identifier_param) {
            params.push(identifier);
            clauses.push(format!("{} = ${}", self.schema.identifier_column, params.len()));
        }

        let known = self.schema.aliases.columns();
        for (column, value) in &intent.filters {
            let Some(column) = known.get(column.as_str()).copied() else {
                continue;
            };
            let Some(param) = scalar_param(value) else {
                continue;
            };
            params.push(param);
            clauses.push(format!("{column} = ${}", params.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let limit =
            coerce_limit(intent.limit.as_ref(), self.schema.default_limit, self.schema.max_limit);

        BuiltQuery {
            sql: format!(
                "SELECT {} FROM {}{where_clause} LIMIT {limit}",
                select_list(&columns),
                self.schema.table
            ),
            params,
        }
    }

    fn known_columns<'c>(&self, requested: impl Iterator<Item = &'c str>) -> BTreeSet<&'a str> {
        let known = self.schema.aliases.columns();
        requested.filter_map(|column| known.get(column).copied()).collect()
    }
}

/// Integer when the identifier fits in an `i64`, otherwise the original text.
pub fn coerce_identifier(raw: &str) -> SqlParam {
    let trimmed = raw.trim();
    match trimmed.parse::<i64>() {
        Ok(integer) => SqlParam::Int(integer),
        Err(_) => SqlParam::Text(trimmed.to_string()),
    }
}

/// Positive integer limit clamped to `max_limit`; anything unusable gives `default_limit`.
pub fn coerce_limit(raw: Option<&Value>, default_limit: u32, max_limit: u32) -> u32 {
    let requested = match raw {
        Some(Value::Number(number)) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.fract() == 0.0 && *value >= 1.0)
                .map(|value| value as u64)
        }),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        _ => None,
    };

    match requested {
        Some(limit) if limit > 0 => {
            u32::try_from(limit.min(u64::from(max_limit))).unwrap_or(max_limit)
        }
        _ => default_limit,
    }
}

fn identifier_param(value: &Value) -> Option<SqlParam> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(coerce_identifier(text)),
        Value::Number(number) => Some(match number.as_i64() {
            Some(integer) => SqlParam::Int(integer),
            None => SqlParam::Text(number.to_string()),
        }),
        _ => None,
    }
}

fn scalar_param(value: &Value) -> Option<SqlParam> {
    match value {
        Value::String(text) => Some(match text.trim().parse::<i64>() {
            Ok(integer) => SqlParam::Int(integer),
            Err(_) => SqlParam::Text(text.clone()),
        }),
        Value::Bool(flag) => Some(SqlParam::Bool(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => Some(SqlParam::Int(integer)),
            None => number.as_f64().map(SqlParam::Float),
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn select_list(columns: &BTreeSet<&str>) -> String {
    if columns.is_empty() {
        "*".to_string()
    } else {
        columns.iter().copied().collect::<Vec<_>>().join(", ")
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$[0-9]+").expect("placeholder pattern compiles"))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use serde_json::json;

    use crate::extract::{extract_fast, FastIntent};
    use crate::intent::ParsedIntent;
    use crate::schema::TableSchema;
    use crate::validator::validate;

    use super::{coerce_limit, BuiltQuery, QueryBuilder, SqlParam};

    #[test]
    fn fast_build_with_identifier_binds_integer() {
        let schema = TableSchema::default();
        let intent = extract_fast("show balance for account 1234567890123", &schema.aliases);
        let query = QueryBuilder::new(&schema).build_fast(&intent);

        assert_eq!(query.sql, "SELECT currentbalance FROM ccod_bal WHERE accountno = $1");
        assert_eq!(query.params, vec![SqlParam::Int(1_234_567_890_123)]);
        assert!(validate(&query.sql).is_allowed());
    }

    #[test]
    fn fast_build_keeps_oversized_identifier_as_text() {
        let schema = TableSchema::default();
        let intent = FastIntent {
            identifier: Some("99999999999999999999".to_string()),
            columns: BTreeSet::new(),
        };
        let query = QueryBuilder::new(&schema).build_fast(&intent);

        assert_eq!(query.sql, "SELECT * FROM ccod_bal WHERE accountno = $1");
        assert_eq!(query.params, vec![SqlParam::Text("99999999999999999999".to_string())]);
    }

    #[test]
    fn fast_build_without_identifier_uses_default_limit() {
        let schema = TableSchema::default();
        let intent = extract_fast("DROP TABLE users; --", &schema.aliases);
        let query = QueryBuilder::new(&schema).build_fast(&intent);

        assert_eq!(query.sql, "SELECT * FROM ccod_bal LIMIT 10");
        assert!(query.params.is_empty());
        assert!(validate(&query.sql).is_allowed());
    }

    #[test]
    fn intent_build_numbers_placeholders_in_order() {
        let schema = TableSchema::default();
        let intent = ParsedIntent {
            identifier: Some(json!("1234567890")),
            columns: vec!["cust_name".to_string(), "currentbalance".to_string()],
            filters: BTreeMap::from([
                ("branchno".to_string(), json!(12)),
                ("intrate".to_string(), json!(7.5)),
            ]),
            limit: Some(json!(3)),
        };
        let query = QueryBuilder::new(&schema).build_from_intent(&intent);

        assert_eq!(
            query.sql,
            "SELECT currentbalance, cust_name FROM ccod_bal \
             WHERE accountno = $1 AND branchno = $2 AND intrate = $3 LIMIT 3"
        );
        assert_eq!(
            query.params,
            vec![SqlParam::Int(1_234_567_890), SqlParam::Int(12), SqlParam::Float(7.5)]
        );
        assert_placeholders_match(&query);
    }

    #[test]
    fn intent_build_drops_unknown_columns_and_filters() {
        let schema = TableSchema::default();
        let intent = ParsedIntent {
            identifier: None,
            columns: vec!["password_hash".to_string(), "cust_name; drop table x".to_string()],
            filters: BTreeMap::from([
                ("1=1 OR accountno".to_string(), json!("x")),
                ("ssn".to_string(), json!("123")),
                ("branch_name".to_string(), json!("Central")),
            ]),
            limit: None,
        };
        let query = QueryBuilder::new(&schema).build_from_intent(&intent);

        assert_eq!(query.sql, "SELECT * FROM ccod_bal WHERE branch_name = $1 LIMIT 10");
        assert_eq!(query.params, vec![SqlParam::Text("Central".to_string())]);
        assert!(!query.sql.contains("ssn"));
        assert!(!query.sql.contains("password_hash"));
    }

    #[test]
    fn intent_build_drops_non_scalar_filter_values() {
        let schema = TableSchema::default();
        let intent = ParsedIntent {
            filters: BTreeMap::from([
                ("branchno".to_string(), json!([1, 2])),
                ("intrate".to_string(), json!(null)),
                ("cust_name".to_string(), json!({"$ne": ""})),
            ]),
            ..ParsedIntent::default()
        };
        let query = QueryBuilder::new(&schema).build_from_intent(&intent);

        assert_eq!(query.sql, "SELECT * FROM ccod_bal LIMIT 10");
        assert!(query.params.is_empty());
    }

    #[test]
    fn numeric_string_filters_bind_as_integers() {
        let schema = TableSchema::default();
        let intent = ParsedIntent {
            filters: BTreeMap::from([
                ("branchno".to_string(), json!(" 12 ")),
                ("branch_name".to_string(), json!("North 12")),
            ]),
            ..ParsedIntent::default()
        };
        let query = QueryBuilder::new(&schema).build_from_intent(&intent);

        assert_eq!(
            query.sql,
            "SELECT * FROM ccod_bal WHERE branch_name = $1 AND branchno = $2 LIMIT 10"
        );
        assert_eq!(
            query.params,
            vec![SqlParam::Text("North 12".to_string()), SqlParam::Int(12)]
        );
    }

    #[test]
    fn hostile_filter_values_stay_in_parameters() {
        let schema = TableSchema::default();
        let payload = "x'; DROP TABLE ccod_bal; --";
        let intent = ParsedIntent {
            filters: BTreeMap::from([("cust_name".to_string(), json!(payload))]),
            ..ParsedIntent::default()
        };
        let query = QueryBuilder::new(&schema).build_from_intent(&intent);

        assert_eq!(query.sql, "SELECT * FROM ccod_bal WHERE cust_name = $1 LIMIT 10");
        assert_eq!(query.params, vec![SqlParam::Text(payload.to_string())]);
        assert!(validate(&query.sql).is_allowed());
    }

    #[test]
    fn limit_word_is_replaced_by_default() {
        let schema = TableSchema::default();
        let intent = ParsedIntent { limit: Some(json!("drop")), ..ParsedIntent::default() };
        let query = QueryBuilder::new(&schema).build_from_intent(&intent);

        assert_eq!(query.sql, "SELECT * FROM ccod_bal LIMIT 10");
        assert!(!query.sql.to_lowercase().contains("drop"));
        assert!(validate(&query.sql).is_allowed());
    }

    #[test]
    fn limit_coercion_rules() {
        assert_eq!(coerce_limit(None, 10, 100), 10);
        assert_eq!(coerce_limit(Some(&json!(25)), 10, 100), 25);
        assert_eq!(coerce_limit(Some(&json!("25")), 10, 100), 25);
        assert_eq!(coerce_limit(Some(&json!(5000)), 10, 100), 100);
        assert_eq!(coerce_limit(Some(&json!(0)), 10, 100), 10);
        assert_eq!(coerce_limit(Some(&json!(-5)), 10, 100), 10);
        assert_eq!(coerce_limit(Some(&json!(2.5)), 10, 100), 10);
        assert_eq!(coerce_limit(Some(&json!(4.0)), 10, 100), 4);
        assert_eq!(coerce_limit(Some(&json!("10; DROP")), 10, 100), 10);
        assert_eq!(coerce_limit(Some(&json!(true)), 10, 100), 10);
    }

    #[test]
    fn identifier_of_unexpected_type_is_ignored() {
        let schema = TableSchema::default();
        for identifier in [json!(true), json!(["1234567890"]), json!(""), json!({"a": 1})] {
            let intent = ParsedIntent { identifier: Some(identifier), ..ParsedIntent::default() };
            let query = QueryBuilder::new(&schema).build_from_intent(&intent);
            assert_eq!(query.sql, "SELECT * FROM ccod_bal LIMIT 10");
            assert!(query.params.is_empty());
        }
    }

    #[test]
    fn placeholder_count_always_matches_parameters() {
        let schema = TableSchema::default();
        let builder = QueryBuilder::new(&schema);

        for text in ["balance 1234567890", "list customers", "rate of 12345678901234 now", ""] {
            assert_placeholders_match(&builder.build_fast(&extract_fast(text, &schema.aliases)));
        }

        let known = ["accountno", "branchno", "cust_name", "intrate", "bogus"];
        for mask in 0u32..32 {
            let filters = known
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(index, column)| (column.to_string(), json!(index)))
                .collect();
            let intent = ParsedIntent {
                identifier: (mask % 2 == 0).then(|| json!(1_234_567_890u64)),
                filters,
                ..ParsedIntent::default()
            };
            assert_placeholders_match(&builder.build_from_intent(&intent));
        }
    }

    fn assert_placeholders_match(query: &BuiltQuery) {
        assert_eq!(query.placeholder_count(), query.params.len(), "sql: {}", query.sql);
        for index in 1..=query.params.len() {
            assert!(query.sql.contains(&format!("${index}")), "missing ${index} in {}", query.sql);
        }
    }
}
