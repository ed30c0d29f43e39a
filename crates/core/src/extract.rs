use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::schema::AliasTable;

/// Output of the keyword extractor: an optional account-like key plus the
/// columns the text mentioned. An empty column set means "all columns".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FastIntent {
    pub identifier: Option<String>,
    pub columns: BTreeSet<String>,
}

pub fn extract_fast(text: &str, aliases: &AliasTable) -> FastIntent {
    let normalized_text = normalize_text(text);

    FastIntent {
        identifier: find_identifier(&normalized_text).map(str::to_string),
        columns: aliases.columns_mentioned(&normalized_text),
    }
}

/// First run of 10 to 20 ASCII digits. Longer runs yield their first 20.
pub fn find_identifier(text: &str) -> Option<&str> {
    identifier_pattern().find(text).map(|found| found.as_str())
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("[0-9]{10,20}").expect("identifier pattern compiles"))
}

#[cfg(test)]
mod tests {
    use crate::schema::TableSchema;

    use super::{extract_fast, find_identifier};

    #[test]
    fn extracts_identifier_and_balance_column() {
        let schema = TableSchema::default();
        let intent = extract_fast("show balance for account 1234567890123", &schema.aliases);

        assert_eq!(intent.identifier.as_deref(), Some("1234567890123"));
        assert_eq!(intent.columns.into_iter().collect::<Vec<_>>(), vec!["currentbalance"]);
    }

    #[test]
    fn identifier_bounds_are_ten_to_twenty_digits() {
        assert_eq!(find_identifier("acct 123456789"), None);
        assert_eq!(find_identifier("acct 1234567890"), Some("1234567890"));
        assert_eq!(find_identifier("acct 12345678901234567890"), Some("12345678901234567890"));
        assert_eq!(find_identifier("acct 123456789012345678901"), Some("12345678901234567890"));
        assert_eq!(find_identifier("no digits at all"), None);
    }

    #[test]
    fn long_runs_yield_their_first_twenty_digits() {
        assert_eq!(
            find_identifier("acct 1234567890123456789012345"),
            Some("12345678901234567890")
        );

        let schema = TableSchema::default();
        let intent = extract_fast("balance 1234567890123456789012345", &schema.aliases);
        assert_eq!(intent.identifier.as_deref(), Some("12345678901234567890"));
    }

    #[test]
    fn first_qualifying_run_wins() {
        assert_eq!(find_identifier("ref 42 then 9876543210 and 1111111111"), Some("9876543210"));
        assert_eq!(find_identifier("id:5555555555, other"), Some("5555555555"));
    }

    #[test]
    fn text_without_matches_selects_everything() {
        let schema = TableSchema::default();
        let intent = extract_fast("DROP TABLE users; --", &schema.aliases);

        assert_eq!(intent.identifier, None);
        assert!(intent.columns.is_empty());
    }

    #[test]
    fn keyword_matching_is_case_insensitive_and_deduplicated() {
        let schema = TableSchema::default();
        let intent = extract_fast("Customer NAME and Interest RATE", &schema.aliases);

        assert_eq!(
            intent.columns.into_iter().collect::<Vec<_>>(),
            vec!["cust_name".to_string(), "intrate".to_string()]
        );
    }

    #[test]
    fn branch_mentions_pull_both_branch_columns() {
        let schema = TableSchema::default();
        let intent = extract_fast("which branch_name holds 1234567890", &schema.aliases);

        assert!(intent.columns.contains("branchno"));
        assert!(intent.columns.contains("branch_name"));
    }
}
