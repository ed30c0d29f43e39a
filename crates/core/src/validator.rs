//! Final safety gate in front of the database.
//!
//! Every candidate statement is checked here regardless of which path built
//! it. Only the SQL template is inspected; bound parameter values never reach
//! this function.

use std::sync::OnceLock;

use regex::Regex;

pub const FORBIDDEN_KEYWORDS: [&str; 11] = [
    "insert", "update", "delete", "drop", "truncate", "alter", "create", "grant", "revoke", "exec",
    "execute",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqlVerdict {
    Allow,
    Deny { rule: &'static str, reason: String },
}

impl SqlVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn rule(&self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::Deny { rule, .. } => Some(*rule),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Deny { reason, .. } => Some(reason.as_str()),
        }
    }
}

pub fn validate(sql: &str) -> SqlVerdict {
    let sql_lower = sql.to_lowercase();

    if !read_statement_pattern().is_match(&sql_lower) {
        return SqlVerdict::Deny {
            rule: "read_only_statement",
            reason: "Only SELECT queries are allowed.".to_string(),
        };
    }

    if let Some(found) = forbidden_keyword_pattern().find(&sql_lower) {
        return SqlVerdict::Deny {
            rule: "forbidden_keyword",
            reason: format!("Forbidden keyword detected: {}", found.as_str().to_uppercase()),
        };
    }

    let trimmed = sql.trim();
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
    if body.contains(';') {
        return SqlVerdict::Deny {
            rule: "single_statement",
            reason: "Multi-statement queries are forbidden.".to_string(),
        };
    }

    SqlVerdict::Allow
}

fn read_statement_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(select|with)\b").expect("read statement pattern compiles")
    })
}

fn forbidden_keyword_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(r"\b({})\b", FORBIDDEN_KEYWORDS.join("|"));
        Regex::new(&pattern).expect("forbidden keyword pattern compiles")
    })
}
