//! MySQL dialect.

use queryloom_db::query::SqlDialect;

/// The MySQL dialect. Array membership needs MySQL 8.0.17 or later and binds
/// the array as a JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn case_sensitive_column(&self, alias: &str, separator: &str, column: &str) -> String {
        format!("BINARY {alias}{separator}{column}")
    }

    // The default collations are case-insensitive.
    fn case_insensitive_column(&self, alias: &str, separator: &str, column: &str) -> String {
        format!("{alias}{separator}{column}")
    }

    fn in_array_sql(&self) -> &'static str {
        "MEMBER OF (?)"
    }

    fn range_clause(&self) -> &'static str {
        "LIMIT ?, ?"
    }
}
