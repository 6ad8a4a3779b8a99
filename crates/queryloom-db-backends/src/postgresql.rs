//! PostgreSQL dialect.
//!
//! Compiled SQL still uses `?`; pass
//! [`CompiledSql::numbered_sql`](queryloom_db::query::CompiledSql::numbered_sql)
//! to drivers that expect `$1, $2, ...`.
//!
//! PostgreSQL requires every ORDER BY expression of a `SELECT DISTINCT` to be
//! projected, so ordering a paged query by a non-key column needs that column
//! in the main query's additional columns.

use queryloom_db::query::SqlDialect;

/// The PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    // Text comparisons are already case-sensitive under the default collation.
    fn case_sensitive_column(&self, alias: &str, separator: &str, column: &str) -> String {
        format!("{alias}{separator}{column}")
    }

    fn case_insensitive_column(&self, alias: &str, separator: &str, column: &str) -> String {
        format!("LOWER({alias}{separator}{column})")
    }

    fn in_array_sql(&self) -> &'static str {
        "= ANY(?)"
    }

    fn range_clause(&self) -> &'static str {
        "OFFSET ? ROWS FETCH NEXT ? ROWS ONLY"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queryloom_db::Value;

    #[test]
    fn test_fragments() {
        let d = PostgresDialect;
        assert_eq!(d.case_sensitive_column("c", ".", "name"), "c.name");
        assert_eq!(d.case_insensitive_column("c", ".", "name"), "LOWER(c.name)");
        assert_eq!(d.in_array_sql(), "= ANY(?)");
        assert_eq!(d.range_clause(), "OFFSET ? ROWS FETCH NEXT ? ROWS ONLY");
    }

    #[test]
    fn test_range_is_offset_and_count() {
        assert_eq!(
            PostgresDialect.range_transformation_params(40, 60),
            [Value::Int(40), Value::Int(20)]
        );
    }
}
