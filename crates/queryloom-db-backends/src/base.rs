//! Dialect selection.
//!
//! [`DialectKind`] names a supported engine and [`dialect_for`] returns the
//! matching [`SqlDialect`]. The kind usually comes from
//! [`Settings::dialect`](queryloom_core::Settings).

use std::fmt;
use std::str::FromStr;

use queryloom_core::{LoomError, LoomResult, Settings};
use queryloom_db::query::SqlDialect;
use serde::{Deserialize, Serialize};

use crate::mysql::MySqlDialect;
use crate::postgresql::PostgresDialect;
use crate::sqlite::SqliteDialect;

/// The database engines queryloom can render SQL for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// SQLite 3.38 or later (for `json_each`).
    #[default]
    Sqlite,
    /// PostgreSQL.
    #[serde(rename = "postgresql")]
    PostgreSql,
    /// MySQL 8.0.17 or later (for `MEMBER OF`).
    #[serde(rename = "mysql")]
    MySql,
}

impl DialectKind {
    /// Every supported kind.
    pub const ALL: [Self; 3] = [Self::Sqlite, Self::PostgreSql, Self::MySql];

    /// The canonical lower-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::PostgreSql => "postgresql",
            Self::MySql => "mysql",
        }
    }

    /// Reads the kind from `settings.dialect`.
    pub fn from_settings(settings: &Settings) -> LoomResult<Self> {
        settings.dialect.parse()
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DialectKind {
    type Err = LoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgresql" | "postgres" | "pg" => Ok(Self::PostgreSql),
            "mysql" | "mariadb" => Ok(Self::MySql),
            other => Err(LoomError::ConfigurationError(format!(
                "Unknown dialect '{other}'; expected one of sqlite, postgresql, mysql"
            ))),
        }
    }
}

/// Returns the dialect for a kind.
pub fn dialect_for(kind: DialectKind) -> Box<dyn SqlDialect> {
    match kind {
        DialectKind::Sqlite => Box::new(SqliteDialect),
        DialectKind::PostgreSql => Box::new(PostgresDialect),
        DialectKind::MySql => Box::new(MySqlDialect),
    }
}

/// Returns the dialect named by `settings.dialect`.
pub fn dialect_from_settings(settings: &Settings) -> LoomResult<Box<dyn SqlDialect>> {
    let kind = DialectKind::from_settings(settings)?;
    tracing::debug!(dialect = %kind, "selected dialect");
    Ok(dialect_for(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("sqlite3".parse::<DialectKind>().unwrap(), DialectKind::Sqlite);
        assert_eq!(" Postgres ".parse::<DialectKind>().unwrap(), DialectKind::PostgreSql);
        assert_eq!("pg".parse::<DialectKind>().unwrap(), DialectKind::PostgreSql);
        assert_eq!("MariaDB".parse::<DialectKind>().unwrap(), DialectKind::MySql);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "oracle".parse::<DialectKind>().unwrap_err();
        assert!(matches!(err, LoomError::ConfigurationError(_)));
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_names_round_trip() {
        for kind in DialectKind::ALL {
            assert_eq!(kind.name().parse::<DialectKind>().unwrap(), kind);
            assert_eq!(dialect_for(kind).name(), kind.name());
        }
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        assert_eq!(DialectKind::from_settings(&settings).unwrap(), DialectKind::Sqlite);
        settings.dialect = "mysql".to_string();
        assert_eq!(dialect_from_settings(&settings).unwrap().name(), "mysql");
        settings.dialect = "db2".to_string();
        assert!(dialect_from_settings(&settings).is_err());
    }

    #[test]
    fn test_serde_names() {
        let kind: DialectKind = serde_json::from_str("\"postgresql\"").unwrap();
        assert_eq!(kind, DialectKind::PostgreSql);
        assert_eq!(serde_json::to_string(&DialectKind::MySql).unwrap(), "\"mysql\"");
    }
}
