//! The `compile` command.
//!
//! Compiles a JSON [`QueryPlan`] with the configured dialect and prints the
//! SQL and its parameters, plus the count query for paginated plans.

use queryloom_core::{LoomError, LoomResult, Settings};
use queryloom_db::query::{CompileOptions, Compiled};
use queryloom_db::Value;
use queryloom_db_backends::{dialect_for, DialectKind};

use crate::command::ManagementCommand;
use crate::plan::QueryPlan;

/// Compiles a query plan file to SQL.
pub struct CompileCommand;

/// The printable result of compiling a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileReport {
    /// The dialect the SQL was rendered for.
    pub dialect: DialectKind,
    /// The query (or page query) text.
    pub sql: String,
    /// The query parameters.
    pub params: Vec<Value>,
    /// The count query and its parameters, for paginated plans.
    pub count: Option<(String, Vec<Value>)>,
}

impl CompileReport {
    /// Builds a report, optionally rewriting placeholders to `$n`.
    pub fn new(dialect: DialectKind, compiled: Compiled, numbered: bool) -> Self {
        match compiled {
            Compiled::Plain(plain) => {
                let sql = if numbered { plain.numbered_sql() } else { plain.sql().to_string() };
                Self {
                    dialect,
                    sql,
                    params: plain.params().to_vec(),
                    count: None,
                }
            }
            Compiled::Paged(paged) => {
                let (sql, count_sql) = if numbered {
                    (paged.page().numbered_sql(), paged.numbered_count_sql())
                } else {
                    (paged.sql().to_string(), paged.count_sql().to_string())
                };
                Self {
                    dialect,
                    sql,
                    params: paged.params().to_vec(),
                    count: Some((count_sql, paged.count_params().to_vec())),
                }
            }
        }
    }

    /// Human-readable output with SQL comments for the parameters.
    pub fn render_text(&self) -> String {
        let mut out = format!("-- {} query\n{};\n-- params: {}\n", self.dialect, self.sql, render_params(&self.params));
        if let Some((count_sql, count_params)) = &self.count {
            out.push_str(&format!(
                "-- count query\n{count_sql};\n-- params: {}\n",
                render_params(count_params)
            ));
        }
        out
    }

    /// Machine-readable output; parameters are plain JSON values.
    pub fn to_json(&self) -> serde_json::Value {
        let params = |values: &[Value]| values.iter().map(Value::to_json).collect::<Vec<_>>();
        let mut json = serde_json::json!({
            "dialect": self.dialect.name(),
            "sql": self.sql,
            "params": params(&self.params),
        });
        if let Some((count_sql, count_params)) = &self.count {
            json["count_sql"] = serde_json::Value::String(count_sql.clone());
            json["count_params"] = serde_json::Value::Array(params(count_params));
        }
        json
    }
}

fn render_params(params: &[Value]) -> String {
    let rendered: Vec<String> = params.iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}

/// Compiles a plan with settings, an optional dialect override, and the
/// strict parity flag from settings or the command line.
pub fn compile_plan(
    plan: QueryPlan,
    settings: &Settings,
    dialect: Option<&str>,
    numbered: bool,
) -> LoomResult<CompileReport> {
    let kind = match dialect {
        Some(name) => name.parse::<DialectKind>()?,
        None => DialectKind::from_settings(settings)?,
    };
    if numbered && kind != DialectKind::PostgreSql {
        tracing::warn!(dialect = %kind, "numbered placeholders are meant for PostgreSQL drivers");
    }

    let tree = plan.build_tree(&settings.column_alias_separator)?;
    let (_, sequence) = plan.into_parts();
    let compiled = sequence.compile_with(tree, dialect_for(kind).as_ref(), CompileOptions::from_settings(settings))?;
    Ok(CompileReport::new(kind, compiled, numbered))
}

impl ManagementCommand for CompileCommand {
    fn name(&self) -> &'static str {
        "compile"
    }

    fn help(&self) -> &'static str {
        "Compile a JSON query plan to SQL"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("plan")
                .required(true)
                .value_name("PLAN")
                .help("Path to the query plan (JSON)"),
        )
        .arg(
            clap::Arg::new("dialect")
                .long("dialect")
                .short('d')
                .help("Override the configured dialect (sqlite, postgresql, mysql)"),
        )
        .arg(
            clap::Arg::new("numbered")
                .long("numbered")
                .action(clap::ArgAction::SetTrue)
                .help("Print $1, $2, ... instead of ? placeholders"),
        )
        .arg(
            clap::Arg::new("strict")
                .long("strict")
                .action(clap::ArgAction::SetTrue)
                .help("Fail when placeholder and parameter counts differ"),
        )
        .arg(
            clap::Arg::new("json")
                .long("json")
                .action(clap::ArgAction::SetTrue)
                .help("Print the result as JSON"),
        )
    }

    fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> LoomResult<()> {
        let path = matches
            .get_one::<String>("plan")
            .ok_or_else(|| LoomError::UsageError("A plan file is required".to_string()))?;
        let plan = QueryPlan::from_file(path)?;

        let mut settings = settings.clone();
        if matches.get_flag("strict") {
            settings.strict_parameter_check = true;
        }

        let report = compile_plan(
            plan,
            &settings,
            matches.get_one::<String>("dialect").map(String::as_str),
            matches.get_flag("numbered"),
        )?;

        if matches.get_flag("json") {
            let text = serde_json::to_string_pretty(&report.to_json())
                .map_err(|e| LoomError::SerializationError(e.to_string()))?;
            println!("{text}");
        } else {
            print!("{}", report.render_text());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGED_PLAN: &str = r#"{
        "tree": {"entity": "Order", "table": "orders", "alias": "o", "columns": ["total"]},
        "instructions": [
            {"kind": "PAGED_INITIAL_QUERY", "value": {"begin": 0, "end": 20}},
            {"kind": "PAGED_MAIN_WHERE", "value": {}},
            {"kind": "COLUMN", "value": {"name": "total"}},
            {"kind": "STRING", "value": " > "},
            {"kind": "PARAM", "value": {"type": "Int", "value": 100}},
            {"kind": "PAGED_MAIN_ORDER_BY"},
            {"kind": "ID_COLUMN", "value": {}}
        ]
    }"#;

    fn plan() -> QueryPlan {
        QueryPlan::from_json_str(PAGED_PLAN).unwrap()
    }

    #[test]
    fn test_compile_plan_with_settings_dialect() {
        let settings = Settings {
            dialect: "postgresql".to_string(),
            ..Settings::default()
        };
        let report = compile_plan(plan(), &settings, None, true).unwrap();
        assert_eq!(report.dialect, DialectKind::PostgreSql);
        assert!(report.sql.contains("OFFSET $2 ROWS FETCH NEXT $3 ROWS ONLY"));
        assert_eq!(report.params, vec![Value::Int(100), Value::Int(0), Value::Int(20)]);
        let (count_sql, count_params) = report.count.unwrap();
        assert!(count_sql.contains("o.total > $1"));
        assert_eq!(count_params, vec![Value::Int(100)]);
    }

    #[test]
    fn test_dialect_override() {
        let report = compile_plan(plan(), &Settings::default(), Some("mysql"), false).unwrap();
        assert_eq!(report.dialect, DialectKind::MySql);
        assert!(report.sql.contains("LIMIT ?, ?"));
    }

    #[test]
    fn test_unknown_dialect() {
        let err = compile_plan(plan(), &Settings::default(), Some("oracle"), false).unwrap_err();
        assert!(matches!(err, LoomError::ConfigurationError(_)));
    }

    #[test]
    fn test_render_text() {
        let report = compile_plan(plan(), &Settings::default(), None, false).unwrap();
        let text = report.render_text();
        assert!(text.starts_with("-- sqlite query\n"));
        assert!(text.contains("-- params: [100, 0, 20]\n"));
        assert!(text.contains("-- count query\nSELECT COUNT(*)"));
        assert!(text.ends_with("-- params: [100]\n"));
    }

    #[test]
    fn test_to_json() {
        let report = compile_plan(plan(), &Settings::default(), None, false).unwrap();
        let json = report.to_json();
        assert_eq!(json["dialect"], "sqlite");
        assert_eq!(json["params"], serde_json::json!([100, 0, 20]));
        assert_eq!(json["count_params"], serde_json::json!([100]));
    }

    #[test]
    fn test_plain_plan_has_no_count() {
        let plan = QueryPlan::from_json_str(
            r#"{"tree": {"entity": "Order", "table": "orders", "alias": "o"},
                "instructions": [{"kind": "INITIAL_QUERY"}]}"#,
        )
        .unwrap();
        let report = compile_plan(plan, &Settings::default(), None, false).unwrap();
        assert_eq!(report.sql, "SELECT o.id AS o_id FROM orders o");
        assert!(report.count.is_none());
        assert!(report.to_json().get("count_sql").is_none());
    }
}
