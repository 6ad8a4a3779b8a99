//! The `check` command.
//!
//! Validates settings and, optionally, a query plan without printing SQL.

use queryloom_core::{LoomError, LoomResult, Settings};
use queryloom_db::query::{CompileOptions, InstructionKind};
use queryloom_db_backends::{dialect_for, DialectKind};

use crate::command::ManagementCommand;
use crate::plan::QueryPlan;

/// Checks settings and query plans for problems.
pub struct CheckCommand;

/// The result of a single check.
#[derive(Debug, Clone)]
pub struct CheckMessage {
    /// The severity level of this check result.
    pub level: CheckLevel,
    /// A human-readable description of the issue.
    pub msg: String,
    /// An optional hint for how to resolve the issue.
    pub hint: Option<String>,
    /// A unique identifier for this check (e.g. "plan.E001").
    pub id: String,
}

impl CheckMessage {
    fn new(level: CheckLevel, id: &str, msg: impl Into<String>, hint: Option<&str>) -> Self {
        Self {
            level,
            msg: msg.into(),
            hint: hint.map(str::to_string),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for CheckMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.level, self.id, self.msg)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n\tHINT: {hint}")?;
        }
        Ok(())
    }
}

/// Severity levels for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckLevel {
    /// Informational message.
    Info,
    /// A warning that may indicate a problem.
    Warning,
    /// An error that must be resolved.
    Error,
}

impl std::fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Runs the settings checks.
pub fn run_checks(settings: &Settings) -> Vec<CheckMessage> {
    let mut messages = Vec::new();

    if let Err(e) = DialectKind::from_settings(settings) {
        messages.push(CheckMessage::new(
            CheckLevel::Error,
            "settings.E001",
            e.to_string(),
            Some("Set dialect to sqlite, postgresql or mysql"),
        ));
    }

    if settings.column_alias_separator.is_empty() {
        messages.push(CheckMessage::new(
            CheckLevel::Error,
            "settings.E002",
            "column_alias_separator is empty",
            Some("Projected column labels need a separator such as \"_\""),
        ));
    } else if settings.column_alias_separator.chars().any(|c| !(c.is_ascii_alphanumeric() || c == '_')) {
        messages.push(CheckMessage::new(
            CheckLevel::Warning,
            "settings.W001",
            format!(
                "column_alias_separator {:?} is not a valid unquoted identifier part",
                settings.column_alias_separator
            ),
            Some("Use letters, digits or underscores"),
        ));
    }

    if !settings.strict_parameter_check {
        messages.push(CheckMessage::new(
            CheckLevel::Info,
            "settings.I001",
            "Parameter count mismatches are logged, not rejected",
            Some("Set strict_parameter_check = true to fail compilation instead"),
        ));
    }

    messages
}

/// Checks a query plan: its tree, its initializers, and that it compiles
/// with strict parameter checking under the configured dialect.
pub fn check_plan(plan: &QueryPlan, settings: &Settings) -> Vec<CheckMessage> {
    let mut messages = Vec::new();

    let tree = match plan.build_tree(&settings.column_alias_separator) {
        Ok(tree) => Some(tree),
        Err(e) => {
            messages.push(CheckMessage::new(CheckLevel::Error, "plan.E001", e.to_string(), None));
            None
        }
    };

    let kinds: Vec<InstructionKind> = plan.instructions.iter().map(|i| i.kind()).collect();
    let initializers = kinds.iter().filter(|k| k.is_initializer()).count();
    match initializers {
        0 => messages.push(CheckMessage::new(
            CheckLevel::Error,
            "plan.E002",
            "The plan has no INITIAL_QUERY, FROM_QUERY or PAGED_INITIAL_QUERY",
            None,
        )),
        1 => {}
        n => messages.push(CheckMessage::new(
            CheckLevel::Error,
            "plan.E003",
            format!("The plan has {n} initializers"),
            Some("A plan compiles exactly one query"),
        )),
    }
    if initializers == 1 && !kinds.first().is_some_and(|k| k.is_initializer()) {
        messages.push(CheckMessage::new(
            CheckLevel::Warning,
            "plan.W001",
            "Instructions before the initializer render ahead of its SQL",
            None,
        ));
    }
    if kinds.contains(&InstructionKind::PagedInitialQuery) && !kinds.contains(&InstructionKind::PagedMainOrderBy) {
        messages.push(CheckMessage::new(
            CheckLevel::Warning,
            "plan.W002",
            "The paginated plan has no PAGED_MAIN_ORDER_BY",
            Some("Pages are only stable under a total order; order by the id column"),
        ));
    }

    let has_errors = messages.iter().any(|m| m.level >= CheckLevel::Error);
    if let (Some(tree), false, Ok(kind)) = (tree, has_errors, DialectKind::from_settings(settings)) {
        let sequence = plan.instructions.iter().cloned().collect::<queryloom_db::InstructionSequence>();
        if let Err(e) = sequence.compile_with(tree, dialect_for(kind).as_ref(), CompileOptions::default().strict(true)) {
            messages.push(CheckMessage::new(CheckLevel::Error, "plan.E004", e.to_string(), None));
        }
    }

    messages
}

impl ManagementCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "Check settings and, optionally, a query plan"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("plan")
                .long("plan")
                .short('p')
                .value_name("PLAN")
                .help("A query plan (JSON) to check"),
        )
    }

    fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> LoomResult<()> {
        let mut messages = run_checks(settings);
        if let Some(path) = matches.get_one::<String>("plan") {
            let plan = QueryPlan::from_file(path)?;
            messages.extend(check_plan(&plan, settings));
        }

        let errors = messages.iter().filter(|m| m.level >= CheckLevel::Error).count();
        let warnings = messages.iter().filter(|m| m.level == CheckLevel::Warning).count();

        for msg in &messages {
            println!("{msg}");
        }
        if errors == 0 && warnings == 0 {
            println!("Check identified no issues");
        }
        tracing::info!(errors, warnings, total = messages.len(), "check finished");

        if errors > 0 {
            return Err(LoomError::ConfigurationError(format!("Check found {errors} error(s)")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(messages: &[CheckMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    fn plan(instructions: &str) -> QueryPlan {
        QueryPlan::from_json_str(&format!(
            r#"{{"tree": {{"entity": "Order", "table": "orders", "alias": "o", "columns": ["total"]}},
                "instructions": {instructions}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_default_settings_only_inform() {
        let messages = run_checks(&Settings::default());
        assert_eq!(ids(&messages), vec!["settings.I001"]);
        assert_eq!(messages[0].level, CheckLevel::Info);
    }

    #[test]
    fn test_unknown_dialect() {
        let settings = Settings {
            dialect: "oracle".to_string(),
            strict_parameter_check: true,
            ..Settings::default()
        };
        let messages = run_checks(&settings);
        assert_eq!(ids(&messages), vec!["settings.E001"]);
        assert!(messages[0].msg.contains("oracle"));
    }

    #[test]
    fn test_separator_checks() {
        let empty = Settings {
            column_alias_separator: String::new(),
            ..Settings::default()
        };
        assert!(ids(&run_checks(&empty)).contains(&"settings.E002"));

        let dotted = Settings {
            column_alias_separator: ".".to_string(),
            ..Settings::default()
        };
        assert!(ids(&run_checks(&dotted)).contains(&"settings.W001"));

        let double = Settings {
            column_alias_separator: "__".to_string(),
            ..Settings::default()
        };
        assert!(!ids(&run_checks(&double)).contains(&"settings.W001"));
    }

    #[test]
    fn test_valid_plan_has_no_issues() {
        let plan = plan(
            r#"[{"kind": "INITIAL_QUERY"},
                {"kind": "STRING", "value": " WHERE "},
                {"kind": "COLUMN", "value": {"name": "total"}},
                {"kind": "STRING", "value": " > "},
                {"kind": "PARAM", "value": {"type": "Int", "value": 5}}]"#,
        );
        assert!(check_plan(&plan, &Settings::default()).is_empty());
    }

    #[test]
    fn test_plan_initializer_checks() {
        let none = plan(r#"[{"kind": "STRING", "value": "x"}]"#);
        assert_eq!(ids(&check_plan(&none, &Settings::default())), vec!["plan.E002"]);

        let two = plan(r#"[{"kind": "INITIAL_QUERY"}, {"kind": "FROM_QUERY"}]"#);
        assert_eq!(ids(&check_plan(&two, &Settings::default())), vec!["plan.E003"]);

        let late = plan(r#"[{"kind": "STRING", "value": "x"}, {"kind": "INITIAL_QUERY"}]"#);
        assert_eq!(ids(&check_plan(&late, &Settings::default())), vec!["plan.W001"]);
    }

    #[test]
    fn test_paged_plan_without_order() {
        let plan = plan(r#"[{"kind": "PAGED_INITIAL_QUERY", "value": {"begin": 0, "end": 10}}]"#);
        assert_eq!(ids(&check_plan(&plan, &Settings::default())), vec!["plan.W002"]);
    }

    #[test]
    fn test_plan_compile_failure() {
        let plan = plan(
            r#"[{"kind": "INITIAL_QUERY"},
                {"kind": "PATH", "value": [{"match": "entity", "value": "Missing"}]}]"#,
        );
        let messages = check_plan(&plan, &Settings::default());
        assert_eq!(ids(&messages), vec!["plan.E004"]);
        assert!(messages[0].msg.contains("under entity 'Order'"));
    }

    #[test]
    fn test_message_display_with_hint() {
        let msg = CheckMessage::new(CheckLevel::Warning, "plan.W002", "no order", Some("order it"));
        assert_eq!(msg.to_string(), "WARNING (plan.W002): no order\n\tHINT: order it");
    }

    #[test]
    fn test_check_level_ordering() {
        assert!(CheckLevel::Info < CheckLevel::Warning);
        assert!(CheckLevel::Warning < CheckLevel::Error);
    }
}
