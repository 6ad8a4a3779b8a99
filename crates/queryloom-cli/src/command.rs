//! Command framework for the `queryloom` binary.
//!
//! A [`ManagementCommand`] names itself, declares its clap arguments, and
//! handles a parsed invocation. [`CommandRegistry`] collects commands, builds
//! the top-level clap `Command`, and dispatches to the selected subcommand.
//!
//! ## Defining a Custom Command
//!
//! ```rust,no_run
//! use queryloom_cli::command::ManagementCommand;
//! use queryloom_core::{LoomResult, Settings};
//!
//! struct DialectCommand;
//!
//! impl ManagementCommand for DialectCommand {
//!     fn name(&self) -> &str { "dialect" }
//!     fn help(&self) -> &str { "Print the configured dialect" }
//!
//!     fn handle(&self, _matches: &clap::ArgMatches, settings: &Settings) -> LoomResult<()> {
//!         println!("{}", settings.dialect);
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::HashMap;

use queryloom_core::{LoomError, LoomResult, Settings};

/// A subcommand of the `queryloom` binary.
pub trait ManagementCommand: Send + Sync {
    /// The name used to invoke the command.
    fn name(&self) -> &str;

    /// A short help description.
    fn help(&self) -> &str;

    /// Adds the command's arguments. The default adds none.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the command.
    fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> LoomResult<()>;
}

/// A registry of commands, keyed by name.
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn ManagementCommand>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Registers a command, replacing any command with the same name.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        let name = command.name().to_string();
        self.commands.insert(name, command);
    }

    /// Returns the command with the given name.
    pub fn get(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Registered command names, sorted.
    pub fn list_commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds the top-level clap `Command` with one subcommand per entry
    /// and a global `--config` option.
    pub fn build_cli(&self) -> clap::Command {
        let mut app = clap::Command::new("queryloom")
            .about("Compile queryloom instruction plans to SQL")
            .subcommand_required(true)
            .arg(
                clap::Arg::new("config")
                    .long("config")
                    .short('c')
                    .global(true)
                    .value_name("FILE")
                    .help("Settings file (.toml or .json), merged over defaults"),
            );

        let mut entries: Vec<_> = self.commands.iter().collect();
        entries.sort_by_key(|(name, _)| (*name).clone());

        for (name, cmd) in entries {
            // clap wants &'static str names; commands are registered once at
            // startup, so the leak is bounded.
            let static_name: &'static str = Box::leak(name.clone().into_boxed_str());
            let subcmd = clap::Command::new(static_name).about(cmd.help().to_string());
            app = app.subcommand(cmd.add_arguments(subcmd));
        }

        app
    }

    /// Dispatches to the subcommand selected in `matches`.
    pub fn execute(&self, matches: &clap::ArgMatches, settings: &Settings) -> LoomResult<()> {
        let (name, sub_matches) = matches
            .subcommand()
            .ok_or_else(|| LoomError::ConfigurationError("No subcommand specified".to_string()))?;

        let cmd = self
            .get(name)
            .ok_or_else(|| LoomError::ConfigurationError(format!("Unknown command: {name}")))?;

        tracing::debug!(command = name, "running command");
        cmd.handle(sub_matches, settings)
    }
}
