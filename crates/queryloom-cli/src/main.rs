use std::process::ExitCode;

use queryloom_cli::commands::register_builtin_commands;
use queryloom_cli::CommandRegistry;
use queryloom_core::{logging, settings_loader, LoomResult, Settings};

fn load_settings(matches: &clap::ArgMatches) -> LoomResult<Settings> {
    match matches.get_one::<String>("config") {
        Some(path) => settings_loader::from_file_with_env(path),
        None => Ok(settings_loader::from_env()),
    }
}

fn main() -> ExitCode {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);
    let matches = registry.build_cli().get_matches();

    let result = load_settings(&matches).and_then(|settings| {
        logging::setup_logging(&settings);
        registry.execute(&matches, &settings)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
