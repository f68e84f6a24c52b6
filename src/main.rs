use clap::Parser;
use issue_tracker::cli::commands;
use issue_tracker::cli::{Cli, Commands};
use issue_tracker::config;
use issue_tracker::logging::init_logging;
use issue_tracker::{StructuredError, TrackerError};
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();
    let overrides = build_cli_overrides(&cli);

    // Log format comes from config when a workspace is reachable.
    let log_format = config::load_config(&overrides)
        .ok()
        .map(|config| config.log_format);
    if let Err(e) = init_logging(cli.verbose, cli.quiet, log_format) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let json = cli.json;
    let no_color = cli.no_color;
    let result = match &cli.command {
        Commands::Init { force } => commands::init::execute(*force, None, json),
        Commands::User { command } => commands::user::execute(command, json, &overrides),
        Commands::Label { command } => {
            commands::label::execute(command, json, no_color, &overrides)
        }
        Commands::Milestone { command } => {
            commands::milestone::execute(command, json, no_color, &overrides)
        }
        Commands::Create(args) => commands::create::execute(args, json, &overrides),
        Commands::Show { id } => commands::show::execute(*id, json, no_color, &overrides),
        Commands::List(args) => commands::list::execute(args, json, no_color, &overrides),
        Commands::Close(args) => commands::close::execute(args, true, json, &overrides),
        Commands::Reopen(args) => commands::close::execute(args, false, json, &overrides),
        Commands::Update(args) => commands::update::execute(args, json, &overrides),
        Commands::Comment { command } => commands::comments::execute(command, json, &overrides),
        Commands::Filter(args) => commands::filter::execute(args, json, no_color, &overrides),
        Commands::History(args) => commands::history::execute(args, json, &overrides),
        Commands::Serve(args) => commands::serve::execute(args, &overrides),
        Commands::Completions(args) => commands::completions::execute(args),
        Commands::Version => commands::version::execute(json),
    };

    if let Err(e) = result {
        handle_error(&e, json);
    }
}

/// Print the error and exit with its code.
///
/// JSON goes to stderr when `--json` is set or stdout is not a terminal.
fn handle_error(err: &TrackerError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    if json_mode || !io::stdout().is_terminal() {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let color = io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        colored::control::set_override(color);
        eprintln!("{}", structured.to_human(color));
    }

    std::process::exit(exit_code);
}

fn build_cli_overrides(cli: &Cli) -> config::CliOverrides {
    config::CliOverrides {
        db: cli.db.clone(),
        actor: cli.actor.clone(),
        lock_timeout: cli.lock_timeout,
    }
}
