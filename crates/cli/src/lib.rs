pub mod bootstrap;
pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use mentor_core::config::{ConfigOverrides, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "mentor",
    about = "Daily Mentor: generate a programming quote and post it to Telegram",
    long_about = "Generate a short motivational quote for programmers with Gemini, validate it, and deliver it to a Telegram chat, once or on a schedule.",
    after_help = "Examples:\n  mentor run\n  mentor serve --daily-at 07:00\n  mentor doctor --json\n  mentor config"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a mentor.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override logging.level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
    #[arg(
        long,
        global = true,
        value_parser = parse_log_format,
        help = "Override logging.format (compact|pretty|json)"
    )]
    log_format: Option<LogFormat>,
    #[arg(long, global = true, help = "Override gemini.model")]
    model: Option<String>,
    #[arg(long, global = true, help = "Override telegram.chat_id")]
    chat_id: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Generate, validate and deliver one quote, then print a JSON run summary")]
    Run {
        #[arg(long, help = "Include the run's event timeline in the JSON summary")]
        events: bool,
    },
    #[command(about = "Deliver quotes on a schedule until interrupted with Ctrl-C")]
    Serve {
        #[arg(long, conflicts_with = "daily_at", help = "Seconds between runs")]
        interval_secs: Option<u64>,
        #[arg(long, help = "Run once a day at HH:MM (UTC)")]
        daily_at: Option<String>,
        #[arg(long, help = "Fire one run at startup before waiting for the schedule")]
        run_immediately: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, credentials and schedule without calling any provider")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl GlobalArgs {
    fn load_options(self, schedule: ConfigOverrides) -> LoadOptions {
        let require_file = self.config.is_some();
        LoadOptions {
            config_path: self.config,
            require_file,
            overrides: ConfigOverrides {
                log_level: self.log_level,
                log_format: self.log_format,
                gemini_model: self.model,
                telegram_chat_id: self.chat_id,
                ..schedule
            },
        }
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse::<LogFormat>().map_err(|error| error.to_string())
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = execute(cli);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

pub fn execute(cli: Cli) -> commands::CommandResult {
    let Cli { global, command } = cli;

    match command {
        Command::Run { events } => {
            commands::run::run(global.load_options(ConfigOverrides::default()), events)
        }
        Command::Serve { interval_secs, daily_at, run_immediately } => {
            let schedule = ConfigOverrides {
                schedule_interval_secs: interval_secs,
                schedule_daily_at: daily_at,
                run_immediately: run_immediately.then_some(true),
                ..ConfigOverrides::default()
            };
            commands::serve::run(global.load_options(schedule))
        }
        Command::Config => commands::config::run(global.load_options(ConfigOverrides::default())),
        Command::Doctor { json } => {
            commands::doctor::run(global.load_options(ConfigOverrides::default()), json)
        }
    }
}
