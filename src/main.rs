use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use flagenv::{format_name, parse_with_env, Environment, ProcessEnv};
use log::{debug, info};

/// Prefix for this program's own settings, e.g. FLAGENV_PREFIX
const ENV_PREFIX: &str = "FLAGENV";

/// Print the environment variable names that flag identifiers map to
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set logging level
    #[arg(long, value_enum, default_value_t = LogLevel::Error)]
    log_level: LogLevel,

    /// Prefix for the generated variable names
    #[arg(long, value_name = "PREFIX", default_value = "APP")]
    prefix: String,

    /// Print NAME=value for every variable currently set in the environment
    #[arg(long)]
    export: bool,

    /// Flag identifiers to convert, e.g. tlsCert
    #[arg(required = true, value_name = "IDENTIFIER")]
    identifiers: Vec<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn main() -> Result<()> {
    let cli = match parse_with_env::<Cli>(ENV_PREFIX) {
        Ok(cli) => cli,
        // Usage errors, --help and --version print and exit the way clap does
        Err(flagenv::Error::Command(err)) => err.exit(),
        Err(err) => return Err(err).context("Failed to apply FLAGENV_* settings"),
    };

    // Initialize logger
    env_logger::Builder::new()
        .filter_level(cli.log_level.to_filter())
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    debug!("CLI arguments: {:#?}", cli);

    for identifier in &cli.identifiers {
        let name = format_name(&cli.prefix, identifier);
        debug!("{} -> {}", identifier, name);

        if !cli.export {
            println!("{}", name);
            continue;
        }

        match ProcessEnv.get(&name).filter(|val| !val.is_empty()) {
            Some(val) => println!("{}={}", name, val),
            None => info!("{} is not set, skipping", name),
        }
    }

    Ok(())
}
