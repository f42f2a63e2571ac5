use std::collections::HashSet;
use std::ffi::OsString;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command, CommandFactory, FromArgMatches};
use log::debug;

use crate::bind::bind;
use crate::error::{Error, Result};
use crate::flagset::parse_bool;
use crate::registry::FlagRegistry;

/// Registry view of a [`clap::Command`] and the arguments it will parse.
///
/// Arguments are keyed by their clap id, so a derive field `tls_cert` maps to
/// `PREFIX_TLS_CERT`. A value taken from the environment is checked against the
/// argument's value parser and then becomes its default, so clap still decides
/// the final value at parse time. A bound argument is no longer required on
/// the command line. Switches (`SetTrue`/`SetFalse`) accept the same boolean
/// spellings as [`FlagSet`](crate::FlagSet), such as `1` or `t`. Positional
/// arguments and the generated `--help`/`--version` switches are not bound.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    command: Command,
    args: Vec<OsString>,
}

impl CommandRegistry {
    pub fn new<I, T>(command: Command, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self {
            command,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Wrap `command` together with the arguments of the running process.
    pub fn from_process(command: Command) -> Self {
        Self::new(command, std::env::args_os())
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn into_command(self) -> Command {
        self.command
    }

    /// Parse the arguments against the (possibly rebound) command.
    pub fn get_matches(self) -> Result<ArgMatches> {
        Ok(self.command.try_get_matches_from(self.args)?)
    }

    fn find_flag(&self, name: &str) -> Option<&Arg> {
        self.command
            .get_arguments()
            .find(|arg| is_bindable(arg) && arg.get_id().as_str() == name)
    }

    /// Run `value` through the flag's value parser on a throwaway command.
    fn check_value(&self, name: &str, value: &str) -> std::result::Result<(), clap::Error> {
        // Building resolves the parsers implied by actions such as SetTrue.
        // The stored command stays unbuilt so later `mut_arg` calls are safe.
        let mut built = self.command.clone();
        built.build();
        let Some(arg) = built.get_arguments().find(|arg| arg.get_id().as_str() == name) else {
            return Ok(());
        };

        let scratch = Arg::new(arg.get_id().clone())
            .value_parser(arg.get_value_parser().clone())
            .action(ArgAction::Set)
            .allow_hyphen_values(true);
        Command::new(self.command.get_name().to_string())
            .no_binary_name(true)
            .arg(scratch)
            .try_get_matches_from([value])
            .map(|_| ())
    }
}

fn is_bindable(arg: &Arg) -> bool {
    !arg.is_positional()
        && !matches!(
            arg.get_action(),
            ArgAction::Help | ArgAction::HelpShort | ArgAction::HelpLong | ArgAction::Version
        )
}

fn is_switch(arg: &Arg) -> bool {
    matches!(arg.get_action(), ArgAction::SetTrue | ArgAction::SetFalse)
}

impl FlagRegistry for CommandRegistry {
    fn flag_names(&self) -> Vec<String> {
        self.command
            .get_arguments()
            .filter(|arg| is_bindable(arg))
            .map(|arg| arg.get_id().as_str().to_string())
            .collect()
    }

    fn explicitly_set(&self) -> HashSet<String> {
        // Only the value sources matter here; --help and friends are left for
        // the real parse to report.
        let matches = match self
            .command
            .clone()
            .ignore_errors(true)
            .try_get_matches_from(&self.args)
        {
            Ok(matches) => matches,
            Err(err) => {
                debug!("Pre-parse of {} stopped early: {}", self.command.get_name(), err.kind());
                return HashSet::new();
            }
        };

        self.flag_names()
            .into_iter()
            .filter(|name| matches.value_source(name) == Some(ValueSource::CommandLine))
            .collect()
    }

    fn set_value(&mut self, name: &str, value: &str) -> Result<()> {
        let arg = self
            .find_flag(name)
            .ok_or_else(|| Error::UnknownFlag(name.to_string()))?;
        let invalid = |reason: String| Error::InvalidValue {
            flag: name.to_string(),
            value: value.to_string(),
            reason,
        };

        let value = if is_switch(arg) {
            parse_bool(value).map_err(invalid)?.to_string()
        } else {
            value.to_string()
        };
        self.check_value(name, &value)
            .map_err(|err| invalid(clap_reason(&err)))?;

        let command = std::mem::take(&mut self.command);
        self.command = command.mut_arg(name, |arg| arg.default_value(value).required(false));
        Ok(())
    }

    fn append_usage(&mut self, name: &str, suffix: &str) {
        if self.find_flag(name).is_none() {
            return;
        }
        let command = std::mem::take(&mut self.command);
        self.command = command.mut_arg(name, |arg| {
            let help = arg
                .get_help()
                .map(|help| help.to_string())
                .unwrap_or_default();
            arg.help(format!("{}{}", help, suffix))
        });
    }
}

/// First line of a clap error without its `error: ` tag.
fn clap_reason(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}

/// Bind `command` to `PREFIX_*` variables and parse the process arguments.
pub fn bind_command(prefix: &str, command: Command) -> Result<ArgMatches> {
    let mut registry = CommandRegistry::from_process(command);
    bind(prefix, &mut registry)?;
    registry.get_matches()
}

/// Parse a clap derive type from the process arguments, falling back to
/// `PREFIX_*` variables for every flag not given on the command line.
pub fn parse_with_env<T>(prefix: &str) -> Result<T>
where
    T: CommandFactory + FromArgMatches,
{
    let matches = bind_command(prefix, T::command())?;
    Ok(T::from_arg_matches(&matches)?)
}
