//! Command-line flag layer.
//!
//! A [`FlagSet`] pairs a clap [`Command`] with the [`ArgMatches`] it produced,
//! so every declared argument can be turned into a configuration key whether
//! or not it was given.

use std::ffi::OsString;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};

use super::store::{Layer, Store, Value};

/// Key (and long flag name) holding the path to `sabnzbd.ini`.
pub const CONFIG_KEY: &str = "config";

/// Environment variable that can stand in for `--config`.
pub const CONFIG_ENV: &str = "SAB_CONFIG";

/// Register the Sabnzbd-specific flags on `command`.
pub fn register_flags(command: Command) -> Command {
    command.arg(
        Arg::new(CONFIG_KEY)
            .short('c')
            .long(CONFIG_KEY)
            .env(CONFIG_ENV)
            .value_name("FILE")
            .help("sabnzbd.ini config file for parsing authentication information"),
    )
}

/// Parsed command-line flags together with their definitions.
#[derive(Debug, Clone)]
pub struct FlagSet {
    command: Command,
    matches: ArgMatches,
}

impl FlagSet {
    /// Wrap matches previously produced by `command`.
    pub fn new(command: Command, matches: ArgMatches) -> Self {
        Self { command, matches }
    }

    /// Parse `args` (including the binary name) against `command`.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Command;
    /// use sabnzbd_exporter::config::{register_flags, FlagSet};
    ///
    /// let command = register_flags(Command::new("sabnzbd"));
    /// let flags = FlagSet::try_parse_from(command, ["sabnzbd", "-c", "sabnzbd.ini"]).unwrap();
    /// assert_eq!(
    ///     flags.matches().get_one::<String>("config").map(String::as_str),
    ///     Some("sabnzbd.ini")
    /// );
    /// ```
    pub fn try_parse_from<I, T>(mut command: Command, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = command.try_get_matches_from_mut(args)?;
        Ok(Self { command, matches })
    }

    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }

    /// Build the flag layer on top of what `accumulated` already holds.
    ///
    /// Flags given on the command line or through their environment alias
    /// always win. Defaults only fill keys no earlier layer has set.
    pub(crate) fn layer(&self, accumulated: &Store) -> Layer {
        let mut layer = Layer::new();

        for arg in self.command.get_arguments() {
            if matches!(
                arg.get_action(),
                ArgAction::Help | ArgAction::HelpShort | ArgAction::HelpLong | ArgAction::Version
            ) {
                continue;
            }

            let id = arg.get_id().as_str();
            let key = arg.get_long().unwrap_or(id);
            let Some(value) = self.value(arg) else {
                continue;
            };

            match self.matches.value_source(id) {
                Some(ValueSource::CommandLine) | Some(ValueSource::EnvVariable) => {
                    layer.insert(key, value)
                }
                Some(ValueSource::DefaultValue) if !accumulated.contains(key) => {
                    layer.insert(key, value)
                }
                _ => {}
            }
        }

        layer
    }

    fn value(&self, arg: &Arg) -> Option<Value> {
        let id = arg.get_id().as_str();
        match arg.get_action() {
            ArgAction::SetTrue | ArgAction::SetFalse => self
                .matches
                .try_get_one::<bool>(id)
                .ok()
                .flatten()
                .map(|flag| Value::Boolean(*flag)),
            ArgAction::Count => self
                .matches
                .try_get_one::<u8>(id)
                .ok()
                .flatten()
                .map(|count| Value::Integer(i64::from(*count))),
            // Repeated flags resolve to the last occurrence.
            _ => self
                .matches
                .try_get_raw(id)
                .ok()
                .flatten()
                .and_then(|raw| raw.last())
                .map(|raw| Value::String(raw.to_string_lossy().into_owned())),
        }
    }
}
