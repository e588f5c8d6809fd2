use std::{io::ErrorKind as IoErrorKind, path::PathBuf};

use clap::{
    CommandFactory, FromArgMatches,
    error::{ErrorKind as ClapErrorKind, Result as ClapResult},
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// The name of the per-output configuration file.
pub const CONFIG_FILE_NAME: &str = ".strata.toml";

#[derive(Debug)]
pub struct Main {
    pub verbose: bool,
    pub command: Command,
}

impl Main {
    pub fn parse() -> ClapResult<Main> {
        let mut cmd = MainArgs::command();
        let mut matches = cmd
            .try_get_matches_from_mut(std::env::args_os())
            .map_err(|err| err.format(&mut cmd))?;
        let args =
            MainArgs::from_arg_matches_mut(&mut matches).map_err(|err| err.format(&mut cmd))?;

        let command = match args.command {
            CommandArgs::Generate(GenerateArgs {
                input,
                output,
                options,
            }) => {
                let file: Option<ConfigFile> = {
                    let path = output.join(CONFIG_FILE_NAME);
                    match std::fs::read_to_string(&path) {
                        Ok(contents) => Some(toml::from_str(&contents).map_err(|err| {
                            cmd.error(
                                ClapErrorKind::ValueValidation,
                                format!("Failed to parse `{}`: {err}", path.display()),
                            )
                        })?),
                        Err(err) if err.kind() == IoErrorKind::NotFound => None,
                        Err(err) => {
                            return Err(cmd.error(
                                ClapErrorKind::Io,
                                format!("Failed to read `{}`: {err}", path.display()),
                            ));
                        }
                    }
                };

                // Flags override the file.
                let mut merged = file.map(|file| file.options).unwrap_or_default();
                merged.extend(options);

                Command::Generate(Generate {
                    input,
                    output,
                    options: merged,
                })
            }
        };

        Ok(Main {
            verbose: args.verbose,
            command,
        })
    }
}

#[derive(Debug)]
pub enum Command {
    Generate(Generate),
}

#[derive(Debug)]
pub struct Generate {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Raw generation options, from the configuration file and flags.
    pub options: IndexMap<String, Value>,
}

#[derive(Debug, clap::Parser)]
#[command(version, about, long_about = None)]
struct MainArgs {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: CommandArgs,
}

#[derive(Debug, clap::Subcommand)]
enum CommandArgs {
    /// Generate a Python client package from a code model.
    Generate(GenerateArgs),
}

#[derive(Debug, clap::Args)]
struct GenerateArgs {
    /// The path to the code model (`.yaml` or `.json`).
    input: PathBuf,

    /// The output directory for the generated files.
    output: PathBuf,

    /// A generation option, like `models-mode=msrest`. Values are parsed
    /// as YAML scalars; a bare `key` sets the option to `true`.
    /// Overrides `[options]` in `.strata.toml`.
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    options: Vec<(String, Value)>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    options: IndexMap<String, Value>,
}

/// Options whose values are always strings, even when they look
/// like numbers or booleans.
const STRING_OPTIONS: &[&str] = &[
    "package-mode",
    "package-name",
    "package-pprint-name",
    "package-version",
    "packaging-files-dir",
    "tsp-file",
];

fn parse_option(arg: &str) -> Result<(String, Value), String> {
    let Some((key, value)) = arg.split_once('=') else {
        return Ok((arg.to_owned(), Value::Bool(true)));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing option name in `{arg}`"));
    }
    if value.trim().is_empty() {
        return Ok((key.to_owned(), Value::Null));
    }
    if STRING_OPTIONS.contains(&key.replace('_', "-").as_str()) {
        return Ok((key.to_owned(), Value::String(value.trim().to_owned())));
    }
    let value: Value = serde_yaml::from_str(value)
        .map_err(|err| format!("invalid value for `{key}`: {err}"))?;
    Ok((key.to_owned(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_parse_option_scalars() {
        assert_eq!(
            parse_option("models-mode=msrest").unwrap(),
            ("models-mode".to_owned(), json!("msrest")),
        );
        assert_eq!(
            parse_option("no-async=true").unwrap(),
            ("no-async".to_owned(), json!(true)),
        );
        assert_eq!(
            parse_option("polymorphic-examples=3").unwrap(),
            ("polymorphic-examples".to_owned(), json!(3)),
        );
        assert_eq!(
            parse_option("package-version=1.0.0b1").unwrap(),
            ("package-version".to_owned(), json!("1.0.0b1")),
        );
    }

    #[test]
    fn test_parse_option_keeps_string_options_as_strings() {
        assert_eq!(
            parse_option("package-version=1.0").unwrap(),
            ("package-version".to_owned(), json!("1.0")),
        );
        assert_eq!(
            parse_option("package_name=2024").unwrap(),
            ("package_name".to_owned(), json!("2024")),
        );
        assert_eq!(
            parse_option("package-mode=true").unwrap(),
            ("package-mode".to_owned(), json!("true")),
        );
        // Other options still parse as scalars.
        assert_eq!(
            parse_option("polymorphic-examples=1").unwrap(),
            ("polymorphic-examples".to_owned(), json!(1)),
        );
    }

    #[test]
    fn test_string_option_resolves() {
        let (key, value) = parse_option("package-version=1.0").unwrap();
        let config = strata_core::config::Configuration::resolve([(key, value)]).unwrap();
        assert_eq!(config.package_version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_parse_option_bare_flag() {
        assert_eq!(
            parse_option("low-level-client").unwrap(),
            ("low-level-client".to_owned(), json!(true)),
        );
    }

    #[test]
    fn test_parse_option_empty_value_is_null() {
        assert_eq!(
            parse_option("tracing=").unwrap(),
            ("tracing".to_owned(), Value::Null),
        );
    }

    #[test]
    fn test_parse_option_missing_name() {
        assert!(parse_option("=msrest").is_err());
    }

    #[test]
    fn test_config_file_options() {
        let file: ConfigFile = toml::from_str(indoc::indoc! {r#"
            [options]
            models-mode = "dpg"
            no-async = true
        "#})
        .unwrap();
        assert_eq!(file.options["models-mode"], json!("dpg"));
        assert_eq!(file.options["no-async"], json!(true));

        let file: ConfigFile = toml::from_str("").unwrap();
        assert!(file.options.is_empty());
    }
}
