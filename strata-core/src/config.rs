//! Generation options.
//!
//! Callers hand [`Configuration::resolve`] a loosely typed map of
//! options, in kebab-case or snake_case. Resolution fills in every
//! option that wasn't set explicitly, possibly from other options, then
//! checks a fixed list of cross-option rules. A [`Configuration`] is
//! immutable once resolved, and is the only way later stages read options.

use std::{fmt, path::PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resolved, validated generation options.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    pub azure_arm: bool,
    pub basic_setup_py: bool,
    pub builders_visibility: BuildersVisibility,
    pub client_side_validation: bool,
    pub combine_operation_files: bool,
    pub default_optional_constants_to_none: bool,
    pub emit_cross_language_definition_file: bool,
    pub flavor: Flavor,
    pub from_typespec: bool,
    pub generate_sample: bool,
    pub generate_test: bool,
    pub head_as_boolean: bool,
    pub keep_version_file: bool,
    pub low_level_client: bool,
    pub models_mode: ModelsMode,
    pub multiapi: bool,
    pub no_async: bool,
    pub no_namespace_folders: bool,
    pub only_path_and_body_params_positional: bool,
    pub package_files_config: Option<IndexMap<String, String>>,
    pub package_mode: Option<PackageMode>,
    pub package_name: Option<String>,
    pub package_pprint_name: Option<String>,
    pub package_version: Option<String>,
    pub packaging_files_dir: Option<String>,
    pub polymorphic_examples: u32,
    pub show_operations: bool,
    pub show_send_request: bool,
    pub tracing: bool,
    pub tsp_file: Option<PathBuf>,
    pub validate_versioning: bool,
    pub version_tolerant: bool,
}

impl Configuration {
    /// Resolves and validates a set of raw options.
    ///
    /// Keys may be written in kebab-case or snake_case; unrecognized
    /// keys are ignored. A `null` value is the same as leaving
    /// the option unset.
    pub fn resolve<K: AsRef<str>>(
        options: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<Self, ConfigurationError> {
        let raw = RawOptions::from_pairs(options)?;
        let config = Resolver { raw: &raw }.resolve()?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves a configuration with every option at its default.
    pub fn defaults() -> Result<Self, ConfigurationError> {
        Self::resolve(std::iter::empty::<(&str, Value)>())
    }

    /// Runs every rule in [`RULES`], failing on the first hard violation.
    fn validate(&self) -> Result<(), ConfigurationError> {
        for rule in RULES {
            if !(rule.violated)(self) {
                continue;
            }
            match rule.severity {
                Severity::Error => {
                    return Err(ConfigurationError::Conflict {
                        options: rule.options,
                        message: rule.message,
                    });
                }
                Severity::Warning => {
                    tracing::warn!(options = ?rule.options, "{}", rule.message);
                }
            }
        }
        Ok(())
    }

    /// Returns `true` if the output should target the legacy,
    /// non-version-tolerant surface.
    #[inline]
    pub fn is_legacy(&self) -> bool {
        !(self.version_tolerant || self.low_level_client)
    }

    #[inline]
    pub fn is_azure_flavor(&self) -> bool {
        self.flavor == Flavor::Azure
    }

    /// Returns the root module of the runtime library that generated
    /// code imports its pipeline and exception types from.
    #[inline]
    pub fn core_library(&self) -> &'static str {
        match self.flavor {
            Flavor::Azure => "azure.core",
            Flavor::Unbranded => "corehttp",
        }
    }

    /// Returns the folder name of the request-builder layer.
    #[inline]
    pub fn rest_layer_name(&self) -> &'static str {
        match self.builders_visibility {
            BuildersVisibility::Public => "rest",
            _ => "_rest",
        }
    }
}

/// The runtime library family that generated code targets.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flavor {
    #[default]
    Azure,
    Unbranded,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Azure => "azure",
            Self::Unbranded => "unbranded",
        })
    }
}

/// Whether request builders are part of the public surface,
/// emitted privately, or embedded in the operation files.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildersVisibility {
    Public,
    Hidden,
    Embedded,
}

/// How models are represented in generated code.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelsMode {
    /// Models are plain JSON mappings; no model classes are emitted.
    None,
    /// Models are serializer-driven classes.
    Msrest,
    /// Models are dict-backed classes with typed fields.
    Dpg,
}

impl ModelsMode {
    #[inline]
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Parses a `models-mode` value. `false` is accepted as a synonym
    /// for `none`.
    fn from_value(value: &Value) -> Result<Self, ConfigurationError> {
        match value {
            Value::Bool(false) => Ok(Self::None),
            Value::String(s) => match s.as_str() {
                "none" => Ok(Self::None),
                "msrest" => Ok(Self::Msrest),
                "dpg" => Ok(Self::Dpg),
                other => Err(ConfigurationError::InvalidValue {
                    option: "models-mode".to_owned(),
                    message: format!(
                        "unknown variant `{other}`, expected one of `msrest`, `dpg`, `none`"
                    ),
                }),
            },
            other => Err(ConfigurationError::InvalidValue {
                option: "models-mode".to_owned(),
                message: format!("expected a string or `false`, got `{other}`"),
            }),
        }
    }
}

/// The packaging scaffold to emit alongside the sources.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageMode {
    Dataplane,
    Mgmtplane,
    AzureDataplane,
    AzureMgmt,
    Generic,
    /// A directory of packaging templates.
    Template(PathBuf),
}

impl PackageMode {
    /// Parses a package mode. Built-in modes only apply to the
    /// specification source they belong to; any other value names a
    /// template directory.
    pub fn parse(value: &str, from_typespec: bool) -> Self {
        match (value, from_typespec) {
            ("dataplane", false) => Self::Dataplane,
            ("mgmtplane", false) => Self::Mgmtplane,
            ("azure-dataplane", true) => Self::AzureDataplane,
            ("azure-mgmt", true) => Self::AzureMgmt,
            ("generic", true) => Self::Generic,
            (path, _) => Self::Template(PathBuf::from(path)),
        }
    }
}

/// Options as given by the caller, before defaults are filled in.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawOptions {
    azure_arm: Option<bool>,
    basic_setup_py: Option<bool>,
    builders_visibility: Option<BuildersVisibility>,
    client_side_validation: Option<bool>,
    combine_operation_files: Option<bool>,
    default_optional_constants_to_none: Option<bool>,
    emit_cross_language_definition_file: Option<bool>,
    flavor: Option<Flavor>,
    from_typespec: Option<bool>,
    generate_sample: Option<bool>,
    generate_test: Option<bool>,
    head_as_boolean: Option<bool>,
    keep_version_file: Option<bool>,
    low_level_client: Option<bool>,
    models_mode: Option<Value>,
    multiapi: Option<bool>,
    no_async: Option<bool>,
    no_namespace_folders: Option<bool>,
    only_path_and_body_params_positional: Option<bool>,
    package_files_config: Option<Value>,
    package_mode: Option<String>,
    package_name: Option<String>,
    package_pprint_name: Option<String>,
    package_version: Option<String>,
    packaging_files_dir: Option<String>,
    polymorphic_examples: Option<u32>,
    show_operations: Option<bool>,
    show_send_request: Option<bool>,
    tracing: Option<bool>,
    tsp_file: Option<PathBuf>,
    validate_versioning: Option<bool>,
    version_tolerant: Option<bool>,
}

impl RawOptions {
    fn from_pairs<K: AsRef<str>>(
        options: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<Self, ConfigurationError> {
        let map: Map<String, Value> = options
            .into_iter()
            .map(|(key, value)| (key.as_ref().replace('_', "-"), value))
            .collect();
        serde_path_to_error::deserialize(Value::Object(map)).map_err(|err| {
            ConfigurationError::InvalidValue {
                option: err.path().to_string(),
                message: err.into_inner().to_string(),
            }
        })
    }
}

/// Computes each option from its explicit value, or its default.
struct Resolver<'r> {
    raw: &'r RawOptions,
}

impl Resolver<'_> {
    fn resolve(&self) -> Result<Configuration, ConfigurationError> {
        let raw = self.raw;
        Ok(Configuration {
            azure_arm: self.azure_arm(),
            basic_setup_py: raw.basic_setup_py.unwrap_or(false),
            builders_visibility: self.builders_visibility(),
            client_side_validation: raw.client_side_validation.unwrap_or(false),
            combine_operation_files: self.combine_operation_files(),
            default_optional_constants_to_none: raw
                .default_optional_constants_to_none
                .unwrap_or_else(|| self.low_level_client() || self.version_tolerant()),
            emit_cross_language_definition_file: raw
                .emit_cross_language_definition_file
                .unwrap_or(false),
            flavor: self.flavor(),
            from_typespec: self.from_typespec(),
            generate_sample: raw.generate_sample.unwrap_or(false),
            generate_test: raw.generate_test.unwrap_or(false),
            head_as_boolean: self.head_as_boolean(),
            keep_version_file: raw.keep_version_file.unwrap_or(false),
            low_level_client: self.low_level_client(),
            models_mode: self.models_mode()?,
            multiapi: raw.multiapi.unwrap_or(false),
            no_async: raw.no_async.unwrap_or(false),
            no_namespace_folders: raw.no_namespace_folders.unwrap_or(false),
            only_path_and_body_params_positional: raw
                .only_path_and_body_params_positional
                .unwrap_or_else(|| self.low_level_client() || self.version_tolerant()),
            package_files_config: self.package_files_config()?,
            package_mode: self.package_mode(),
            package_name: raw.package_name.clone(),
            package_pprint_name: self.package_pprint_name(),
            package_version: raw.package_version.clone(),
            packaging_files_dir: raw.packaging_files_dir.clone(),
            polymorphic_examples: raw.polymorphic_examples.unwrap_or(5),
            show_operations: self.show_operations(),
            show_send_request: raw
                .show_send_request
                .unwrap_or_else(|| self.low_level_client() || self.version_tolerant()),
            tracing: self.tracing(),
            tsp_file: raw.tsp_file.clone(),
            validate_versioning: raw.validate_versioning.unwrap_or(true),
            version_tolerant: self.version_tolerant(),
        })
    }

    fn azure_arm(&self) -> bool {
        self.raw.azure_arm.unwrap_or(false)
    }

    /// Management-plane output always treats `HEAD` responses as
    /// booleans, whatever was asked for.
    fn head_as_boolean(&self) -> bool {
        self.azure_arm() || self.raw.head_as_boolean.unwrap_or(true)
    }

    fn low_level_client(&self) -> bool {
        self.raw.low_level_client.unwrap_or(false)
    }

    fn version_tolerant(&self) -> bool {
        self.raw.version_tolerant.unwrap_or(true)
    }

    fn from_typespec(&self) -> bool {
        self.raw.from_typespec.unwrap_or(false)
    }

    fn flavor(&self) -> Flavor {
        self.raw.flavor.unwrap_or_default()
    }

    fn show_operations(&self) -> bool {
        self.raw
            .show_operations
            .unwrap_or_else(|| !self.low_level_client())
    }

    fn tracing(&self) -> bool {
        self.raw
            .tracing
            .unwrap_or_else(|| self.show_operations() && self.flavor() == Flavor::Azure)
    }

    fn combine_operation_files(&self) -> bool {
        self.raw
            .combine_operation_files
            .unwrap_or_else(|| self.version_tolerant() && self.show_operations())
    }

    fn builders_visibility(&self) -> BuildersVisibility {
        self.raw.builders_visibility.unwrap_or_else(|| {
            if self.low_level_client() {
                BuildersVisibility::Public
            } else {
                BuildersVisibility::Embedded
            }
        })
    }

    /// An explicit `models-mode` always wins. Otherwise, the default
    /// follows the client surface, unless a TypeSpec source file is
    /// present, in which case models are always dict-backed.
    fn models_mode(&self) -> Result<ModelsMode, ConfigurationError> {
        if let Some(value) = &self.raw.models_mode {
            return ModelsMode::from_value(value);
        }
        if self.raw.tsp_file.is_some() {
            return Ok(ModelsMode::Dpg);
        }
        Ok(if self.low_level_client() || self.version_tolerant() {
            ModelsMode::None
        } else {
            ModelsMode::Msrest
        })
    }

    fn package_mode(&self) -> Option<PackageMode> {
        self.raw
            .package_mode
            .as_deref()
            .or(self.raw.packaging_files_dir.as_deref())
            .filter(|mode| !mode.is_empty())
            .map(|mode| PackageMode::parse(mode, self.from_typespec()))
    }

    fn package_pprint_name(&self) -> Option<String> {
        if let Some(name) = &self.raw.package_pprint_name {
            return Some(name.clone());
        }
        let name = self.raw.package_name.as_deref()?;
        Some(
            name.split(['-', '_', '.'])
                .filter(|word| !word.is_empty())
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    /// Accepts either a mapping, or a `key:value|key:value` string.
    fn package_files_config(&self) -> Result<Option<IndexMap<String, String>>, ConfigurationError> {
        let invalid = |message: String| ConfigurationError::InvalidValue {
            option: "package-files-config".to_owned(),
            message,
        };
        match &self.raw.package_files_config {
            None => Ok(None),
            Some(Value::String(s)) => s
                .split('|')
                .filter(|pair| !pair.is_empty())
                .map(|pair| {
                    let (key, value) = pair
                        .split_once(':')
                        .ok_or_else(|| invalid(format!("expected `key:value`, got `{pair}`")))?;
                    Ok((key.trim().to_owned(), value.trim().to_owned()))
                })
                .collect::<Result<_, _>>()
                .map(Some),
            Some(Value::Object(map)) => Ok(Some(
                map.iter()
                    .map(|(key, value)| {
                        let value = match value {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (key.clone(), value)
                    })
                    .collect(),
            )),
            Some(other) => Err(invalid(format!(
                "expected a string or a mapping, got `{other}`"
            ))),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Severity {
    Error,
    Warning,
}

/// A cross-option rule. Each names exactly the two options involved.
struct Rule {
    options: [&'static str; 2],
    message: &'static str,
    severity: Severity,
    violated: fn(&Configuration) -> bool,
}

const RULES: &[Rule] = &[
    Rule {
        options: ["builders-visibility", "show-operations"],
        message: "embedded request builders can only be generated alongside operations",
        severity: Severity::Error,
        violated: |c| c.builders_visibility == BuildersVisibility::Embedded && !c.show_operations,
    },
    Rule {
        options: ["basic-setup-py", "package-version"],
        message: "a package version is needed to generate `setup.py`",
        severity: Severity::Error,
        violated: |c| c.basic_setup_py && c.package_version.is_none(),
    },
    Rule {
        options: ["package-mode", "package-version"],
        message: "a package version is needed to generate packaging files",
        severity: Severity::Error,
        violated: |c| c.package_mode.is_some() && c.package_version.is_none(),
    },
    Rule {
        options: ["combine-operation-files", "show-operations"],
        message: "operation files can only be combined when operations are generated",
        severity: Severity::Error,
        violated: |c| c.combine_operation_files && !c.show_operations,
    },
    Rule {
        options: ["multiapi", "version-tolerant"],
        message: "multi-API generation isn't version-tolerant",
        severity: Severity::Error,
        violated: |c| c.multiapi && c.version_tolerant,
    },
    Rule {
        options: ["client-side-validation", "version-tolerant"],
        message: "client-side validation isn't supported for version-tolerant clients",
        severity: Severity::Error,
        violated: |c| c.client_side_validation && c.version_tolerant,
    },
    Rule {
        options: ["tracing", "flavor"],
        message: "tracing is only available for the `azure` flavor",
        severity: Severity::Error,
        violated: |c| c.tracing && c.flavor != Flavor::Azure,
    },
    Rule {
        options: ["azure-arm", "version-tolerant"],
        message: "data-plane clients that aren't version-tolerant aren't a supported shipping shape",
        severity: Severity::Warning,
        violated: |c| !c.azure_arm && !c.version_tolerant,
    },
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("invalid value for option `{option}`: {message}")]
    InvalidValue { option: String, message: String },
    #[error("options `{}` and `{}` conflict: {message}", .options[0], .options[1])]
    Conflict {
        options: [&'static str; 2],
        message: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::tests::assert_matches;

    fn resolve(options: Value) -> Result<Configuration, ConfigurationError> {
        let Value::Object(map) = options else {
            panic!("expected an object; got `{options}`");
        };
        Configuration::resolve(map)
    }

    // MARK: Defaults

    #[test]
    fn test_defaults() {
        let config = Configuration::defaults().unwrap();
        assert!(config.version_tolerant);
        assert!(config.show_operations);
        assert!(config.tracing);
        assert!(config.combine_operation_files);
        assert!(config.show_send_request);
        assert!(config.head_as_boolean);
        assert_eq!(config.flavor, Flavor::Azure);
        assert_eq!(config.builders_visibility, BuildersVisibility::Embedded);
        assert_eq!(config.models_mode, ModelsMode::None);
        assert_eq!(config.polymorphic_examples, 5);
        assert_eq!(config.package_mode, None);
    }

    #[test]
    fn test_low_level_client() {
        let config = resolve(json!({"low_level_client": true})).unwrap();
        assert!(!config.show_operations);
        assert_eq!(config.builders_visibility, BuildersVisibility::Public);
        assert!(!config.combine_operation_files);
        assert!(!config.tracing);
        assert_eq!(config.rest_layer_name(), "rest");
    }

    #[test]
    fn test_legacy_defaults_to_msrest_models() {
        let config = resolve(json!({"version-tolerant": false})).unwrap();
        assert!(config.is_legacy());
        assert_eq!(config.models_mode, ModelsMode::Msrest);
        assert!(!config.show_send_request);
        assert!(!config.combine_operation_files);
    }

    #[test]
    fn test_snake_case_and_kebab_case_keys_are_equivalent() {
        let snake = resolve(json!({"no_namespace_folders": true})).unwrap();
        let kebab = resolve(json!({"no-namespace-folders": true})).unwrap();
        assert_eq!(snake, kebab);
        assert!(snake.no_namespace_folders);
    }

    #[test]
    fn test_null_is_unset() {
        let config = resolve(json!({"show-operations": null})).unwrap();
        assert!(config.show_operations);
    }

    #[test]
    fn test_azure_arm_forces_head_as_boolean() {
        let config = resolve(json!({"azure-arm": true, "head-as-boolean": false})).unwrap();
        assert!(config.head_as_boolean);

        let config = resolve(json!({"head-as-boolean": false})).unwrap();
        assert!(!config.head_as_boolean);
    }

    #[test]
    fn test_unbranded_disables_tracing_by_default() {
        let config = resolve(json!({"flavor": "unbranded"})).unwrap();
        assert!(!config.tracing);
        assert_eq!(config.core_library(), "corehttp");
    }

    // MARK: Models mode

    #[test]
    fn test_tsp_file_changes_derived_models_mode() {
        let config = resolve(json!({"tsp-file": "main.tsp"})).unwrap();
        assert_eq!(config.models_mode, ModelsMode::Dpg);
    }

    #[test]
    fn test_explicit_models_mode_wins_over_tsp_file() {
        let config = resolve(json!({"tsp-file": "main.tsp", "models-mode": "msrest"})).unwrap();
        assert_eq!(config.models_mode, ModelsMode::Msrest);
    }

    #[test]
    fn test_models_mode_false_means_none() {
        let config = resolve(json!({"version-tolerant": false, "models-mode": false})).unwrap();
        assert_eq!(config.models_mode, ModelsMode::None);
    }

    #[test]
    fn test_unknown_models_mode() {
        assert_matches!(
            resolve(json!({"models-mode": "pydantic"})),
            Err(ConfigurationError::InvalidValue { option, .. }) if option == "models-mode",
        );
    }

    // MARK: Values

    #[test]
    fn test_unknown_builders_visibility() {
        assert_matches!(
            resolve(json!({"builders_visibility": "secret"})),
            Err(ConfigurationError::InvalidValue { option, .. }) if option == "builders-visibility",
        );
    }

    #[test]
    fn test_wrong_value_type() {
        assert_matches!(
            resolve(json!({"no-async": "yes"})),
            Err(ConfigurationError::InvalidValue { option, .. }) if option == "no-async",
        );
    }

    #[test]
    fn test_package_mode_depends_on_source() {
        let config = resolve(json!({
            "package-mode": "dataplane",
            "package-version": "1.0.0",
        }))
        .unwrap();
        assert_eq!(config.package_mode, Some(PackageMode::Dataplane));

        let config = resolve(json!({
            "package-mode": "dataplane",
            "package-version": "1.0.0",
            "from-typespec": true,
        }))
        .unwrap();
        assert_eq!(
            config.package_mode,
            Some(PackageMode::Template(PathBuf::from("dataplane"))),
        );
    }

    #[test]
    fn test_package_mode_falls_back_to_packaging_files_dir() {
        let config = resolve(json!({
            "packaging-files-dir": "templates/pkg",
            "package-version": "1.0.0",
        }))
        .unwrap();
        assert_eq!(
            config.package_mode,
            Some(PackageMode::Template(PathBuf::from("templates/pkg"))),
        );
    }

    #[test]
    fn test_package_files_config() {
        let config = resolve(json!({
            "package-files-config": "title:Widgets|owner: contoso",
        }))
        .unwrap();
        let files = config.package_files_config.unwrap();
        assert_eq!(
            files.into_iter().collect::<Vec<_>>(),
            vec![
                ("title".to_owned(), "Widgets".to_owned()),
                ("owner".to_owned(), "contoso".to_owned()),
            ],
        );
    }

    #[test]
    fn test_package_pprint_name() {
        let config = resolve(json!({"package-name": "contoso-widgets"})).unwrap();
        assert_eq!(config.package_pprint_name.as_deref(), Some("Contoso Widgets"));
    }

    // MARK: Rules

    #[test]
    fn test_package_mode_requires_version() {
        let err = resolve(json!({"package_mode": "template", "package_version": null})).unwrap_err();
        assert_matches!(
            err,
            ConfigurationError::Conflict {
                options: ["package-mode", "package-version"],
                ..
            },
        );
        let message = err.to_string();
        assert!(message.contains("package-mode"), "{message}");
        assert!(message.contains("package-version"), "{message}");
    }

    #[test]
    fn test_embedded_builders_require_operations() {
        assert_matches!(
            resolve(json!({"show-operations": false, "combine-operation-files": false})),
            Err(ConfigurationError::Conflict {
                options: ["builders-visibility", "show-operations"],
                ..
            }),
        );
    }

    #[test]
    fn test_combined_files_require_operations() {
        assert_matches!(
            resolve(json!({
                "low-level-client": true,
                "combine-operation-files": true,
            })),
            Err(ConfigurationError::Conflict {
                options: ["combine-operation-files", "show-operations"],
                ..
            }),
        );
    }

    #[test]
    fn test_basic_setup_py_requires_version() {
        assert_matches!(
            resolve(json!({"basic-setup-py": true})),
            Err(ConfigurationError::Conflict {
                options: ["basic-setup-py", "package-version"],
                ..
            }),
        );
    }

    #[test]
    fn test_multiapi_excludes_version_tolerant() {
        assert_matches!(
            resolve(json!({"multiapi": true})),
            Err(ConfigurationError::Conflict {
                options: ["multiapi", "version-tolerant"],
                ..
            }),
        );
        assert!(resolve(json!({"multiapi": true, "version-tolerant": false})).is_ok());
    }

    #[test]
    fn test_client_side_validation_excludes_version_tolerant() {
        assert_matches!(
            resolve(json!({"client-side-validation": true})),
            Err(ConfigurationError::Conflict {
                options: ["client-side-validation", "version-tolerant"],
                ..
            }),
        );
    }

    #[test]
    fn test_tracing_requires_azure() {
        assert_matches!(
            resolve(json!({"flavor": "unbranded", "tracing": true})),
            Err(ConfigurationError::Conflict {
                options: ["tracing", "flavor"],
                ..
            }),
        );
    }

    #[test]
    fn test_soft_rule_does_not_fail() {
        let config = resolve(json!({"version-tolerant": false, "azure-arm": false})).unwrap();
        assert!(!config.version_tolerant);
    }
}
