use crate::{
    config::ConfigurationError,
    ir::{DuplicateNameError, NotFoundError, UnsupportedCombinationError},
    parse::InputError,
};

#[derive(Debug, thiserror::Error)]
pub enum SerdeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    JsonWithPath(#[from] serde_path_to_error::Error<serde_json::Error>),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    YamlWithPath(#[from] serde_path_to_error::Error<serde_yaml::Error>),
}

/// An error that aborts a generation run. None of these are recoverable:
/// either the full artifact plan is produced, or nothing is.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    DuplicateName(#[from] DuplicateNameError),
    #[error(transparent)]
    UnsupportedCombination(#[from] UnsupportedCombinationError),
}
