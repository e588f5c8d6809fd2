use crate::config::Flavor;

/// A reference that should have resolved inside a complete graph didn't.
#[derive(Debug, thiserror::Error)]
pub enum NotFoundError {
    #[error("no type was registered for {0}")]
    Type(String),
    #[error("initial operation of `{operation}` isn't in client `{client}`")]
    InitialOperation { client: String, operation: String },
    #[error("no request builder was registered for {0}")]
    RequestBuilder(String),
}

#[derive(Debug, thiserror::Error)]
#[error("two different models are named `{name}`")]
pub struct DuplicateNameError {
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
#[error("{feature} aren't supported for the `{flavor}` flavor")]
pub struct UnsupportedCombinationError {
    pub feature: &'static str,
    pub flavor: Flavor,
}
