#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{node} is missing required field `{field}`")]
    MissingField { node: String, field: String },
    #[error("field `{field}` of {node} should be {expected}")]
    WrongType {
        node: String,
        field: String,
        expected: &'static str,
    },
    #[error("unknown {field} `{value}`")]
    UnknownKind { field: &'static str, value: String },
    #[error("reference `{0}` doesn't point to anything")]
    DanglingRef(String),
    #[error("reference `{0}` is part of a reference cycle")]
    RefCycle(String),
    #[error("type `{0}` contains itself without passing through a model or enum")]
    UnboundedTypeCycle(String),
    #[error("model `{0}` inherits from itself")]
    InheritanceCycle(String),
    #[error("type graph construction didn't complete")]
    Incomplete,
}
