mod client;
mod error;
mod imports;
mod inheritance;
mod model;
mod registry;
mod types;
mod view;

#[cfg(test)]
mod tests;

pub use client::{
    Client, ClientBuilder, Lro, Operation, OperationGroup, OperationIndex, OperationKind, Paging,
    Parameter, ParameterLocation, RequestBuilder, RequestBuilderDef, RequestBuilderIndex,
    Response, ResponseHeader, StatusCode,
};
pub use error::{DuplicateNameError, NotFoundError, UnsupportedCombinationError};
pub use imports::*;
pub use inheritance::sort_model_types;
pub use model::CodeModel;
pub use registry::{TypeRegistry, TypeRegistryBuilder, TypeSettings};
pub use types::*;
pub use view::{TypeContext, TypeView, declaration};
