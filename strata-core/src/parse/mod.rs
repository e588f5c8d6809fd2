mod document;
mod error;

pub use document::*;
pub use error::InputError;
