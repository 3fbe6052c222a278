//! SI documents: fetching, the element model and bearer validation.

mod document;
mod fetch;
mod validate;

pub use document::{Bearer, ElementId, SiDocument, SiError};
pub use fetch::fetch_document;
pub use validate::{BearerValidator, RemovalReason, RemovedBearer};
