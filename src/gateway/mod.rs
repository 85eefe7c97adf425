// ABOUTME: Gateway to the remote stack provisioning API.
// ABOUTME: Capability traits, wire types, errors, HTTP client, and repository cache.

mod error;
mod http;
mod repository;
mod traits;
mod types;

pub use error::{GatewayError, GatewayErrorKind, StackError, TagError};
pub use http::{ConnectionConfig, HttpStackGateway};
pub use repository::StackRepository;
pub use traits::{StackOps, TagOps};
pub use types::{AnchorResource, Parameter, StackDescription, StackEvent, StackRequest};
