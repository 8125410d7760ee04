//! # Adapters Layer
//!
//! Implementations of the outbound ports, plus the HTTP surface.

pub mod disclosures;
pub mod http_layer;
pub mod key_resolver;
pub mod session_store;

pub use disclosures::InMemoryDisclosureStore;
pub use http_layer::{AsxLayer, AsxService, AuthenticatedCaller};
pub use key_resolver::{KeyDirectory, TimeoutResolver};
pub use session_store::InMemorySessionStore;
