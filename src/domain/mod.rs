//! Domain value objects.
//!
//! The engine never authenticates anyone: it receives an already-resolved
//! tenant, user and role and uses them for isolation and privacy filtering.

pub mod context;
pub mod tenant;

pub use context::RequestContext;
pub use tenant::TenantId;
