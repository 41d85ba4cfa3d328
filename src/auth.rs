//! Identifiers, scope sets, and redacted secrets shared by adapters and flows.

pub mod id;
pub mod scope;
pub mod secret;

pub use id::*;
pub use scope::*;
pub use secret::*;
