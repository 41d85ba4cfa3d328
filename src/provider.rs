//! Provider-facing descriptors (data) and adapters (behavior).
//!
//! `descriptor` exposes validated metadata (`ProviderDescriptor`) covering HTTPS-only
//! endpoints, the API base, default scopes, and provider quirks (scope delimiter, token
//! placement). `adapter` defines [`ProviderAdapter`], the per-platform half of the link
//! protocol, implemented by [`InstagramAdapter`] and [`LinkedinAdapter`] and selected at
//! runtime through the [`AdapterRegistry`].

pub mod adapter;
pub mod descriptor;
pub mod instagram;
pub mod linkedin;
pub mod registry;

mod client;

pub use adapter::*;
pub use descriptor::*;
pub use instagram::*;
pub use linkedin::*;
pub use registry::*;
