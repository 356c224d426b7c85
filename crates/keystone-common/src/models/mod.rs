//! Declarative models: what the server should look like.

pub mod role;
pub mod scheme;
pub mod structure;

pub use role::*;
pub use scheme::*;
pub use structure::*;
