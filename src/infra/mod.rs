//! Production implementations of the upstream capabilities.

pub mod legacy;
pub mod relay;
