//! scalar-bridge-core: Platform-agnostic core of the scalar token bridge
//!
//! Verifies Matrix OpenID tokens with the issuing homeserver and converts the
//! verified user ID into a locally signed scalar token that widget endpoints
//! can check without calling the homeserver again. Depends only on the
//! abstract platform traits (HttpClient, Environment).

pub mod config;
pub mod error;
pub mod identity;
pub mod matrix;
pub mod platform;
pub mod scalar;
pub mod token;

#[cfg(test)]
pub mod test_support;
