//! Matrix federation client pieces
//!
//! Resolves a homeserver name to its federation endpoint and exchanges
//! OpenID access tokens for the user ID they were issued to.

mod discovery;
mod userinfo;

pub use discovery::{parse_server_name, resolve_server, FederationEndpoint, ServerName};
pub use userinfo::lookup_user_info;
