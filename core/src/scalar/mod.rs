//! Scalar (integration manager) API handlers
//!
//! Platform-neutral request/response handling for the endpoints the Matrix
//! client talks to. The hosting server only parses HTTP and maps errors.

pub mod account;
pub mod register;
pub mod widget;
