/// Router Module Index
///
/// Routes are split by access level so the auth layer is applied once, at the
/// module boundary, rather than handler by handler.

/// Routes reachable without a token: login, registration, logout, health.
pub mod public;

/// Routes behind the bearer-token auth layer.
pub mod authenticated;
