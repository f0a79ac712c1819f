//! # auth-adapters
//!
//! Identity Context implementations: turn an opaque caller token into a
//! resolved `Caller`. Token issuance and password handling live in the
//! external auth service.

#[cfg(feature = "auth-jwt")]
pub mod jwt;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtIdentityResolver;
