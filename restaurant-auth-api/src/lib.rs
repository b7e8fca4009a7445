//! # restaurant-auth-api
//!
//! Shared API types for the restaurant back-office authentication service.
//! This crate is designed to be WASM-compatible and can be used in both
//! backend (Rust) and frontend (WASM/TypeScript via wasm-bindgen) applications.
//!
//! ## Features
//!
//! - Request DTOs (`LoginRequest`, `RegisterOwnerRequest`, `CreateManagerRequest`)
//! - Response DTOs (`LoginResponse`, `RefreshTokenResponse`, `AuthUser`, ...)
//! - The `Role` enumeration used for authorization
//! - Error response format (`ErrorResponse`) and the stable error codes
//!
//! ## Example
//!
//! ```rust
//! use restaurant_auth_api::{LoginRequest, Role};
//!
//! let request = LoginRequest {
//!     email: "owner@example.com".to_string(),
//!     password: "password123".to_string(),
//! };
//! assert_eq!(Role::Owner.as_str(), "owner");
//! ```

pub mod error;
pub mod requests;
pub mod responses;
pub mod role;

// Re-exports for convenient access
pub use error::{ErrorResponse, codes};
pub use requests::*;
pub use responses::*;
pub use role::{ParseRoleError, Role};
