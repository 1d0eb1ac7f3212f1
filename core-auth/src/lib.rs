//! # Authentication Core
//!
//! OAuth 2.0 authorization-code flow with PKCE (RFC 7636) for a public
//! client, plus token persistence and the process-wide session.
//!
//! ## Overview
//!
//! - [`PkceMaterial`] - verifier/challenge/state generation
//! - [`Authorizer`] - builds the authorization redirect and exchanges the
//!   returned code for a token
//! - [`TokenStore`] - persists the bearer token and its absolute expiry
//! - [`Session`] / [`SessionHandle`] - the single authenticated session and
//!   its invalidation token
//!
//! ## Security
//!
//! - The client is public: the code exchange is bound by PKCE alone, no
//!   client secret is sent or stored.
//! - The `state` parameter is verified against the persisted value before
//!   any exchange (CSRF protection).
//! - Tokens, codes, and verifiers are never logged.

pub mod authorizer;
pub mod error;
pub mod pkce;
pub mod session;
pub mod token_store;

pub use authorizer::{Authorizer, TokenGrant};
pub use error::{AuthError, Result};
pub use pkce::PkceMaterial;
pub use session::{Session, SessionHandle};
pub use token_store::TokenStore;
