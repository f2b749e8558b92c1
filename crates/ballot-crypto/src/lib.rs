//! Cryptographic building blocks for the ballot relay service.
//!
//! - [`VoteCipher`]: AES-256-GCM envelopes for ballot content, keyed from a
//!   configured secret.
//! - [`TokenAuthority`]: HS256 session tokens carrying identity and role.

pub mod cipher;
pub mod error;
pub mod token;

pub use cipher::VoteCipher;
pub use error::{Error, Result};
pub use token::{Claims, TokenAuthority};
