// Copyright 2023 Trustoken Contributors
// See LICENSE.txt file for terms

//! Core of a PKCS#11 (Cryptoki v2.40) token service running inside a
//! trusted execution environment.
//!
//! The crate implements the object/attribute subsystem and the
//! mechanism gatekeeper: sanitization of client supplied attribute
//! templates, data-driven construction of complete objects, the static
//! mechanism catalog, and the policy engine consulted at every
//! processing step. The command transport, the cryptographic
//! primitives and the persistent storage are collaborators reached
//! through the [engine] and [storage] traits.

pub mod attribute;
pub mod engine;
pub mod error;
mod log;
pub mod mechanism;
pub mod object;
pub mod pkcs11;
pub mod policy;
pub mod rng;
pub mod sanitize;
pub mod session;
pub mod storage;
pub mod token;

pub use error::{Error, Result};
pub use token::Token;

#[cfg(test)]
mod tests;
