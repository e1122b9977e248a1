// Copyright 2024 Trustoken Contributors
// See LICENSE.txt file for terms

//! The primitive crypto engine collaborator.
//!
//! The token core validates templates and enforces policy; the actual
//! key material work is delegated through this trait to the hosting
//! environment. The software engine implements the parts that are pure
//! entropy work and leaves asymmetric generation and derivation to the
//! embedder.

use std::fmt::Debug;

use crate::attribute::{Attribute, Attrs};
use crate::error::Result;
use crate::object::Object;
use crate::pkcs11::*;
use crate::rng;

pub trait CryptoEngine: Debug + Send + Sync {
    /// Fills the buffer with random bytes
    fn generate_random(&mut self, data: &mut [u8]) -> Result<()> {
        rng::generate_random(data)
    }

    /// Generates the key material for a built secret key object
    fn generate_key(
        &mut self,
        mechanism: CK_MECHANISM_TYPE,
        key: &mut Object,
    ) -> Result<()>;

    /// Generates the key material for a built key pair
    fn generate_key_pair(
        &mut self,
        mechanism: CK_MECHANISM_TYPE,
        public_key: &mut Object,
        private_key: &mut Object,
    ) -> Result<()>;

    /// Derives the key material for a built secret key object from the
    /// parent key
    fn derive_key(
        &mut self,
        mechanism: CK_MECHANISM_TYPE,
        parent: &Attrs,
        key: &mut Object,
    ) -> Result<()>;
}

/// Software engine backed by the platform entropy source.
///
/// Symmetric secrets are high entropy random bytes of the requested
/// length. Everything else must come from the hosting environment.
#[derive(Debug, Default)]
pub struct SoftEngine {}

impl SoftEngine {
    pub fn new() -> SoftEngine {
        SoftEngine {}
    }
}

impl CryptoEngine for SoftEngine {
    fn generate_key(
        &mut self,
        _mechanism: CK_MECHANISM_TYPE,
        key: &mut Object,
    ) -> Result<()> {
        let value_len =
            usize::try_from(key.attributes().get_ulong(CKA_VALUE_LEN)?)?;
        let mut value = vec![0u8; value_len];
        rng::generate_random(value.as_mut_slice())?;
        key.set_attr(Attribute::from_bytes(CKA_VALUE, value))?;
        Ok(())
    }

    fn generate_key_pair(
        &mut self,
        _mechanism: CK_MECHANISM_TYPE,
        _public_key: &mut Object,
        _private_key: &mut Object,
    ) -> Result<()> {
        Err(RV_NOT_IMPLEMENTED)?
    }

    fn derive_key(
        &mut self,
        _mechanism: CK_MECHANISM_TYPE,
        _parent: &Attrs,
        _key: &mut Object,
    ) -> Result<()> {
        Err(RV_NOT_IMPLEMENTED)?
    }
}
