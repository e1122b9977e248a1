// Copyright 2024 Trustoken Contributors
// See LICENSE.txt file for terms

use crate::attribute::Attribute;
use crate::engine::{CryptoEngine, SoftEngine};
use crate::error::Result;
use crate::object::Object;
use crate::pkcs11::*;

mod attrs;
mod objects;
mod processing;

/// Builds raw wire templates the way the client library serializes them
pub struct TemplateBuilder {
    entries: Vec<u8>,
    count: u32,
}

impl TemplateBuilder {
    pub fn new() -> TemplateBuilder {
        TemplateBuilder {
            entries: Vec::new(),
            count: 0,
        }
    }

    fn push_entry(&mut self, id: CK_ATTRIBUTE_TYPE, value: &[u8]) {
        self.entries.extend_from_slice(&id.to_le_bytes());
        self.entries
            .extend_from_slice(&(value.len() as u32).to_le_bytes());
        self.entries.extend_from_slice(value);
        self.count += 1;
    }

    pub fn ulong(mut self, id: CK_ATTRIBUTE_TYPE, val: CK_ULONG) -> Self {
        self.push_entry(id, &val.to_le_bytes());
        self
    }

    pub fn boolean(mut self, id: CK_ATTRIBUTE_TYPE, val: bool) -> Self {
        self.push_entry(id, &[if val { CK_TRUE } else { CK_FALSE }]);
        self
    }

    pub fn bytes(mut self, id: CK_ATTRIBUTE_TYPE, val: &[u8]) -> Self {
        self.push_entry(id, val);
        self
    }

    pub fn nested(mut self, id: CK_ATTRIBUTE_TYPE, t: TemplateBuilder) -> Self {
        let blob = t.build();
        self.push_entry(id, &blob);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.entries.len());
        buf.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.count.to_le_bytes());
        buf.extend_from_slice(&self.entries);
        buf
    }
}

/// DER encoded P-256 curve OID, as carried in CKA_EC_PARAMS
pub fn p256_params() -> Vec<u8> {
    hex::decode("06082a8648ce3d030107").unwrap()
}

/// Scenario template: a raw AES key for import
pub fn aes_import_template() -> Vec<u8> {
    TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_AES)
        .bytes(CKA_VALUE, &[0u8; 16])
        .boolean(CKA_EXTRACTABLE, true)
        .boolean(CKA_SENSITIVE, false)
        .build()
}

/// An EC private signing key for import
pub fn ec_private_import_template() -> TemplateBuilder {
    TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_PRIVATE_KEY)
        .ulong(CKA_KEY_TYPE, CKK_EC)
        .bytes(CKA_EC_PARAMS, &p256_params())
        .bytes(CKA_VALUE, &[0x11u8; 32])
}

/// Engine stub that fills in deterministic key material where the
/// software engine defers to the hosting environment
#[derive(Debug)]
pub struct TestEngine {
    soft: SoftEngine,
}

impl TestEngine {
    pub fn new() -> TestEngine {
        TestEngine {
            soft: SoftEngine::new(),
        }
    }
}

impl CryptoEngine for TestEngine {
    fn generate_key(
        &mut self,
        mechanism: CK_MECHANISM_TYPE,
        key: &mut Object,
    ) -> Result<()> {
        self.soft.generate_key(mechanism, key)
    }

    fn generate_key_pair(
        &mut self,
        mechanism: CK_MECHANISM_TYPE,
        public_key: &mut Object,
        private_key: &mut Object,
    ) -> Result<()> {
        match mechanism {
            CKM_RSA_PKCS_KEY_PAIR_GEN => {
                let bits = usize::try_from(
                    public_key.attributes().get_ulong(CKA_MODULUS_BITS)?,
                )?;
                let modulus = vec![0xabu8; bits / 8];
                public_key.set_attr(Attribute::from_bytes(
                    CKA_MODULUS,
                    modulus.clone(),
                ))?;
                private_key
                    .set_attr(Attribute::from_bytes(CKA_MODULUS, modulus))?;
                private_key.set_attr(Attribute::from_bytes(
                    CKA_PRIVATE_EXPONENT,
                    vec![0xcdu8; bits / 8],
                ))?;
                Ok(())
            }
            CKM_EC_KEY_PAIR_GEN => {
                public_key.set_attr(Attribute::from_bytes(
                    CKA_EC_POINT,
                    vec![0x04u8; 65],
                ))?;
                private_key.set_attr(Attribute::from_bytes(
                    CKA_VALUE,
                    vec![0x11u8; 32],
                ))?;
                Ok(())
            }
            _ => Err(CKR_MECHANISM_INVALID)?,
        }
    }

    fn derive_key(
        &mut self,
        _mechanism: CK_MECHANISM_TYPE,
        _parent: &crate::attribute::Attrs,
        key: &mut Object,
    ) -> Result<()> {
        let len =
            usize::try_from(key.attributes().get_ulong(CKA_VALUE_LEN)?)?;
        key.set_attr(Attribute::from_bytes(CKA_VALUE, vec![0x5au8; len]))
    }
}
