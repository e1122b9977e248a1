// Copyright 2023-2024 Trustoken Contributors
// See LICENSE.txt file for terms

//! The in-memory representation of PKCS#11 objects.
//!
//! An object owns exactly one attribute list, built by the builder in
//! this module's `builder` submodule. For key objects the zeroize flag
//! causes every attribute value to be scrubbed when the object is
//! dropped.

use crate::attribute::{Attribute, Attrs};
use crate::error::Result;
use crate::pkcs11::*;

pub mod builder;

pub use builder::{create_attributes_from_template, default_boolprop};

/// Helper macro that generates methods to check specific boolean
/// attributes on objects
macro_rules! create_bool_checker {
    (make $name:ident; from $id:expr) => {
        #[doc = concat!("Returns the value of [", stringify!($id), "] as a boolean")]
        #[allow(dead_code)]
        pub fn $name(&self) -> bool {
            self.attributes.get_bool($id)
        }
    };
}

/// A generic container for all PKCS#11 objects
#[derive(Debug, Clone)]
pub struct Object {
    /// The object handle value
    ///
    /// Can be CK_INVALID_HANDLE on new objects
    handle: CK_OBJECT_HANDLE,
    /// The session this object is tied to
    ///
    /// Set to CK_INVALID_HANDLE for token objects
    session: CK_SESSION_HANDLE,
    /// The object attributes
    attributes: Attrs,
    /// Flag to indicate the attributes must be zeroized when the object
    /// is dropped. Set for objects containing secret or private keys.
    zeroize: bool,
}

impl Drop for Object {
    fn drop(&mut self) {
        if self.zeroize {
            for a in self.attributes.iter_mut() {
                a.zeroize()
            }
        }
    }
}

impl Object {
    /// Wraps a built attribute list into an object
    pub fn from_attributes(attributes: Attrs) -> Object {
        Object {
            handle: CK_INVALID_HANDLE,
            session: CK_INVALID_HANDLE,
            attributes: attributes,
            zeroize: false,
        }
    }

    /// Set zeroization for the whole object, performed when the object
    /// is dropped and memory is freed
    pub fn set_zeroize(&mut self) {
        self.zeroize = true;
    }

    pub fn set_handle(&mut self, h: CK_OBJECT_HANDLE) {
        self.handle = h
    }

    pub fn get_handle(&self) -> CK_OBJECT_HANDLE {
        self.handle
    }

    pub fn set_session(&mut self, s: CK_SESSION_HANDLE) {
        self.session = s
    }

    pub fn get_session(&self) -> CK_SESSION_HANDLE {
        self.session
    }

    /// Gets the object's class, CKO_UNDEFINED when unset
    pub fn get_class(&self) -> CK_OBJECT_CLASS {
        self.attributes.get_class()
    }

    /// Gets the object's key type, CKK_UNDEFINED when unset
    pub fn get_key_type(&self) -> CK_KEY_TYPE {
        self.attributes.get_key_type()
    }

    create_bool_checker! {make is_token; from CKA_TOKEN}
    create_bool_checker! {make is_private; from CKA_PRIVATE}
    create_bool_checker! {make is_sensitive; from CKA_SENSITIVE}
    create_bool_checker! {make is_extractable; from CKA_EXTRACTABLE}
    create_bool_checker! {make is_local; from CKA_LOCAL}
    create_bool_checker! {make is_modifiable; from CKA_MODIFIABLE}
    create_bool_checker! {make is_copyable; from CKA_COPYABLE}
    create_bool_checker! {make is_destroyable; from CKA_DESTROYABLE}
    create_bool_checker! {make always_auth; from CKA_ALWAYS_AUTHENTICATE}

    /// Gets a reference to the attribute list
    pub fn attributes(&self) -> &Attrs {
        &self.attributes
    }

    /// Gets a mutable reference to the attribute list
    pub fn attributes_mut(&mut self) -> &mut Attrs {
        &mut self.attributes
    }

    /// Sets or replaces an attribute on the object
    pub fn set_attr(&mut self, a: Attribute) -> Result<()> {
        self.attributes.set(a)
    }

    /// Serializes the object attributes into persistable form
    pub fn serialize(&self) -> Vec<u8> {
        self.attributes.serialize()
    }

    /// Rebuilds an object from its persisted form
    pub fn deserialize(buf: &[u8]) -> Result<Object> {
        Ok(Object::from_attributes(Attrs::deserialize(buf)?))
    }
}
