// Copyright 2024 Trustoken Contributors
// See LICENSE.txt file for terms

//! Persistent storage of token objects.
//!
//! The token treats storage as a blob read/write service: objects are
//! handed over in their serialized attribute form and retrieved the
//! same way. The memory backend keeps everything in a map and is what
//! the tests run against.

use std::collections::HashMap;
use std::fmt::Debug;

use crate::error::{Error, Result};
use crate::pkcs11::*;

pub trait ObjectStore: Debug + Send + Sync {
    /// Writes the serialized object under the given id, replacing any
    /// previous blob
    fn store(&mut self, id: CK_OBJECT_HANDLE, blob: &[u8]) -> Result<()>;

    /// Reads back the serialized object
    fn load(&self, id: CK_OBJECT_HANDLE) -> Result<Vec<u8>>;

    /// Removes the serialized object
    fn remove(&mut self, id: CK_OBJECT_HANDLE) -> Result<()>;

    /// Lists the stored object ids
    fn ids(&self) -> Vec<CK_OBJECT_HANDLE>;
}

/// Storage backend that holds all blobs in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: HashMap<CK_OBJECT_HANDLE, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            objects: HashMap::new(),
        }
    }
}

impl ObjectStore for MemoryStore {
    fn store(&mut self, id: CK_OBJECT_HANDLE, blob: &[u8]) -> Result<()> {
        self.objects.insert(id, blob.to_vec());
        Ok(())
    }

    fn load(&self, id: CK_OBJECT_HANDLE) -> Result<Vec<u8>> {
        match self.objects.get(&id) {
            Some(blob) => Ok(blob.clone()),
            None => Err(Error::not_found(id.to_string())),
        }
    }

    fn remove(&mut self, id: CK_OBJECT_HANDLE) -> Result<()> {
        match self.objects.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::not_found(id.to_string())),
        }
    }

    fn ids(&self) -> Vec<CK_OBJECT_HANDLE> {
        self.objects.keys().cloned().collect()
    }
}
