// Copyright 2024 Trustoken Contributors
// See LICENSE.txt file for terms

//! Session state as seen by the policy engine.
//!
//! The host environment serializes invocations against one token, so a
//! session is plain data: its read/write flag, the authentication state
//! of the token user (mirrored into each session on login and logout),
//! and the processing state machine of the one operation that may be
//! active on the session.

use crate::error::Result;
use crate::mechanism::Function;
use crate::pkcs11::*;

/// A session-bound state machine instance for one cryptographic
/// operation
#[derive(Debug, Clone)]
pub struct Processing {
    mechanism: CK_MECHANISM_TYPE,
    function: Function,
    /// The key mandates a fresh login before the operation completes
    always_authen: bool,
    /// The user logged in again after the operation was initialized
    relogged: bool,
    /// At least one update step was executed
    updated: bool,
}

impl Processing {
    pub fn new(
        mechanism: CK_MECHANISM_TYPE,
        function: Function,
        always_authen: bool,
    ) -> Processing {
        Processing {
            mechanism: mechanism,
            function: function,
            always_authen: always_authen,
            relogged: false,
            updated: false,
        }
    }

    pub fn mechanism(&self) -> CK_MECHANISM_TYPE {
        self.mechanism
    }

    pub fn function(&self) -> Function {
        self.function
    }

    pub fn always_authen(&self) -> bool {
        self.always_authen
    }

    pub fn relogged(&self) -> bool {
        self.relogged
    }

    pub fn set_relogged(&mut self) {
        self.relogged = true;
    }

    pub fn updated(&self) -> bool {
        self.updated
    }

    pub fn set_updated(&mut self) {
        self.updated = true;
    }
}

/// Authentication state a session operates under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUser {
    /// No user is authenticated
    Public,
    User,
    SecurityOfficer,
}

#[derive(Debug)]
pub struct Session {
    handle: CK_SESSION_HANDLE,
    read_write: bool,
    user: SessionUser,
    processing: Option<Processing>,
}

impl Session {
    pub fn new(handle: CK_SESSION_HANDLE, read_write: bool) -> Session {
        Session {
            handle: handle,
            read_write: read_write,
            user: SessionUser::Public,
            processing: None,
        }
    }

    pub fn get_handle(&self) -> CK_SESSION_HANDLE {
        self.handle
    }

    pub fn is_read_write(&self) -> bool {
        self.read_write
    }

    /// True when no user is authenticated on the token
    pub fn is_public(&self) -> bool {
        self.user == SessionUser::Public
    }

    /// True when the security officer is authenticated
    pub fn is_so(&self) -> bool {
        self.user == SessionUser::SecurityOfficer
    }

    /// Mirrors the token authentication state into the session.
    ///
    /// A re-login also clears the pending always-authenticate gate of a
    /// running processing.
    pub fn set_user(&mut self, user: SessionUser) {
        self.user = user;
        if user != SessionUser::Public {
            if let Some(ref mut p) = self.processing {
                p.set_relogged();
            }
        }
    }

    pub fn processing(&self) -> Result<&Processing> {
        match self.processing {
            Some(ref p) => Ok(p),
            None => Err(CKR_OPERATION_NOT_INITIALIZED)?,
        }
    }

    pub fn processing_mut(&mut self) -> Result<&mut Processing> {
        match self.processing {
            Some(ref mut p) => Ok(p),
            None => Err(CKR_OPERATION_NOT_INITIALIZED)?,
        }
    }

    /// Installs a new processing, only one can be active per session
    pub fn set_processing(&mut self, processing: Processing) -> Result<()> {
        if self.processing.is_some() {
            return Err(CKR_OPERATION_ACTIVE)?;
        }
        self.processing = Some(processing);
        Ok(())
    }

    pub fn remove_processing(&mut self) {
        self.processing = None;
    }
}
