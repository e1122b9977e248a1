// Copyright 2023 Trustoken Contributors
// See LICENSE.txt file for terms

//! Status reporting for the token core.
//!
//! Everything that can fail inside the core resolves to a Cryptoki
//! return value before crossing back to the client library. The error
//! object keeps that CK_RV together with just enough context to trace
//! why a template, attribute lookup or policy check rejected the
//! request. The internal RV_NOT_FOUND sentinel travels through this
//! type as well; the façade translates it before anything reaches a
//! client.

use std::error;
use std::fmt;

use crate::pkcs11::{CKR_GENERAL_ERROR, CK_RV, RV_NOT_FOUND};

/// The Result type used within the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Context carried along the Cryptoki return value
#[derive(Debug)]
enum Context {
    /// A bare status, nothing to add
    None,
    /// An attribute lookup missed; holds the attribute name
    MissingAttribute(String),
    /// A lower level failure that was mapped to a Cryptoki status
    Source(Box<dyn error::Error>),
}

/// A Cryptoki status paired with its rejection context
#[derive(Debug)]
pub struct Error {
    ckrv: CK_RV,
    context: Context,
}

impl Error {
    /// An error carrying a bare PKCS#11 return value
    pub fn ck_rv(ckrv: CK_RV) -> Error {
        Error {
            ckrv: ckrv,
            context: Context::None,
        }
    }

    /// An error mapping a lower level failure to a PKCS#11 return value
    pub fn ck_rv_from_error<E>(ckrv: CK_RV, error: E) -> Error
    where
        E: Into<Box<dyn error::Error>>,
    {
        Error {
            ckrv: ckrv,
            context: Context::Source(error.into()),
        }
    }

    /// A missed attribute lookup, named for tracing.
    ///
    /// Carries the internal RV_NOT_FOUND sentinel, which callers either
    /// handle (optional attributes) or translate to the appropriate
    /// template error.
    pub fn not_found(attribute: String) -> Error {
        Error {
            ckrv: RV_NOT_FOUND,
            context: Context::MissingAttribute(attribute),
        }
    }

    /// A failure with no better mapping than CKR_GENERAL_ERROR
    pub fn other_error<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error>>,
    {
        Error::ck_rv_from_error(CKR_GENERAL_ERROR, error)
    }

    /// The PKCS#11 return value for the client
    pub fn rv(&self) -> CK_RV {
        self.ckrv
    }

    /// True for a missed attribute lookup
    pub fn attr_not_found(&self) -> bool {
        self.ckrv == RV_NOT_FOUND
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.context {
            Context::None => write!(f, "CKR 0x{:08x}", self.ckrv),
            Context::MissingAttribute(ref a) => {
                write!(f, "attribute {} not found", a)
            }
            Context::Source(ref e) => {
                write!(f, "{} (CKR 0x{:08x})", e, self.ckrv)
            }
        }
    }
}

impl error::Error for Error {}

impl From<CK_RV> for Error {
    /// Lifts a naked PKCS#11 return value, so checks can be written
    /// as `Err(CKR_...)?`
    fn from(error: CK_RV) -> Error {
        Error::ck_rv(error)
    }
}

impl From<std::num::TryFromIntError> for Error {
    /// Integer width conversions of attribute values have no client
    /// facing status of their own
    fn from(error: std::num::TryFromIntError) -> Error {
        Error::other_error(error)
    }
}

impl From<std::array::TryFromSliceError> for Error {
    /// Fixed width reads out of wire buffers have no client facing
    /// status of their own
    fn from(error: std::array::TryFromSliceError) -> Error {
        Error::other_error(error)
    }
}

/// Helper to map an arbitrary error to a PKCS#11 return value
macro_rules! map_err {
    ($map:expr, $err:tt) => {{
        use crate::error::Error;
        $map.map_err(|e| Error::ck_rv_from_error($err, e))
    }};
}
pub(crate) use map_err;
