// Copyright 2024 Trustoken Contributors
// See LICENSE.txt file for terms

use crate::error::{map_err, Result};
use crate::pkcs11::CKR_DEVICE_ERROR;

use getrandom;

/// Fills the buffer with bytes from the platform entropy source
pub fn generate_random(buf: &mut [u8]) -> Result<()> {
    map_err!(getrandom::getrandom(buf), CKR_DEVICE_ERROR)
}
