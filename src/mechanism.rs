// Copyright 2024 Trustoken Contributors
// See LICENSE.txt file for terms

//! The static mechanism catalog.
//!
//! One row per mechanism: the function flags PKCS#11 permits for it, the
//! subset of those functions this token actually exposes (an empty subset
//! means the mechanism is advertised only), whether the mechanism is
//! restricted to one-shot processing, and the key size bounds enforced on
//! generation for the mechanism's key family.

use bitflags::bitflags;

use crate::error::Result;
use crate::pkcs11::*;

bitflags! {
    /// PKCS#11 mechanism function flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MechFlags: CK_FLAGS {
        const ENCRYPT           = CKF_ENCRYPT;
        const DECRYPT           = CKF_DECRYPT;
        const DIGEST            = CKF_DIGEST;
        const SIGN              = CKF_SIGN;
        const SIGN_RECOVER      = CKF_SIGN_RECOVER;
        const VERIFY            = CKF_VERIFY;
        const VERIFY_RECOVER    = CKF_VERIFY_RECOVER;
        const GENERATE          = CKF_GENERATE;
        const GENERATE_KEY_PAIR = CKF_GENERATE_KEY_PAIR;
        const WRAP              = CKF_WRAP;
        const UNWRAP            = CKF_UNWRAP;
        const DERIVE            = CKF_DERIVE;
    }
}

const CIPHER: MechFlags = MechFlags::ENCRYPT.union(MechFlags::DECRYPT);
const WRAP_UNWRAP: MechFlags = MechFlags::WRAP.union(MechFlags::UNWRAP);
const CIPHER_WRAP: MechFlags = CIPHER.union(WRAP_UNWRAP);
const CIPHER_WRAP_DERIVE: MechFlags = CIPHER_WRAP.union(MechFlags::DERIVE);
const AUTH: MechFlags = MechFlags::SIGN.union(MechFlags::VERIFY);
const AUTH_RECOVER: MechFlags =
    MechFlags::SIGN_RECOVER.union(MechFlags::VERIFY_RECOVER);

/// The functions a client can run through the processing state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Import,
    Copy,
    Modify,
    Destroy,
    Digest,
    Generate,
    GeneratePair,
    Derive,
    Wrap,
    Unwrap,
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    SignRecover,
    VerifyRecover,
}

impl Function {
    /// The mechanism flag gating this function, empty for the object
    /// management functions that need no mechanism
    pub fn to_mech_flag(self) -> MechFlags {
        match self {
            Function::Digest => MechFlags::DIGEST,
            Function::Generate => MechFlags::GENERATE,
            Function::GeneratePair => MechFlags::GENERATE_KEY_PAIR,
            Function::Derive => MechFlags::DERIVE,
            Function::Wrap => MechFlags::WRAP,
            Function::Unwrap => MechFlags::UNWRAP,
            Function::Encrypt => MechFlags::ENCRYPT,
            Function::Decrypt => MechFlags::DECRYPT,
            Function::Sign => MechFlags::SIGN,
            Function::Verify => MechFlags::VERIFY,
            Function::SignRecover => MechFlags::SIGN_RECOVER,
            Function::VerifyRecover => MechFlags::VERIFY_RECOVER,
            _ => MechFlags::empty(),
        }
    }
}

/// The phase of a running processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Init,
    Oneshot,
    Update,
    Final,
}

/// One catalog row
#[derive(Debug)]
struct MechanismModes {
    id: CK_MECHANISM_TYPE,
    /// Functions PKCS#11 permits for this mechanism
    allowed: MechFlags,
    /// Functions this token exposes, always a subset of `allowed`.
    /// Empty means the mechanism is advertised but not usable.
    token: MechFlags,
    /// Cannot span multi-part (update) processing
    one_shot: bool,
    min_key_size: CK_ULONG,
    max_key_size: CK_ULONG,
    /// Key size unit: bits when true, bytes otherwise
    size_in_bits: bool,
}

macro_rules! mechanism {
    ($id:expr; $allowed:expr; $token:expr; $min:expr, $max:expr, bits $bits:expr) => {
        MechanismModes {
            id: $id,
            allowed: $allowed,
            token: $token,
            one_shot: false,
            min_key_size: $min,
            max_key_size: $max,
            size_in_bits: $bits,
        }
    };
    ($id:expr; $allowed:expr; $token:expr; $min:expr, $max:expr, bits $bits:expr; one_shot) => {
        MechanismModes {
            id: $id,
            allowed: $allowed,
            token: $token,
            one_shot: true,
            min_key_size: $min,
            max_key_size: $max,
            size_in_bits: $bits,
        }
    };
}

static MECHANISMS: [MechanismModes; 50] = [
    /* AES */
    mechanism!(CKM_AES_ECB; CIPHER_WRAP_DERIVE; CIPHER; 16, 32, bits false),
    mechanism!(CKM_AES_CBC; CIPHER_WRAP_DERIVE; CIPHER; 16, 32, bits false),
    mechanism!(CKM_AES_CBC_PAD; CIPHER_WRAP_DERIVE; CIPHER; 16, 32, bits false),
    mechanism!(CKM_AES_CTS; CIPHER_WRAP; CIPHER; 16, 32, bits false),
    mechanism!(CKM_AES_CTR; CIPHER_WRAP; CIPHER; 16, 32, bits false),
    mechanism!(CKM_AES_GCM; CIPHER_WRAP; CIPHER; 16, 32, bits false),
    mechanism!(CKM_AES_CCM; CIPHER_WRAP; CIPHER; 16, 32, bits false),
    mechanism!(CKM_AES_GMAC; AUTH.union(MechFlags::DERIVE); AUTH; 16, 32, bits false),
    mechanism!(CKM_AES_CMAC; AUTH; AUTH; 16, 32, bits false),
    mechanism!(CKM_AES_CMAC_GENERAL; AUTH; AUTH; 16, 32, bits false),
    mechanism!(CKM_AES_XCBC_MAC; AUTH; AUTH; 16, 32, bits false),
    mechanism!(CKM_AES_ECB_ENCRYPT_DATA; MechFlags::DERIVE; MechFlags::DERIVE; 16, 32, bits false),
    mechanism!(CKM_AES_CBC_ENCRYPT_DATA; MechFlags::DERIVE; MechFlags::DERIVE; 16, 32, bits false),
    mechanism!(CKM_AES_KEY_GEN; MechFlags::GENERATE; MechFlags::GENERATE; 16, 32, bits false),
    mechanism!(CKM_GENERIC_SECRET_KEY_GEN; MechFlags::GENERATE; MechFlags::GENERATE; 1, 4096, bits true),
    /* HMAC */
    mechanism!(CKM_MD5_HMAC; AUTH; AUTH; 16, 16, bits false),
    mechanism!(CKM_SHA_1_HMAC; AUTH; AUTH; 20, 20, bits false),
    mechanism!(CKM_SHA224_HMAC; AUTH; AUTH; 28, 28, bits false),
    mechanism!(CKM_SHA256_HMAC; AUTH; AUTH; 32, 32, bits false),
    mechanism!(CKM_SHA384_HMAC; AUTH; AUTH; 48, 48, bits false),
    mechanism!(CKM_SHA512_HMAC; AUTH; AUTH; 64, 64, bits false),
    /* EC */
    mechanism!(CKM_EC_KEY_PAIR_GEN; MechFlags::GENERATE_KEY_PAIR; MechFlags::GENERATE_KEY_PAIR; 160, 521, bits true),
    mechanism!(CKM_ECDSA; AUTH; AUTH; 160, 521, bits true; one_shot),
    mechanism!(CKM_ECDSA_SHA1; AUTH; AUTH; 160, 521, bits true),
    mechanism!(CKM_ECDSA_SHA224; AUTH; AUTH; 160, 521, bits true),
    mechanism!(CKM_ECDSA_SHA256; AUTH; AUTH; 160, 521, bits true),
    mechanism!(CKM_ECDSA_SHA384; AUTH; AUTH; 160, 521, bits true),
    mechanism!(CKM_ECDSA_SHA512; AUTH; AUTH; 160, 521, bits true),
    mechanism!(CKM_ECDH1_DERIVE; MechFlags::DERIVE; MechFlags::DERIVE; 160, 521, bits true),
    mechanism!(CKM_ECDH1_COFACTOR_DERIVE; MechFlags::DERIVE; MechFlags::DERIVE; 160, 521, bits true),
    mechanism!(CKM_ECMQV_DERIVE; MechFlags::DERIVE; MechFlags::empty(); 160, 521, bits true),
    mechanism!(CKM_ECDH_AES_KEY_WRAP; WRAP_UNWRAP; MechFlags::empty(); 160, 521, bits true),
    /* RSA */
    mechanism!(CKM_RSA_PKCS_KEY_PAIR_GEN; MechFlags::GENERATE_KEY_PAIR; MechFlags::GENERATE_KEY_PAIR; 512, 4096, bits true),
    mechanism!(CKM_RSA_PKCS; CIPHER_WRAP.union(AUTH).union(AUTH_RECOVER); CIPHER.union(AUTH); 512, 4096, bits true; one_shot),
    mechanism!(CKM_RSA_PKCS_PSS; AUTH; AUTH; 512, 4096, bits true; one_shot),
    mechanism!(CKM_RSA_PKCS_OAEP; CIPHER_WRAP; CIPHER_WRAP; 512, 4096, bits true; one_shot),
    mechanism!(CKM_RSA_9796; WRAP_UNWRAP.union(AUTH).union(AUTH_RECOVER); MechFlags::empty(); 512, 4096, bits true; one_shot),
    mechanism!(CKM_RSA_X_509; CIPHER_WRAP.union(AUTH).union(AUTH_RECOVER); MechFlags::empty(); 512, 4096, bits true; one_shot),
    mechanism!(CKM_SHA1_RSA_PKCS; AUTH; AUTH; 512, 4096, bits true),
    mechanism!(CKM_SHA224_RSA_PKCS; AUTH; AUTH; 512, 4096, bits true),
    mechanism!(CKM_SHA256_RSA_PKCS; AUTH; AUTH; 512, 4096, bits true),
    mechanism!(CKM_SHA384_RSA_PKCS; AUTH; AUTH; 512, 4096, bits true),
    mechanism!(CKM_SHA512_RSA_PKCS; AUTH; AUTH; 512, 4096, bits true),
    mechanism!(CKM_SHA1_RSA_PKCS_PSS; AUTH; AUTH; 512, 4096, bits true),
    mechanism!(CKM_SHA224_RSA_PKCS_PSS; AUTH; AUTH; 512, 4096, bits true),
    mechanism!(CKM_SHA256_RSA_PKCS_PSS; AUTH; AUTH; 512, 4096, bits true),
    mechanism!(CKM_SHA384_RSA_PKCS_PSS; AUTH; AUTH; 512, 4096, bits true),
    mechanism!(CKM_SHA512_RSA_PKCS_PSS; AUTH; AUTH; 512, 4096, bits true),
    mechanism!(CKM_RSA_AES_KEY_WRAP; WRAP_UNWRAP; MechFlags::empty(); 512, 4096, bits true),
    /* DH */
    mechanism!(CKM_DH_PKCS_DERIVE; MechFlags::DERIVE; MechFlags::empty(); 512, 4096, bits true),
];

/* Digests are keyless, they carry no size bounds */
static DIGEST_MECHANISMS: [CK_MECHANISM_TYPE; 6] =
    [CKM_MD5, CKM_SHA_1, CKM_SHA224, CKM_SHA256, CKM_SHA384, CKM_SHA512];

fn modes_for(id: CK_MECHANISM_TYPE) -> Option<&'static MechanismModes> {
    MECHANISMS.iter().find(|m| m.id == id)
}

/// True if `id` names a mechanism the catalog knows about
pub fn is_valid(id: CK_MECHANISM_TYPE) -> bool {
    modes_for(id).is_some() || DIGEST_MECHANISMS.contains(&id)
}

/// The function flags PKCS#11 permits for the mechanism, empty when the
/// mechanism is unknown
pub fn allowed_flags(id: CK_MECHANISM_TYPE) -> MechFlags {
    match modes_for(id) {
        Some(m) => m.allowed,
        None => {
            if DIGEST_MECHANISMS.contains(&id) {
                MechFlags::DIGEST
            } else {
                MechFlags::empty()
            }
        }
    }
}

/// The function flags this token exposes for the mechanism, empty when
/// the mechanism is unknown or advertised only
pub fn token_flags(id: CK_MECHANISM_TYPE) -> MechFlags {
    match modes_for(id) {
        Some(m) => m.token,
        None => {
            if DIGEST_MECHANISMS.contains(&id) {
                MechFlags::DIGEST
            } else {
                MechFlags::empty()
            }
        }
    }
}

/// True if the mechanism cannot be used across update steps
pub fn one_shot_only(id: CK_MECHANISM_TYPE) -> bool {
    match modes_for(id) {
        Some(m) => m.one_shot,
        None => false,
    }
}

/// Unit of the mechanism's key size bounds: bits when true (asymmetric
/// families and generic secrets), bytes otherwise
pub fn size_in_bits(id: CK_MECHANISM_TYPE) -> bool {
    match modes_for(id) {
        Some(m) => m.size_in_bits,
        None => false,
    }
}

/// The inclusive key size bounds enforced when generating a key of the
/// given type, sourced from the key family's generate mechanism.
///
/// Symmetric bounds are in bytes, asymmetric bounds in bits. EC keys are
/// bound by their domain parameters but the generate mechanism still
/// carries advertised curve bit bounds.
pub fn key_size_bounds(key_type: CK_KEY_TYPE) -> Result<(CK_ULONG, CK_ULONG)> {
    let mechanism = match key_type {
        CKK_GENERIC_SECRET => CKM_GENERIC_SECRET_KEY_GEN,
        CKK_MD5_HMAC => CKM_MD5_HMAC,
        CKK_SHA_1_HMAC => CKM_SHA_1_HMAC,
        CKK_SHA224_HMAC => CKM_SHA224_HMAC,
        CKK_SHA256_HMAC => CKM_SHA256_HMAC,
        CKK_SHA384_HMAC => CKM_SHA384_HMAC,
        CKK_SHA512_HMAC => CKM_SHA512_HMAC,
        CKK_AES => CKM_AES_KEY_GEN,
        CKK_EC => CKM_EC_KEY_PAIR_GEN,
        CKK_RSA | CKK_DSA | CKK_DH => CKM_RSA_PKCS_KEY_PAIR_GEN,
        _ => {
            log::error!("no size bounds for key type 0x{:x}", key_type);
            return Err(CKR_GENERAL_ERROR)?;
        }
    };
    match modes_for(mechanism) {
        Some(m) => Ok((m.min_key_size, m.max_key_size)),
        None => Err(CKR_GENERAL_ERROR)?,
    }
}

/// Info returned for one mechanism
#[derive(Debug, Clone, Copy)]
pub struct MechanismInfo {
    pub min_key_size: CK_ULONG,
    pub max_key_size: CK_ULONG,
    pub flags: CK_FLAGS,
}

/// Returns the advertised info for a mechanism
pub fn info(id: CK_MECHANISM_TYPE) -> Result<MechanismInfo> {
    if let Some(m) = modes_for(id) {
        return Ok(MechanismInfo {
            min_key_size: m.min_key_size,
            max_key_size: m.max_key_size,
            flags: m.token.bits(),
        });
    }
    if DIGEST_MECHANISMS.contains(&id) {
        return Ok(MechanismInfo {
            min_key_size: 0,
            max_key_size: 0,
            flags: CKF_DIGEST,
        });
    }
    Err(CKR_MECHANISM_INVALID)?
}

/// Lists every mechanism with a non-empty token function set
pub fn token_mechanism_list() -> Vec<CK_MECHANISM_TYPE> {
    let mut list = Vec::new();
    for m in &MECHANISMS {
        if !m.token.is_empty() {
            list.push(m.id);
        }
    }
    list.extend_from_slice(&DIGEST_MECHANISMS);
    list
}
