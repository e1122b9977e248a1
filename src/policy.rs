// Copyright 2023-2024 Trustoken Contributors
// See LICENSE.txt file for terms

//! The policy engine: per-step checks deciding whether a given
//! (mechanism, function, object) triple is permitted.
//!
//! Every check is a total function that returns the specific Cryptoki
//! error without mutating any state; callers compose them in the order
//! the entry points mandate.

use crate::attribute::{Attribute, Attrs};
use crate::error::{Error, Result};
use crate::mechanism::{self, Function, Step};
use crate::object::Object;
use crate::pkcs11::*;
use crate::rng;
use crate::session::Session;

/// Byte size of a CKA_ID generated by the token
const DEFAULT_ID_SIZE: usize = 16;

/// Decides if the mechanism may run the given function at the given
/// processing step in this session.
pub fn check_mechanism_against_processing(
    session: &Session,
    mechanism_type: CK_MECHANISM_TYPE,
    function: Function,
    step: Step,
) -> Result<()> {
    match step {
        Step::Init => {
            match function {
                Function::Import
                | Function::Copy
                | Function::Modify
                | Function::Destroy => return Ok(()),
                _ => (),
            }
            if !mechanism::token_flags(mechanism_type)
                .contains(function.to_mech_flag())
            {
                log::error!(
                    "mechanism 0x{:x} not permitted for function {:?}",
                    mechanism_type,
                    function
                );
                return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
            }
            Ok(())
        }
        Step::Oneshot | Step::Update => {
            let processing = session.processing()?;
            if processing.always_authen() && !processing.relogged() {
                return Err(CKR_USER_NOT_LOGGED_IN)?;
            }
            if processing.updated()
                && mechanism::one_shot_only(mechanism_type)
            {
                log::error!(
                    "one-shot mechanism 0x{:x} used across updates",
                    mechanism_type
                );
                return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
            }
            Ok(())
        }
        Step::Final => {
            let processing = session.processing()?;
            if processing.always_authen() && !processing.relogged() {
                return Err(CKR_USER_NOT_LOGGED_IN)?;
            }
            Ok(())
        }
    }
}

/// Sensitivity invariants that must hold on any built attribute list
fn check_attrs_misc_integrity(attrs: &Attrs) -> Result<()> {
    if attrs.get_bool(CKA_NEVER_EXTRACTABLE) && attrs.get_bool(CKA_EXTRACTABLE)
    {
        log::error!("never-extractable/extractable attributes mismatch");
        return Err(CKR_TEMPLATE_INCONSISTENT)?;
    }
    if attrs.get_bool(CKA_ALWAYS_SENSITIVE) && !attrs.get_bool(CKA_SENSITIVE) {
        log::error!("always-sensitive/sensitive attributes mismatch");
        return Err(CKR_TEMPLATE_INCONSISTENT)?;
    }
    Ok(())
}

/// Checks the attributes of a to-be-created object against the token
/// state
pub fn check_created_attrs_against_token(
    session: &Session,
    attrs: &Attrs,
) -> Result<()> {
    check_attrs_misc_integrity(attrs)?;

    if attrs.get_bool(CKA_TRUSTED) && !session.is_so() {
        log::error!("only the security officer can create trusted objects");
        return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
    }

    if attrs.get_bool(CKA_TOKEN) && !session.is_read_write() {
        log::error!("cannot create persistent object in read-only session");
        return Err(CKR_SESSION_READ_ONLY)?;
    }

    Ok(())
}

/// True when the object may only be touched by an authenticated user
pub fn object_is_private(attrs: &Attrs) -> bool {
    if attrs.get_class() == CKO_PRIVATE_KEY {
        return true;
    }
    attrs.get_bool(CKA_PRIVATE)
}

/// Checks object access against the session authentication state
pub fn check_access_attrs_against_token(
    session: &Session,
    attrs: &Attrs,
) -> Result<()> {
    let private = match attrs.get_class() {
        CKO_SECRET_KEY | CKO_PUBLIC_KEY | CKO_DATA => {
            attrs.get_bool(CKA_PRIVATE)
        }
        CKO_PRIVATE_KEY => true,
        _ => return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?,
    };

    if private && session.is_public() {
        log::error!("private object access from a public session");
        return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
    }

    Ok(())
}

/// Checks the attributes of a new object match the processing used to
/// create it.
///
/// Called only for processings that create objects; anything else is an
/// invariant violation.
pub fn check_created_attrs_against_processing(
    proc_id: CK_MECHANISM_TYPE,
    attrs: &Attrs,
) -> Result<()> {
    let local = match attrs.find(CKA_LOCAL) {
        Some(a) => a.to_bool()?,
        None => return Err(CKR_TEMPLATE_INCONSISTENT)?,
    };

    match proc_id {
        PROCESSING_IMPORT
        | CKM_ECDH1_DERIVE
        | CKM_ECDH1_COFACTOR_DERIVE
        | CKM_DH_PKCS_DERIVE => {
            if local {
                log::error!("local object from import or derivation");
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        CKM_GENERIC_SECRET_KEY_GEN
        | CKM_AES_KEY_GEN
        | CKM_EC_KEY_PAIR_GEN
        | CKM_RSA_PKCS_KEY_PAIR_GEN => {
            if !local {
                log::error!("non-local object from key generation");
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        _ => {
            log::error!(
                "processing 0x{:x} does not create objects",
                proc_id
            );
            return Err(CKR_GENERAL_ERROR)?;
        }
    }

    match proc_id {
        CKM_GENERIC_SECRET_KEY_GEN => {
            if attrs.get_key_type() != CKK_GENERIC_SECRET {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        CKM_AES_KEY_GEN => {
            if attrs.get_key_type() != CKK_AES {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        CKM_EC_KEY_PAIR_GEN => {
            if attrs.get_key_type() != CKK_EC {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        CKM_RSA_PKCS_KEY_PAIR_GEN => {
            if attrs.get_key_type() != CKK_RSA {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        CKM_ECDH1_DERIVE | CKM_ECDH1_COFACTOR_DERIVE | CKM_DH_PKCS_DERIVE => {
            if attrs.get_class() != CKO_SECRET_KEY {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        _ => (),
    }

    Ok(())
}

/// Key length of a secret key: CKA_VALUE_LEN when provided, the byte
/// length of CKA_VALUE otherwise (imports carry the raw value only)
fn secret_key_length(attrs: &Attrs) -> Result<CK_ULONG> {
    match attrs.get_ulong(CKA_VALUE_LEN) {
        Ok(len) => Ok(len),
        Err(e) => {
            if !e.attr_not_found() {
                return Err(e);
            }
            match attrs.find(CKA_VALUE) {
                Some(a) => Ok(CK_ULONG::try_from(a.get_value().len())?),
                None => Err(Error::ck_rv(CKR_TEMPLATE_INCOMPLETE)),
            }
        }
    }
}

/// Modulus bit size of an RSA key: CKA_MODULUS_BITS when filled, the
/// bit length of CKA_MODULUS otherwise (imports carry the modulus only,
/// and a mandated-but-absent CKA_MODULUS_BITS is a zero-size slot)
fn rsa_modulus_bits(attrs: &Attrs) -> Result<CK_ULONG> {
    match attrs.find(CKA_MODULUS_BITS) {
        Some(a) if a.get_value().len() == 4 => a.to_ulong(),
        _ => match attrs.find(CKA_MODULUS) {
            Some(a) => Ok(CK_ULONG::try_from(a.get_value().len())? * 8),
            None => Err(Error::ck_rv(CKR_TEMPLATE_INCOMPLETE)),
        },
    }
}

/// Validates the sizes of one created key, or of both halves of a
/// generated key pair.
///
/// Symmetric keys are bound through CKA_VALUE_LEN, RSA/DSA/DH keys
/// through CKA_MODULUS_BITS; EC keys are bound by their domain
/// parameters and carry no size here. In a pair both keys must share the
/// key type.
pub fn check_created_attrs(
    key1: &Attrs,
    key2: Option<&Attrs>,
) -> Result<()> {
    let mut secret: Option<&Attrs> = None;
    let mut public: Option<&Attrs> = None;
    let mut private: Option<&Attrs> = None;
    let mut key_length: CK_ULONG = 0;

    match key1.get_class() {
        CKO_SECRET_KEY => secret = Some(key1),
        CKO_PUBLIC_KEY => public = Some(key1),
        CKO_PRIVATE_KEY => private = Some(key1),
        _ => return Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
    }

    if let Some(k2) = key2 {
        match k2.get_class() {
            CKO_PUBLIC_KEY => {
                if private.is_none() {
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
                public = Some(k2);
            }
            CKO_PRIVATE_KEY => {
                if public.is_none() {
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
                private = Some(k2);
            }
            _ => return Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
        }

        match (public, private) {
            (Some(p), Some(r)) => {
                if p.get_key_type() != r.get_key_type() {
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
            }
            _ => return Err(CKR_GENERAL_ERROR)?,
        }
    }

    if let Some(secret) = secret {
        match secret.get_key_type() {
            CKK_AES | CKK_GENERIC_SECRET | CKK_MD5_HMAC | CKK_SHA_1_HMAC
            | CKK_SHA224_HMAC | CKK_SHA256_HMAC | CKK_SHA384_HMAC
            | CKK_SHA512_HMAC => (),
            _ => return Err(CKR_TEMPLATE_INCONSISTENT)?,
        }
        key_length = secret_key_length(secret)?;
    }
    if let Some(public) = public {
        match public.get_key_type() {
            CKK_RSA | CKK_DSA | CKK_DH => {
                key_length = rsa_modulus_bits(public)?;
            }
            CKK_EC => (),
            _ => return Err(CKR_TEMPLATE_INCONSISTENT)?,
        }
    }
    if let Some(private) = private {
        match private.get_key_type() {
            CKK_RSA | CKK_DSA | CKK_DH => {
                /* in a pair the public half carries the bit size */
                if public.is_none() {
                    key_length = rsa_modulus_bits(private)?;
                }
            }
            CKK_EC => (),
            _ => return Err(CKR_TEMPLATE_INCONSISTENT)?,
        }
    }

    /* EC keys are bound to their domain, nothing to check here */
    if key1.get_key_type() == CKK_EC {
        return Ok(());
    }

    let (min_key_size, max_key_size) =
        mechanism::key_size_bounds(key1.get_key_type())?;
    if key_length < min_key_size || key_length > max_key_size {
        log::error!(
            "key length {} outside range [{} {}]",
            key_length,
            min_key_size,
            max_key_size
        );
        return Err(CKR_KEY_SIZE_RANGE)?;
    }

    Ok(())
}

/// Checks the processing id against the parent CKA_ALLOWED_MECHANISMS
/// list, if the parent carries one
fn parent_key_complies_allowed_mechanisms(
    proc_id: CK_MECHANISM_TYPE,
    attrs: &Attrs,
) -> bool {
    let list = match attrs.find(CKA_ALLOWED_MECHANISMS) {
        Some(a) => a.get_value(),
        None => return true,
    };

    for chunk in list.chunks_exact(4) {
        let mech = u32::from_le_bytes(match chunk.try_into() {
            Ok(b) => b,
            Err(_) => continue,
        });
        if mech == proc_id {
            return true;
        }
    }

    log::debug!("mechanism 0x{:x} not in allowed list", proc_id);
    false
}

/// Checks the attributes of the parent key used in a processing match
/// the target processing.
pub fn check_parent_attrs_against_processing(
    proc_id: CK_MECHANISM_TYPE,
    function: Function,
    parent: &Attrs,
) -> Result<()> {
    let key_class = parent.get_class();
    let key_type = parent.get_key_type();

    let required = match function {
        Function::Encrypt => Some(CKA_ENCRYPT),
        Function::Decrypt => Some(CKA_DECRYPT),
        Function::Sign => Some(CKA_SIGN),
        Function::Verify => Some(CKA_VERIFY),
        Function::SignRecover => Some(CKA_SIGN_RECOVER),
        Function::VerifyRecover => Some(CKA_VERIFY_RECOVER),
        Function::Wrap => Some(CKA_WRAP),
        Function::Unwrap => Some(CKA_UNWRAP),
        Function::Derive => Some(CKA_DERIVE),
        _ => None,
    };
    if let Some(attr) = required {
        if !parent.get_bool(attr) {
            log::error!(
                "function {:?} not permitted on parent key",
                function
            );
            return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
        }
    }

    /* Check processing complies with the parent key family */
    match proc_id {
        CKM_AES_ECB | CKM_AES_CBC | CKM_AES_CBC_PAD | CKM_AES_CTS
        | CKM_AES_CTR | CKM_AES_GCM | CKM_AES_CCM | CKM_AES_CMAC
        | CKM_AES_CMAC_GENERAL | CKM_AES_XCBC_MAC | CKM_AES_GMAC
        | CKM_AES_ECB_ENCRYPT_DATA | CKM_AES_CBC_ENCRYPT_DATA => {
            if key_class != CKO_SECRET_KEY || key_type != CKK_AES {
                log::error!("AES mechanism on non-AES secret key");
                return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
            }
        }
        CKM_MD5_HMAC | CKM_SHA_1_HMAC | CKM_SHA224_HMAC | CKM_SHA256_HMAC
        | CKM_SHA384_HMAC | CKM_SHA512_HMAC => {
            if key_class != CKO_SECRET_KEY {
                return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
            }
            if key_type != CKK_GENERIC_SECRET {
                let expected = match proc_id {
                    CKM_MD5_HMAC => CKK_MD5_HMAC,
                    CKM_SHA_1_HMAC => CKK_SHA_1_HMAC,
                    CKM_SHA224_HMAC => CKK_SHA224_HMAC,
                    CKM_SHA256_HMAC => CKK_SHA256_HMAC,
                    CKM_SHA384_HMAC => CKK_SHA384_HMAC,
                    CKM_SHA512_HMAC => CKK_SHA512_HMAC,
                    _ => CKK_UNDEFINED,
                };
                if key_type != expected {
                    return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
                }
            }
        }
        CKM_ECDSA | CKM_ECDSA_SHA1 | CKM_ECDSA_SHA224 | CKM_ECDSA_SHA256
        | CKM_ECDSA_SHA384 | CKM_ECDSA_SHA512 | CKM_ECDH1_DERIVE
        | CKM_ECDH1_COFACTOR_DERIVE | CKM_ECMQV_DERIVE
        | CKM_ECDH_AES_KEY_WRAP => {
            if key_type != CKK_EC
                || (key_class != CKO_PUBLIC_KEY
                    && key_class != CKO_PRIVATE_KEY)
            {
                log::error!("EC mechanism on non-EC key");
                return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
            }
        }
        CKM_RSA_PKCS | CKM_RSA_9796 | CKM_RSA_X_509 | CKM_SHA1_RSA_PKCS
        | CKM_RSA_PKCS_OAEP | CKM_RSA_PKCS_PSS | CKM_SHA1_RSA_PKCS_PSS
        | CKM_SHA224_RSA_PKCS | CKM_SHA256_RSA_PKCS | CKM_SHA384_RSA_PKCS
        | CKM_SHA512_RSA_PKCS | CKM_SHA224_RSA_PKCS_PSS
        | CKM_SHA256_RSA_PKCS_PSS | CKM_SHA384_RSA_PKCS_PSS
        | CKM_SHA512_RSA_PKCS_PSS | CKM_RSA_AES_KEY_WRAP => {
            if key_type != CKK_RSA
                || (key_class != CKO_PUBLIC_KEY
                    && key_class != CKO_PRIVATE_KEY)
            {
                log::error!("RSA mechanism on non-RSA key");
                return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
            }
        }
        _ => {
            log::error!(
                "no key family admits processing 0x{:x}",
                proc_id
            );
            return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
        }
    }

    if !parent_key_complies_allowed_mechanisms(proc_id, parent) {
        return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
    }

    Ok(())
}

/// Placeholder for wrap/unwrap/derive template enforcement against the
/// parent key. The hook is defined but not enforced.
#[allow(dead_code)]
pub fn check_created_attrs_against_parent_key(
    _proc_id: CK_MECHANISM_TYPE,
    _parent: &Attrs,
    _attrs: &Attrs,
) -> Result<()> {
    Err(CKR_GENERAL_ERROR)?
}

/// Adds a CKA_ID attribute to an object, or a paired object, if missing.
///
/// If two objects are provided and at least one has no CKA_ID, both end
/// up with the same id. A generated id is 16 random bytes.
pub fn add_missing_attribute_id(
    attrs1: &mut Attrs,
    attrs2: Option<&mut Attrs>,
) -> Result<()> {
    let id1 = attrs1.find(CKA_ID).map(|a| a.get_value().clone());

    match attrs2 {
        Some(attrs2) => {
            let id2 = attrs2.find(CKA_ID).map(|a| a.get_value().clone());
            match (id1, id2) {
                (Some(_), Some(_)) => Ok(()),
                (Some(id), None) => {
                    attrs2.add(Attribute::from_bytes(CKA_ID, id))
                }
                (None, Some(id)) => {
                    attrs1.add(Attribute::from_bytes(CKA_ID, id))
                }
                (None, None) => {
                    let mut id = vec![0u8; DEFAULT_ID_SIZE];
                    rng::generate_random(&mut id)?;
                    attrs1
                        .add(Attribute::from_bytes(CKA_ID, id.clone()))?;
                    attrs2.add(Attribute::from_bytes(CKA_ID, id))
                }
            }
        }
        None => match id1 {
            Some(_) => Ok(()),
            None => {
                let mut id = vec![0u8; DEFAULT_ID_SIZE];
                rng::generate_random(&mut id)?;
                attrs1.add(Attribute::from_bytes(CKA_ID, id))
            }
        },
    }
}

/// The exportability predicate consulted by attribute retrieval: the
/// private components of an RSA private key are not exportable when the
/// key is sensitive or not extractable.
pub fn attribute_is_exportable(
    attr_id: CK_ATTRIBUTE_TYPE,
    obj: &Object,
) -> bool {
    match attr_id {
        CKA_PRIVATE_EXPONENT | CKA_PRIME_1 | CKA_PRIME_2 | CKA_EXPONENT_1
        | CKA_EXPONENT_2 | CKA_COEFFICIENT => {
            obj.is_extractable() && !obj.is_sensitive()
        }
        _ => true,
    }
}
