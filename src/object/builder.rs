// Copyright 2023-2024 Trustoken Contributors
// See LICENSE.txt file for terms

//! Construction of complete attribute lists from sanitized templates.
//!
//! The builder is a single routine driven by immutable per-class
//! descriptors. Each descriptor lists the mandated boolean properties,
//! the mandatory and optional attributes, and the per-keytype sets for
//! the class; adding a key family is a data change.

use crate::attribute::{Attribute, Attrs};
use crate::error::Result;
use crate::mechanism::Function;
use crate::pkcs11::*;
use crate::sanitize::{class_is_key, sanitize_client_template};

/// PKCS#11 default value for a mandated boolean property.
///
/// Asking for the default of anything else is an invariant violation.
pub fn default_boolprop(id: CK_ATTRIBUTE_TYPE) -> Result<bool> {
    match id {
        CKA_MODIFIABLE | CKA_COPYABLE | CKA_DESTROYABLE => Ok(true),
        CKA_TOKEN | CKA_PRIVATE | CKA_TRUSTED | CKA_SENSITIVE
        | CKA_ENCRYPT | CKA_DECRYPT | CKA_WRAP | CKA_UNWRAP | CKA_SIGN
        | CKA_SIGN_RECOVER | CKA_VERIFY | CKA_VERIFY_RECOVER | CKA_DERIVE
        | CKA_EXTRACTABLE | CKA_WRAP_WITH_TRUSTED
        | CKA_ALWAYS_AUTHENTICATE => Ok(false),
        _ => {
            log::error!(
                "no default for boolean attribute 0x{:x}",
                id
            );
            Err(CKR_GENERAL_ERROR)?
        }
    }
}

/* Storage object attributes, any class */
static STORAGE_BOOLPROPS: [CK_ATTRIBUTE_TYPE; 5] = [
    CKA_TOKEN,
    CKA_PRIVATE,
    CKA_MODIFIABLE,
    CKA_COPYABLE,
    CKA_DESTROYABLE,
];
static STORAGE_OPTIONAL: [CK_ATTRIBUTE_TYPE; 1] = [CKA_LABEL];

/* Raw data objects */
static DATA_OPTIONAL: [CK_ATTRIBUTE_TYPE; 3] =
    [CKA_OBJECT_ID, CKA_APPLICATION, CKA_VALUE];

/* Any key object */
static ANY_KEY_BOOLPROPS: [CK_ATTRIBUTE_TYPE; 1] = [CKA_DERIVE];
static ANY_KEY_OPTIONAL: [CK_ATTRIBUTE_TYPE; 4] =
    [CKA_ID, CKA_START_DATE, CKA_END_DATE, CKA_ALLOWED_MECHANISMS];

/* Symmetric keys */
static SYMM_KEY_BOOLPROPS: [CK_ATTRIBUTE_TYPE; 10] = [
    CKA_ENCRYPT,
    CKA_DECRYPT,
    CKA_SIGN,
    CKA_VERIFY,
    CKA_WRAP,
    CKA_UNWRAP,
    CKA_SENSITIVE,
    CKA_EXTRACTABLE,
    CKA_WRAP_WITH_TRUSTED,
    CKA_TRUSTED,
];
static SYMM_KEY_OPTIONAL: [CK_ATTRIBUTE_TYPE; 5] = [
    CKA_WRAP_TEMPLATE,
    CKA_UNWRAP_TEMPLATE,
    CKA_DERIVE_TEMPLATE,
    CKA_VALUE,
    CKA_VALUE_LEN,
];
static SYMM_KEY_TYPES: [CK_KEY_TYPE; 8] = [
    CKK_GENERIC_SECRET,
    CKK_AES,
    CKK_MD5_HMAC,
    CKK_SHA_1_HMAC,
    CKK_SHA224_HMAC,
    CKK_SHA256_HMAC,
    CKK_SHA384_HMAC,
    CKK_SHA512_HMAC,
];

/* Public keys */
static PUBLIC_KEY_BOOLPROPS: [CK_ATTRIBUTE_TYPE; 5] = [
    CKA_ENCRYPT,
    CKA_VERIFY,
    CKA_VERIFY_RECOVER,
    CKA_WRAP,
    CKA_TRUSTED,
];
static PUBLIC_KEY_MANDATED: [CK_ATTRIBUTE_TYPE; 1] = [CKA_SUBJECT];
static PUBLIC_KEY_OPTIONAL: [CK_ATTRIBUTE_TYPE; 2] =
    [CKA_WRAP_TEMPLATE, CKA_PUBLIC_KEY_INFO];

/* Private keys */
static PRIVATE_KEY_BOOLPROPS: [CK_ATTRIBUTE_TYPE; 8] = [
    CKA_DECRYPT,
    CKA_SIGN,
    CKA_SIGN_RECOVER,
    CKA_UNWRAP,
    CKA_SENSITIVE,
    CKA_EXTRACTABLE,
    CKA_WRAP_WITH_TRUSTED,
    CKA_ALWAYS_AUTHENTICATE,
];
static PRIVATE_KEY_MANDATED: [CK_ATTRIBUTE_TYPE; 1] = [CKA_SUBJECT];
static PRIVATE_KEY_OPTIONAL: [CK_ATTRIBUTE_TYPE; 2] =
    [CKA_UNWRAP_TEMPLATE, CKA_PUBLIC_KEY_INFO];

static ASYMM_KEY_TYPES: [CK_KEY_TYPE; 2] = [CKK_RSA, CKK_EC];

/* Per key type additions */
static RSA_PUBLIC_MANDATED: [CK_ATTRIBUTE_TYPE; 1] = [CKA_MODULUS_BITS];
static RSA_PUBLIC_OPTIONAL: [CK_ATTRIBUTE_TYPE; 2] =
    [CKA_MODULUS, CKA_PUBLIC_EXPONENT];
static RSA_PRIVATE_OPTIONAL: [CK_ATTRIBUTE_TYPE; 8] = [
    CKA_MODULUS,
    CKA_PUBLIC_EXPONENT,
    CKA_PRIVATE_EXPONENT,
    CKA_PRIME_1,
    CKA_PRIME_2,
    CKA_EXPONENT_1,
    CKA_EXPONENT_2,
    CKA_COEFFICIENT,
];
static EC_PUBLIC_MANDATED: [CK_ATTRIBUTE_TYPE; 1] = [CKA_EC_PARAMS];
static EC_PUBLIC_OPTIONAL: [CK_ATTRIBUTE_TYPE; 1] = [CKA_EC_POINT];
static EC_PRIVATE_MANDATED: [CK_ATTRIBUTE_TYPE; 1] = [CKA_EC_PARAMS];
static EC_PRIVATE_OPTIONAL: [CK_ATTRIBUTE_TYPE; 1] = [CKA_VALUE];

/// Attribute sets a specific key type adds on top of its class
#[derive(Debug)]
struct KeyTypeSets {
    key_type: CK_KEY_TYPE,
    mandatory: &'static [CK_ATTRIBUTE_TYPE],
    optional: &'static [CK_ATTRIBUTE_TYPE],
}

/// Immutable description of how to build one object class
#[derive(Debug)]
struct ClassDescriptor {
    class: CK_OBJECT_CLASS,
    boolprops: &'static [CK_ATTRIBUTE_TYPE],
    mandatory: &'static [CK_ATTRIBUTE_TYPE],
    optional: &'static [CK_ATTRIBUTE_TYPE],
    /// Key types admissible for the class, empty for classes that carry
    /// no key type
    key_types: &'static [CK_KEY_TYPE],
    per_key_type: &'static [KeyTypeSets],
}

static CLASS_DESCRIPTORS: [ClassDescriptor; 4] = [
    ClassDescriptor {
        class: CKO_DATA,
        boolprops: &[],
        mandatory: &[],
        optional: &DATA_OPTIONAL,
        key_types: &[],
        per_key_type: &[],
    },
    ClassDescriptor {
        class: CKO_SECRET_KEY,
        boolprops: &SYMM_KEY_BOOLPROPS,
        mandatory: &[],
        optional: &SYMM_KEY_OPTIONAL,
        key_types: &SYMM_KEY_TYPES,
        per_key_type: &[],
    },
    ClassDescriptor {
        class: CKO_PUBLIC_KEY,
        boolprops: &PUBLIC_KEY_BOOLPROPS,
        mandatory: &PUBLIC_KEY_MANDATED,
        optional: &PUBLIC_KEY_OPTIONAL,
        key_types: &ASYMM_KEY_TYPES,
        per_key_type: &[
            KeyTypeSets {
                key_type: CKK_RSA,
                mandatory: &RSA_PUBLIC_MANDATED,
                optional: &RSA_PUBLIC_OPTIONAL,
            },
            KeyTypeSets {
                key_type: CKK_EC,
                mandatory: &EC_PUBLIC_MANDATED,
                optional: &EC_PUBLIC_OPTIONAL,
            },
        ],
    },
    ClassDescriptor {
        class: CKO_PRIVATE_KEY,
        boolprops: &PRIVATE_KEY_BOOLPROPS,
        mandatory: &PRIVATE_KEY_MANDATED,
        optional: &PRIVATE_KEY_OPTIONAL,
        key_types: &ASYMM_KEY_TYPES,
        per_key_type: &[
            KeyTypeSets {
                key_type: CKK_RSA,
                mandatory: &[],
                optional: &RSA_PRIVATE_OPTIONAL,
            },
            KeyTypeSets {
                key_type: CKK_EC,
                mandatory: &EC_PRIVATE_MANDATED,
                optional: &EC_PRIVATE_OPTIONAL,
            },
        ],
    },
];

/// Emits one mandated boolean property, taking the template value when
/// provided and the PKCS#11 default otherwise
fn import_boolprop(
    out: &mut Attrs,
    temp: &Attrs,
    id: CK_ATTRIBUTE_TYPE,
) -> Result<()> {
    let value = match temp.find(id) {
        Some(a) => a.to_bool()?,
        None => default_boolprop(id)?,
    };
    out.add(Attribute::from_bool(id, value))
}

fn set_mandatory_boolprops(
    out: &mut Attrs,
    temp: &Attrs,
    ids: &[CK_ATTRIBUTE_TYPE],
) -> Result<()> {
    for id in ids {
        import_boolprop(out, temp, *id)?;
    }
    Ok(())
}

/// Mandated non-boolean attributes are materialized even when the
/// template does not provide them; the value is then a zero-size
/// placeholder (Cryptoki permits e.g. empty subjects)
fn set_mandatory_attributes(
    out: &mut Attrs,
    temp: &Attrs,
    ids: &[CK_ATTRIBUTE_TYPE],
) -> Result<()> {
    for id in ids {
        match temp.find(*id) {
            Some(a) => out.add(a.clone())?,
            None => out.add(Attribute::from_bytes(*id, Vec::new()))?,
        }
    }
    Ok(())
}

fn set_optional_attributes(
    out: &mut Attrs,
    temp: &Attrs,
    ids: &[CK_ATTRIBUTE_TYPE],
) -> Result<()> {
    for id in ids {
        match temp.find(*id) {
            Some(a) => out.add(a.clone())?,
            None => (),
        }
    }
    Ok(())
}

/// Creates the complete attribute list for a new object from a raw
/// client template, an optional parent object and the function that
/// creates the object.
///
/// The template is sanitized first; the output then contains the class
/// and key type, every mandated boolean property (template value or
/// PKCS#11 default), the mandatory and optional attributes admitted for
/// the (class, key type) pair, and the derived attributes LOCAL,
/// ALWAYS_SENSITIVE and NEVER_EXTRACTABLE. On any failure nothing is
/// retained.
pub fn create_attributes_from_template(
    template: &[u8],
    parent: Option<&Attrs>,
    function: Function,
) -> Result<Attrs> {
    let temp = sanitize_client_template(template)?;
    create_attributes_from_sanitized(&temp, parent, function)
}

/// Same as [create_attributes_from_template] for an already sanitized
/// template
pub fn create_attributes_from_sanitized(
    temp: &Attrs,
    parent: Option<&Attrs>,
    function: Function,
) -> Result<Attrs> {
    let class = temp.get_class();
    let desc = match CLASS_DESCRIPTORS.iter().find(|d| d.class == class) {
        Some(d) => d,
        None => {
            log::error!("invalid or missing object class 0x{:x}", class);
            return Err(CKR_TEMPLATE_INCONSISTENT)?;
        }
    };

    let mut attrs = Attrs::new();
    attrs.add(Attribute::from_ulong(CKA_CLASS, class))?;

    set_mandatory_boolprops(&mut attrs, temp, &STORAGE_BOOLPROPS)?;
    set_optional_attributes(&mut attrs, temp, &STORAGE_OPTIONAL)?;

    if !desc.key_types.is_empty() {
        let key_type = temp.get_key_type();
        if !desc.key_types.contains(&key_type) {
            log::error!(
                "invalid key type 0x{:x} for class 0x{:x}",
                key_type,
                class
            );
            return Err(CKR_TEMPLATE_INCONSISTENT)?;
        }
        attrs.add(Attribute::from_ulong(CKA_KEY_TYPE, key_type))?;

        set_mandatory_boolprops(&mut attrs, temp, &ANY_KEY_BOOLPROPS)?;
        set_optional_attributes(&mut attrs, temp, &ANY_KEY_OPTIONAL)?;
    }

    set_mandatory_boolprops(&mut attrs, temp, desc.boolprops)?;
    set_mandatory_attributes(&mut attrs, temp, desc.mandatory)?;
    set_optional_attributes(&mut attrs, temp, desc.optional)?;

    if let Some(sets) = desc
        .per_key_type
        .iter()
        .find(|s| s.key_type == temp.get_key_type())
    {
        set_mandatory_attributes(&mut attrs, temp, sets.mandatory)?;
        set_optional_attributes(&mut attrs, temp, sets.optional)?;
    }

    /* LOCAL is never taken from the template */
    let local = match function {
        Function::Generate | Function::GeneratePair => true,
        Function::Copy => match parent {
            Some(p) => p.get_bool(CKA_LOCAL),
            None => return Err(CKR_GENERAL_ERROR)?,
        },
        _ => false,
    };
    attrs.add(Attribute::from_bool(CKA_LOCAL, local))?;

    if class_is_key(class) {
        let (always_sensitive, never_extract) = match function {
            Function::Derive | Function::Copy => {
                let p = match parent {
                    Some(p) => p,
                    None => return Err(CKR_GENERAL_ERROR)?,
                };
                (
                    p.get_bool(CKA_ALWAYS_SENSITIVE)
                        && attrs.get_bool(CKA_SENSITIVE),
                    p.get_bool(CKA_NEVER_EXTRACTABLE)
                        && !attrs.get_bool(CKA_EXTRACTABLE),
                )
            }
            Function::Generate | Function::GeneratePair => (
                attrs.get_bool(CKA_SENSITIVE),
                !attrs.get_bool(CKA_EXTRACTABLE),
            ),
            _ => (false, false),
        };
        attrs.add(Attribute::from_bool(
            CKA_ALWAYS_SENSITIVE,
            always_sensitive,
        ))?;
        attrs.add(Attribute::from_bool(
            CKA_NEVER_EXTRACTABLE,
            never_extract,
        ))?;
    }

    Ok(attrs)
}
