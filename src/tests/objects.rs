// Copyright 2024 Trustoken Contributors
// See LICENSE.txt file for terms

use crate::attribute::{Attribute, Attrs};
use crate::mechanism::Function;
use crate::object::builder::create_attributes_from_template;
use crate::pkcs11::*;

use super::{aes_import_template, p256_params, TemplateBuilder};

fn assert_key_invariants(attrs: &Attrs) {
    /* class, key type and the token managed booleans are always there */
    assert!(attrs.find(CKA_CLASS).is_some());
    assert!(attrs.find(CKA_KEY_TYPE).is_some());
    assert!(attrs.find(CKA_LOCAL).is_some());
    assert!(attrs.find(CKA_ALWAYS_SENSITIVE).is_some());
    assert!(attrs.find(CKA_NEVER_EXTRACTABLE).is_some());

    if attrs.get_bool(CKA_ALWAYS_SENSITIVE) {
        assert!(attrs.get_bool(CKA_SENSITIVE));
    }
    if attrs.get_bool(CKA_NEVER_EXTRACTABLE) {
        assert!(!attrs.get_bool(CKA_EXTRACTABLE));
    }
}

#[test]
fn test_import_aes_key() {
    let template = aes_import_template();
    let attrs =
        create_attributes_from_template(&template, None, Function::Import)
            .unwrap();

    assert_eq!(attrs.get_class(), CKO_SECRET_KEY);
    assert_eq!(attrs.get_key_type(), CKK_AES);
    assert_eq!(attrs.get_bool(CKA_LOCAL), false);
    assert_eq!(attrs.get_bool(CKA_ALWAYS_SENSITIVE), false);
    assert_eq!(attrs.get_bool(CKA_NEVER_EXTRACTABLE), false);
    assert_eq!(attrs.get_bool(CKA_MODIFIABLE), true);
    assert_eq!(attrs.get_bool(CKA_TOKEN), false);
    assert_eq!(attrs.get_bool(CKA_PRIVATE), false);
    assert_eq!(attrs.find(CKA_VALUE).unwrap().get_value().len(), 16);
    assert_key_invariants(&attrs);
}

#[test]
fn test_generate_secret_derived_attributes() {
    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_AES)
        .ulong(CKA_VALUE_LEN, 32)
        .boolean(CKA_SENSITIVE, true)
        .build();
    let attrs =
        create_attributes_from_template(&template, None, Function::Generate)
            .unwrap();

    assert_eq!(attrs.get_bool(CKA_LOCAL), true);
    assert_eq!(attrs.get_bool(CKA_ALWAYS_SENSITIVE), true);
    assert_eq!(attrs.get_bool(CKA_NEVER_EXTRACTABLE), true);
    assert_key_invariants(&attrs);
}

#[test]
fn test_data_object_defaults() {
    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_DATA)
        .bytes(CKA_VALUE, b"opaque payload")
        .build();
    let attrs =
        create_attributes_from_template(&template, None, Function::Import)
            .unwrap();

    assert_eq!(attrs.get_class(), CKO_DATA);
    assert_eq!(attrs.get_bool(CKA_MODIFIABLE), true);
    assert_eq!(attrs.get_bool(CKA_COPYABLE), true);
    assert_eq!(attrs.get_bool(CKA_DESTROYABLE), true);
    assert_eq!(attrs.get_bool(CKA_TOKEN), false);
    assert_eq!(attrs.get_bool(CKA_PRIVATE), false);
    assert!(attrs.find(CKA_KEY_TYPE).is_none());
    assert!(attrs.find(CKA_VALUE).is_some());
}

#[test]
fn test_missing_class_fails() {
    let template = TemplateBuilder::new()
        .bytes(CKA_VALUE, &[0u8; 16])
        .build();
    let e =
        create_attributes_from_template(&template, None, Function::Import)
            .unwrap_err();
    assert_eq!(e.rv(), CKR_TEMPLATE_INCONSISTENT);
}

#[test]
fn test_rsa_public_key_attributes() {
    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_PUBLIC_KEY)
        .ulong(CKA_KEY_TYPE, CKK_RSA)
        .ulong(CKA_MODULUS_BITS, 2048)
        .bytes(CKA_PUBLIC_EXPONENT, &[0x01, 0x00, 0x01])
        .boolean(CKA_VERIFY, true)
        .build();
    let attrs = create_attributes_from_template(
        &template,
        None,
        Function::GeneratePair,
    )
    .unwrap();

    assert_eq!(attrs.get_ulong(CKA_MODULUS_BITS).unwrap(), 2048);
    assert_eq!(attrs.get_bool(CKA_VERIFY), true);
    /* the mandated subject is materialized as an empty slot */
    assert_eq!(attrs.find(CKA_SUBJECT).unwrap().get_value().len(), 0);
    assert_eq!(attrs.get_bool(CKA_LOCAL), true);
    assert_key_invariants(&attrs);
}

#[test]
fn test_ec_private_key_attributes() {
    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_PRIVATE_KEY)
        .ulong(CKA_KEY_TYPE, CKK_EC)
        .bytes(CKA_EC_PARAMS, &p256_params())
        .bytes(CKA_VALUE, &[0x11u8; 32])
        .boolean(CKA_SIGN, true)
        .build();
    let attrs =
        create_attributes_from_template(&template, None, Function::Import)
            .unwrap();

    assert_eq!(attrs.get_key_type(), CKK_EC);
    assert_eq!(
        attrs.find(CKA_EC_PARAMS).unwrap().get_value(),
        &p256_params()
    );
    assert_eq!(attrs.get_bool(CKA_SIGN), true);
    assert_eq!(attrs.get_bool(CKA_LOCAL), false);
    assert_key_invariants(&attrs);
}

#[test]
fn test_template_booleans_override_defaults() {
    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_AES)
        .ulong(CKA_VALUE_LEN, 16)
        .boolean(CKA_MODIFIABLE, false)
        .boolean(CKA_ENCRYPT, true)
        .build();
    let attrs =
        create_attributes_from_template(&template, None, Function::Generate)
            .unwrap();

    /* an explicit false wins over the true default */
    assert_eq!(attrs.get_bool(CKA_MODIFIABLE), false);
    assert_eq!(attrs.get_bool(CKA_ENCRYPT), true);
    /* untouched defaults remain */
    assert_eq!(attrs.get_bool(CKA_COPYABLE), true);
    assert_eq!(attrs.get_bool(CKA_DECRYPT), false);
}

#[test]
fn test_derive_inherits_from_parent() {
    let mut parent = Attrs::new();
    parent
        .add(Attribute::from_ulong(CKA_CLASS, CKO_SECRET_KEY))
        .unwrap();
    parent
        .add(Attribute::from_ulong(CKA_KEY_TYPE, CKK_AES))
        .unwrap();
    parent
        .add(Attribute::from_bool(CKA_ALWAYS_SENSITIVE, true))
        .unwrap();
    parent
        .add(Attribute::from_bool(CKA_NEVER_EXTRACTABLE, true))
        .unwrap();

    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_GENERIC_SECRET)
        .ulong(CKA_VALUE_LEN, 32)
        .boolean(CKA_SENSITIVE, true)
        .build();
    let attrs = create_attributes_from_template(
        &template,
        Some(&parent),
        Function::Derive,
    )
    .unwrap();

    assert_eq!(attrs.get_bool(CKA_LOCAL), false);
    /* parent history carries over only while the child keeps it up */
    assert_eq!(attrs.get_bool(CKA_ALWAYS_SENSITIVE), true);
    assert_eq!(attrs.get_bool(CKA_NEVER_EXTRACTABLE), true);

    let extractable = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_GENERIC_SECRET)
        .ulong(CKA_VALUE_LEN, 32)
        .boolean(CKA_EXTRACTABLE, true)
        .build();
    let attrs = create_attributes_from_template(
        &extractable,
        Some(&parent),
        Function::Derive,
    )
    .unwrap();
    assert_eq!(attrs.get_bool(CKA_NEVER_EXTRACTABLE), false);
    assert_eq!(attrs.get_bool(CKA_ALWAYS_SENSITIVE), false);
}

#[test]
fn test_copy_inherits_local() {
    let mut parent = Attrs::new();
    parent
        .add(Attribute::from_ulong(CKA_CLASS, CKO_SECRET_KEY))
        .unwrap();
    parent
        .add(Attribute::from_ulong(CKA_KEY_TYPE, CKK_AES))
        .unwrap();
    parent
        .add(Attribute::from_bool(CKA_LOCAL, true))
        .unwrap();

    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_AES)
        .ulong(CKA_VALUE_LEN, 16)
        .build();
    let attrs = create_attributes_from_template(
        &template,
        Some(&parent),
        Function::Copy,
    )
    .unwrap();
    assert_eq!(attrs.get_bool(CKA_LOCAL), true);
}
