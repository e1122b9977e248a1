// Copyright 2024 Trustoken Contributors
// See LICENSE.txt file for terms

use crate::attribute::{Attribute, Attrs};
use crate::mechanism::{Function, Step};
use crate::pkcs11::*;
use crate::policy;
use crate::token::Token;

use super::{ec_private_import_template, TemplateBuilder};

#[test]
fn test_sign_with_non_signing_key() {
    let mut token = Token::new();
    let session = token.open_session(false);

    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_GENERIC_SECRET)
        .bytes(CKA_VALUE, &[0x42u8; 32])
        .boolean(CKA_SIGN, false)
        .build();
    let key = token.create_object(session, &template).unwrap();

    let e = token
        .processing_init(session, Function::Sign, CKM_SHA256_HMAC, key)
        .unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_FUNCTION_NOT_PERMITTED);
}

#[test]
fn test_sign_with_signing_key() {
    let mut token = Token::new();
    let session = token.open_session(false);

    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_SHA256_HMAC)
        .bytes(CKA_VALUE, &[0x42u8; 32])
        .boolean(CKA_SIGN, true)
        .build();
    let key = token.create_object(session, &template).unwrap();

    token
        .processing_init(session, Function::Sign, CKM_SHA256_HMAC, key)
        .unwrap();
    token.processing_step(session, Step::Update).unwrap();
    token.processing_step(session, Step::Final).unwrap();

    /* the processing is gone after the final step */
    let e = token.processing_step(session, Step::Update).unwrap_err();
    assert_eq!(e.rv(), CKR_OPERATION_NOT_INITIALIZED);
}

#[test]
fn test_hmac_key_family_mismatch() {
    let mut token = Token::new();
    let session = token.open_session(false);

    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_SHA512_HMAC)
        .bytes(CKA_VALUE, &[0x42u8; 64])
        .boolean(CKA_SIGN, true)
        .build();
    let key = token.create_object(session, &template).unwrap();

    let e = token
        .processing_init(session, Function::Sign, CKM_SHA256_HMAC, key)
        .unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_FUNCTION_NOT_PERMITTED);
}

#[test]
fn test_one_shot_mechanism_cannot_update_twice() {
    let mut token = Token::new();
    let session = token.open_session(false);
    token.login(CKU_USER).unwrap();

    let key = token
        .create_object(
            session,
            &ec_private_import_template()
                .boolean(CKA_SIGN, true)
                .build(),
        )
        .unwrap();

    token
        .processing_init(session, Function::Sign, CKM_ECDSA, key)
        .unwrap();
    token.processing_step(session, Step::Update).unwrap();
    let e = token.processing_step(session, Step::Update).unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_FUNCTION_NOT_PERMITTED);
}

#[test]
fn test_multi_part_mechanism_updates() {
    let mut token = Token::new();
    let session = token.open_session(false);
    token.login(CKU_USER).unwrap();

    let key = token
        .create_object(
            session,
            &ec_private_import_template()
                .boolean(CKA_SIGN, true)
                .build(),
        )
        .unwrap();

    token
        .processing_init(session, Function::Sign, CKM_ECDSA_SHA256, key)
        .unwrap();
    token.processing_step(session, Step::Update).unwrap();
    token.processing_step(session, Step::Update).unwrap();
    token.processing_step(session, Step::Final).unwrap();
}

#[test]
fn test_always_authenticate_requires_relogin() {
    let mut token = Token::new();
    let session = token.open_session(false);
    token.login(CKU_USER).unwrap();

    let key = token
        .create_object(
            session,
            &ec_private_import_template()
                .boolean(CKA_SIGN, true)
                .boolean(CKA_ALWAYS_AUTHENTICATE, true)
                .build(),
        )
        .unwrap();

    token
        .processing_init(session, Function::Sign, CKM_ECDSA, key)
        .unwrap();

    /* no fresh login since the operation was initialized */
    let e = token.processing_step(session, Step::Oneshot).unwrap_err();
    assert_eq!(e.rv(), CKR_USER_NOT_LOGGED_IN);

    token.login(CKU_USER).unwrap();
    token.processing_step(session, Step::Oneshot).unwrap();
}

#[test]
fn test_mechanism_function_mismatch_at_init() {
    let mut token = Token::new();
    let session = token.open_session(false);

    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_AES)
        .bytes(CKA_VALUE, &[0u8; 16])
        .boolean(CKA_ENCRYPT, true)
        .build();
    let key = token.create_object(session, &template).unwrap();

    /* an HMAC mechanism cannot initialize an encryption */
    let e = token
        .processing_init(session, Function::Encrypt, CKM_SHA256_HMAC, key)
        .unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_FUNCTION_NOT_PERMITTED);
}

#[test]
fn test_advertised_only_mechanism_rejected_at_init() {
    let mut token = Token::new();
    let session = token.open_session(false);
    token.login(CKU_USER).unwrap();

    let modulus = vec![0xabu8; 256];
    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_PRIVATE_KEY)
        .ulong(CKA_KEY_TYPE, CKK_RSA)
        .bytes(CKA_MODULUS, &modulus)
        .bytes(CKA_PRIVATE_EXPONENT, &[0xcdu8; 256])
        .boolean(CKA_SIGN, true)
        .build();
    let key = token.create_object(session, &template).unwrap();

    let e = token
        .processing_init(session, Function::Sign, CKM_RSA_X_509, key)
        .unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_FUNCTION_NOT_PERMITTED);

    token
        .processing_init(session, Function::Sign, CKM_RSA_PKCS, key)
        .unwrap();
}

#[test]
fn test_allowed_mechanisms_restriction() {
    let mut token = Token::new();
    let session = token.open_session(false);

    let mut allowed = Vec::new();
    allowed.extend_from_slice(&CKM_AES_CBC.to_le_bytes());
    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_AES)
        .bytes(CKA_VALUE, &[0u8; 16])
        .boolean(CKA_ENCRYPT, true)
        .bytes(CKA_ALLOWED_MECHANISMS, &allowed)
        .build();
    let key = token.create_object(session, &template).unwrap();

    let e = token
        .processing_init(session, Function::Encrypt, CKM_AES_ECB, key)
        .unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_FUNCTION_NOT_PERMITTED);

    token
        .processing_init(session, Function::Encrypt, CKM_AES_CBC, key)
        .unwrap();
}

#[test]
fn test_private_object_needs_authenticated_session() {
    let mut token = Token::new();
    let session = token.open_session(false);

    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_AES)
        .bytes(CKA_VALUE, &[0u8; 16])
        .boolean(CKA_ENCRYPT, true)
        .boolean(CKA_PRIVATE, true)
        .build();
    let key = token.create_object(session, &template).unwrap();

    let e = token
        .processing_init(session, Function::Encrypt, CKM_AES_CBC, key)
        .unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_FUNCTION_NOT_PERMITTED);

    token.login(CKU_USER).unwrap();
    token
        .processing_init(session, Function::Encrypt, CKM_AES_CBC, key)
        .unwrap();
}

#[test]
fn test_unmatched_key_family_not_permitted() {
    /* a cataloged mechanism outside the AES/HMAC/EC/RSA families is
     * refused on any parent, even one with CKA_DERIVE set */
    let mut parent = Attrs::new();
    parent
        .add(Attribute::from_ulong(CKA_CLASS, CKO_SECRET_KEY))
        .unwrap();
    parent
        .add(Attribute::from_ulong(CKA_KEY_TYPE, CKK_GENERIC_SECRET))
        .unwrap();
    parent
        .add(Attribute::from_bool(CKA_DERIVE, true))
        .unwrap();

    let e = policy::check_parent_attrs_against_processing(
        CKM_DH_PKCS_DERIVE,
        Function::Derive,
        &parent,
    )
    .unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_FUNCTION_NOT_PERMITTED);
}

#[test]
fn test_dh_derive_rejected_at_token() {
    let mut token = Token::new();
    let session = token.open_session(false);

    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_GENERIC_SECRET)
        .bytes(CKA_VALUE, &[0x42u8; 32])
        .boolean(CKA_DERIVE, true)
        .build();
    let parent = token.create_object(session, &template).unwrap();

    let derived = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_GENERIC_SECRET)
        .ulong(CKA_VALUE_LEN, 32)
        .build();
    let e = token
        .derive_key(session, CKM_DH_PKCS_DERIVE, parent, &derived)
        .unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_FUNCTION_NOT_PERMITTED);
}

#[test]
fn test_only_one_processing_per_session() {
    let mut token = Token::new();
    let session = token.open_session(false);

    let template = TemplateBuilder::new()
        .ulong(CKA_CLASS, CKO_SECRET_KEY)
        .ulong(CKA_KEY_TYPE, CKK_AES)
        .bytes(CKA_VALUE, &[0u8; 16])
        .boolean(CKA_ENCRYPT, true)
        .build();
    let key = token.create_object(session, &template).unwrap();

    token
        .processing_init(session, Function::Encrypt, CKM_AES_CBC, key)
        .unwrap();
    let e = token
        .processing_init(session, Function::Encrypt, CKM_AES_CBC, key)
        .unwrap_err();
    assert_eq!(e.rv(), CKR_OPERATION_ACTIVE);
}
