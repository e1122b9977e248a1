// Copyright 2024 Trustoken Contributors
// See LICENSE.txt file for terms

use crate::attribute::{Attribute, Attrs, ATTRS_HEADER_SIZE};
use crate::pkcs11::*;

#[test]
fn test_add_then_find() {
    let mut attrs = Attrs::new();
    let value = vec![0xde, 0xad, 0xbe, 0xef, 0x42];
    attrs
        .add(Attribute::from_bytes(CKA_MODULUS, value.clone()))
        .unwrap();

    let found = attrs.find(CKA_MODULUS).unwrap();
    assert_eq!(found.get_value(), &value);
    assert!(attrs.find(CKA_EC_POINT).is_none());
}

#[test]
fn test_add_preserves_order() {
    let mut attrs = Attrs::new();
    attrs.add(Attribute::from_ulong(CKA_CLASS, CKO_DATA)).unwrap();
    attrs
        .add(Attribute::from_bytes(CKA_OBJECT_ID, vec![1]))
        .unwrap();
    attrs
        .add(Attribute::from_bytes(CKA_VALUE, vec![2]))
        .unwrap();

    attrs.remove(CKA_OBJECT_ID).unwrap();

    let ids: Vec<CK_ATTRIBUTE_TYPE> =
        attrs.iter().map(|a| a.get_type()).collect();
    assert_eq!(ids, vec![CKA_CLASS, CKA_VALUE]);
}

#[test]
fn test_remove_not_found() {
    let mut attrs = Attrs::new();
    let e = attrs.remove(CKA_LABEL).unwrap_err();
    assert!(e.attr_not_found());
}

#[test]
fn test_remove_empty() {
    let mut attrs = Attrs::new();
    attrs
        .add(Attribute::from_bytes(CKA_SUBJECT, Vec::new()))
        .unwrap();
    attrs.remove_empty(CKA_SUBJECT).unwrap();
    assert!(attrs.find(CKA_SUBJECT).is_none());

    attrs
        .add(Attribute::from_bytes(CKA_SUBJECT, vec![1, 2]))
        .unwrap();
    let e = attrs.remove_empty(CKA_SUBJECT).unwrap_err();
    assert_eq!(e.rv(), CKR_GENERAL_ERROR);
    assert!(attrs.find(CKA_SUBJECT).is_some());
}

#[test]
fn test_remove_check() {
    let mut attrs = Attrs::new();
    attrs.add(Attribute::from_bytes(CKA_ID, vec![1])).unwrap();
    attrs.add(Attribute::from_bytes(CKA_ID, vec![2])).unwrap();
    attrs.add(Attribute::from_bytes(CKA_ID, vec![3])).unwrap();

    attrs.remove_check(CKA_ID, 2).unwrap();
    assert_eq!(attrs.find_all(CKA_ID).count(), 1);
    assert_eq!(attrs.find(CKA_ID).unwrap().get_value(), &vec![3]);

    attrs.remove_check(CKA_ID, 10).unwrap();
    let e = attrs.remove_check(CKA_ID, 10).unwrap_err();
    assert!(e.attr_not_found());
}

#[test]
fn test_find_all_in_order() {
    let mut attrs = Attrs::new();
    attrs.add(Attribute::from_bytes(CKA_ID, vec![1])).unwrap();
    attrs
        .add(Attribute::from_bytes(CKA_LABEL, vec![0x61]))
        .unwrap();
    attrs.add(Attribute::from_bytes(CKA_ID, vec![2])).unwrap();

    let values: Vec<&Vec<u8>> =
        attrs.find_all(CKA_ID).map(|a| a.get_value()).collect();
    assert_eq!(values, vec![&vec![1], &vec![2]]);
}

#[test]
fn test_get_ulong() {
    let mut attrs = Attrs::new();
    attrs
        .add(Attribute::from_ulong(CKA_VALUE_LEN, 32))
        .unwrap();
    assert_eq!(attrs.get_ulong(CKA_VALUE_LEN).unwrap(), 32);

    /* a present value that is not 4 bytes is an invariant violation */
    attrs
        .add(Attribute::from_bytes(CKA_MODULUS_BITS, vec![1, 2, 3]))
        .unwrap();
    let e = attrs.get_ulong(CKA_MODULUS_BITS).unwrap_err();
    assert_eq!(e.rv(), CKR_GENERAL_ERROR);

    let e = attrs.get_ulong(CKA_VALUE_BITS).unwrap_err();
    assert!(e.attr_not_found());
}

#[test]
fn test_get_bool_absent_is_false() {
    let mut attrs = Attrs::new();
    assert_eq!(attrs.get_bool(CKA_SENSITIVE), false);

    attrs
        .add(Attribute::from_bool(CKA_SENSITIVE, true))
        .unwrap();
    assert_eq!(attrs.get_bool(CKA_SENSITIVE), true);
}

#[test]
fn test_match_reference() {
    let mut reference = Attrs::new();
    reference
        .add(Attribute::from_ulong(CKA_CLASS, CKO_SECRET_KEY))
        .unwrap();
    reference
        .add(Attribute::from_bool(CKA_ENCRYPT, true))
        .unwrap();

    /* every list matches itself */
    assert!(reference.match_reference(&reference));

    let mut candidate = reference.clone();
    candidate
        .add(Attribute::from_bytes(CKA_LABEL, vec![0x78]))
        .unwrap();
    assert!(reference.match_reference(&candidate));
    /* the superset does not match back into the subset */
    assert!(!candidate.match_reference(&reference));

    let mut altered = Attrs::new();
    altered
        .add(Attribute::from_ulong(CKA_CLASS, CKO_SECRET_KEY))
        .unwrap();
    altered
        .add(Attribute::from_bool(CKA_ENCRYPT, false))
        .unwrap();
    assert!(!reference.match_reference(&altered));
}

#[test]
fn test_serialize_roundtrip() {
    let mut attrs = Attrs::new();
    attrs
        .add(Attribute::from_ulong(CKA_CLASS, CKO_SECRET_KEY))
        .unwrap();
    attrs
        .add(Attribute::from_ulong(CKA_KEY_TYPE, CKK_AES))
        .unwrap();
    attrs
        .add(Attribute::from_bool(CKA_SENSITIVE, true))
        .unwrap();
    attrs
        .add(Attribute::from_bytes(CKA_VALUE, vec![0xa5; 16]))
        .unwrap();

    let blob = attrs.serialize();
    assert_eq!(blob.len(), attrs.byte_size());

    let parsed = Attrs::deserialize(&blob).unwrap();
    assert_eq!(parsed.count(), attrs.count());
    assert_eq!(parsed.serialize(), blob);
}

#[test]
fn test_deserialize_truncated() {
    let mut attrs = Attrs::new();
    attrs
        .add(Attribute::from_bytes(CKA_VALUE, vec![1, 2, 3, 4]))
        .unwrap();
    let blob = attrs.serialize();

    let e = Attrs::deserialize(&blob[..blob.len() - 1]).unwrap_err();
    assert_eq!(e.rv(), CKR_ARGUMENTS_BAD);

    let e = Attrs::deserialize(&blob[..ATTRS_HEADER_SIZE - 2]).unwrap_err();
    assert_eq!(e.rv(), CKR_ARGUMENTS_BAD);
}
