// Copyright 2024 Trustoken Contributors
// See LICENSE.txt file for terms

//! Normalization of client supplied attribute templates.
//!
//! A raw template is parsed exactly once into a fresh [Attrs] list where
//! class and key type appear at most once, boolean properties are
//! collapsed to one canonical single-byte entry each, indirect
//! (template-valued) attributes are recursively sanitized and every other
//! entry has been validated against the attribute catalog. All builder
//! and policy code downstream assumes at most one entry per id.

use crate::attribute::{
    boolprop_shift, valid_attribute, Attribute, Attrs, ATTRS_HEADER_SIZE,
};
use crate::error::Result;
use crate::pkcs11::*;

pub fn key_type_is_symm_key(id: CK_KEY_TYPE) -> bool {
    match id {
        CKK_AES | CKK_GENERIC_SECRET | CKK_MD5_HMAC | CKK_SHA_1_HMAC
        | CKK_SHA224_HMAC | CKK_SHA256_HMAC | CKK_SHA384_HMAC
        | CKK_SHA512_HMAC => true,
        _ => false,
    }
}

pub fn key_type_is_asymm_key(id: CK_KEY_TYPE) -> bool {
    match id {
        CKK_EC | CKK_RSA => true,
        _ => false,
    }
}

pub fn class_is_key(class: CK_OBJECT_CLASS) -> bool {
    match class {
        CKO_SECRET_KEY | CKO_PUBLIC_KEY | CKO_PRIVATE_KEY => true,
        _ => false,
    }
}

/// Checks the (class, key type) pair of a sanitized template is
/// admissible. Templates without a class are left to the builder, which
/// mandates one where required.
pub fn consistent_class_and_type(attrs: &Attrs) -> bool {
    let class = attrs.get_class();
    let key_type = attrs.get_key_type();

    match class {
        CKO_UNDEFINED => true,
        CKO_DATA => true,
        CKO_SECRET_KEY => key_type_is_symm_key(key_type),
        CKO_PUBLIC_KEY | CKO_PRIVATE_KEY => key_type_is_asymm_key(key_type),
        _ => false,
    }
}

/// One raw wire entry, borrowed from the client buffer
struct RawEntry<'a> {
    id: CK_ATTRIBUTE_TYPE,
    value: &'a [u8],
}

/// Walks the entries of a raw template payload.
///
/// The payload must have been bounds-checked against the declared
/// attrs_size beforehand; a truncated entry inside it is a malformed
/// template.
struct RawWalker<'a> {
    payload: &'a [u8],
    cur: usize,
}

impl<'a> RawWalker<'a> {
    fn new(payload: &'a [u8]) -> RawWalker<'a> {
        RawWalker {
            payload: payload,
            cur: 0,
        }
    }

    fn next(&mut self) -> Result<Option<RawEntry<'a>>> {
        if self.cur == self.payload.len() {
            return Ok(None);
        }
        if self.cur + 8 > self.payload.len() {
            return Err(CKR_ARGUMENTS_BAD)?;
        }
        let id = u32::from_le_bytes(
            self.payload[self.cur..self.cur + 4].try_into()?,
        );
        let size = u32::from_le_bytes(
            self.payload[self.cur + 4..self.cur + 8].try_into()?,
        ) as usize;
        if self.cur + 8 + size > self.payload.len() {
            return Err(CKR_ARGUMENTS_BAD)?;
        }
        let value = &self.payload[self.cur + 8..self.cur + 8 + size];
        self.cur += 8 + size;
        Ok(Some(RawEntry {
            id: id,
            value: value,
        }))
    }
}

/// Extracts class and key type, checking duplicates agree, and emits a
/// single canonical entry for each into the output
fn sanitize_class_and_type(
    dst: &mut Attrs,
    payload: &[u8],
) -> Result<(CK_OBJECT_CLASS, CK_KEY_TYPE)> {
    let mut class_found = CKO_UNDEFINED;
    let mut type_found = CKK_UNDEFINED;

    let mut walker = RawWalker::new(payload);
    while let Some(entry) = walker.next()? {
        match entry.id {
            CKA_CLASS => {
                if entry.value.len() != 4 {
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
                let class = u32::from_le_bytes(entry.value.try_into()?);
                if class_found != CKO_UNDEFINED && class_found != class {
                    log::error!("conflicting class values in template");
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
                class_found = class;
            }
            CKA_KEY_TYPE => {
                if entry.value.len() != 4 {
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
                let key_type = u32::from_le_bytes(entry.value.try_into()?);
                if type_found != CKK_UNDEFINED && type_found != key_type {
                    log::error!("conflicting key type values in template");
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
                type_found = key_type;
            }
            _ => (),
        }
    }

    if class_found != CKO_UNDEFINED {
        dst.add(Attribute::from_ulong(CKA_CLASS, class_found))?;
    }
    if type_found != CKK_UNDEFINED {
        dst.add(Attribute::from_ulong(CKA_KEY_TYPE, type_found))?;
    }

    Ok((class_found, type_found))
}

/// Collapses every boolean property to one canonical single-byte entry.
///
/// A property provided twice with different values is a template
/// inconsistency; repeated with the same value it is emitted only once.
fn sanitize_boolprops(dst: &mut Attrs, payload: &[u8]) -> Result<()> {
    let mut sanity: u64 = 0;
    let mut boolprops: u64 = 0;

    let mut walker = RawWalker::new(payload);
    while let Some(entry) = walker.next()? {
        let shift = match boolprop_shift(entry.id) {
            Some(s) => s,
            None => continue,
        };
        if entry.value.len() != 1 {
            return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
        }
        let mask = 1u64 << shift;
        let value = entry.value[0] != CK_FALSE;

        if sanity & mask != 0 {
            if value != (boolprops & mask != 0) {
                log::error!(
                    "conflicting values for boolean attribute 0x{:x}",
                    entry.id
                );
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
            continue;
        }

        if value {
            boolprops |= mask;
        }
        sanity |= mask;
        dst.add(Attribute::from_bool(entry.id, value))?;
    }

    Ok(())
}

/// Recursively sanitizes a nested attribute template carried by one of
/// the indirect attributes (wrap/unwrap/derive templates). Such
/// attributes are only meaningful on key objects.
fn sanitize_indirect_attr(
    dst: &mut Attrs,
    class: CK_OBJECT_CLASS,
    entry: &RawEntry,
) -> Result<bool> {
    match entry.id {
        CKA_WRAP_TEMPLATE | CKA_UNWRAP_TEMPLATE | CKA_DERIVE_TEMPLATE => (),
        _ => return Ok(false),
    }
    if !class_is_key(class) {
        log::error!("indirect attribute on non key template");
        return Err(CKR_TEMPLATE_INCONSISTENT)?;
    }
    let nested = sanitize_client_template(entry.value)?;
    dst.add(Attribute::from_template_bytes(entry.id, nested.serialize()))?;
    Ok(true)
}

/// Builds a normalized attribute list from a raw client template.
///
/// The input is `{attrs_size, attrs_count}` followed by `attrs_size`
/// bytes of `{id, size, value}` entries; anything shorter than the
/// declared size is rejected without retaining any allocation.
pub fn sanitize_client_template(src: &[u8]) -> Result<Attrs> {
    if src.len() < ATTRS_HEADER_SIZE {
        return Err(CKR_ARGUMENTS_BAD)?;
    }
    let attrs_size =
        u32::from_le_bytes(src[0..4].try_into()?) as usize;
    if src.len() < ATTRS_HEADER_SIZE + attrs_size {
        return Err(CKR_ARGUMENTS_BAD)?;
    }
    let payload = &src[ATTRS_HEADER_SIZE..ATTRS_HEADER_SIZE + attrs_size];

    let mut dst = Attrs::new();

    let (class, _) = sanitize_class_and_type(&mut dst, payload)?;
    sanitize_boolprops(&mut dst, payload)?;

    let mut walker = RawWalker::new(payload);
    while let Some(entry) = walker.next()? {
        if entry.id == CKA_CLASS
            || entry.id == CKA_KEY_TYPE
            || boolprop_shift(entry.id).is_some()
        {
            continue;
        }

        if sanitize_indirect_attr(&mut dst, class, &entry)? {
            continue;
        }

        valid_attribute(entry.id, entry.value.len())?;
        dst.add(Attribute::from_wire_entry(entry.id, entry.value)?)?;
    }

    if !consistent_class_and_type(&dst) {
        log::error!("inconsistent class and key type");
        return Err(CKR_TEMPLATE_INCONSISTENT)?;
    }

    Ok(dst)
}
