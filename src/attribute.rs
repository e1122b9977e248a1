// Copyright 2023 Trustoken Contributors
// See LICENSE.txt file for terms

//! Typed PKCS#11 attributes and the ordered attribute container that
//! backs every object in the token.
//!
//! On the wire an attribute list is a `{attrs_size, attrs_count}` header
//! followed by `{id, size, value}` entries, all integers 32 bit
//! little-endian. In memory each value is kept together with the type tag
//! the attribute id mandates, so size and alignment mistakes are caught at
//! the boundary instead of at use sites.

use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::pkcs11::*;

/// The value families an attribute id can belong to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrType {
    BoolType,
    NumType,
    StringType,
    BytesType,
    DateType,
    /// The value is a nested attribute template (array attribute)
    TemplateType,
    IgnoreType,
    DenyType,
}

#[derive(Debug)]
struct Attrmap<'a> {
    id: CK_ATTRIBUTE_TYPE,
    name: &'a str,
    atype: AttrType,
}

macro_rules! attrmap_element {
    ($id:expr; as $attrtype:ident) => {
        Attrmap {
            id: $id,
            name: stringify!($id),
            atype: AttrType::$attrtype,
        }
    };
}

/// The closed set of attribute ids the token accepts from clients or
/// stores on objects. Anything else is rejected at sanitization.
static ATTRMAP: [Attrmap<'_>; 55] = [
    attrmap_element!(CKA_CLASS; as NumType),
    attrmap_element!(CKA_TOKEN; as BoolType),
    attrmap_element!(CKA_PRIVATE; as BoolType),
    attrmap_element!(CKA_LABEL; as StringType),
    attrmap_element!(CKA_APPLICATION; as StringType),
    attrmap_element!(CKA_VALUE; as BytesType),
    attrmap_element!(CKA_OBJECT_ID; as BytesType),
    attrmap_element!(CKA_TRUSTED; as BoolType),
    attrmap_element!(CKA_KEY_TYPE; as NumType),
    attrmap_element!(CKA_SUBJECT; as BytesType),
    attrmap_element!(CKA_ID; as BytesType),
    attrmap_element!(CKA_SENSITIVE; as BoolType),
    attrmap_element!(CKA_ENCRYPT; as BoolType),
    attrmap_element!(CKA_DECRYPT; as BoolType),
    attrmap_element!(CKA_WRAP; as BoolType),
    attrmap_element!(CKA_UNWRAP; as BoolType),
    attrmap_element!(CKA_SIGN; as BoolType),
    attrmap_element!(CKA_SIGN_RECOVER; as BoolType),
    attrmap_element!(CKA_VERIFY; as BoolType),
    attrmap_element!(CKA_VERIFY_RECOVER; as BoolType),
    attrmap_element!(CKA_DERIVE; as BoolType),
    attrmap_element!(CKA_START_DATE; as DateType),
    attrmap_element!(CKA_END_DATE; as DateType),
    attrmap_element!(CKA_MODULUS; as BytesType),
    attrmap_element!(CKA_MODULUS_BITS; as NumType),
    attrmap_element!(CKA_PUBLIC_EXPONENT; as BytesType),
    attrmap_element!(CKA_PRIVATE_EXPONENT; as BytesType),
    attrmap_element!(CKA_PRIME_1; as BytesType),
    attrmap_element!(CKA_PRIME_2; as BytesType),
    attrmap_element!(CKA_EXPONENT_1; as BytesType),
    attrmap_element!(CKA_EXPONENT_2; as BytesType),
    attrmap_element!(CKA_COEFFICIENT; as BytesType),
    attrmap_element!(CKA_PUBLIC_KEY_INFO; as BytesType),
    attrmap_element!(CKA_PRIME; as BytesType),
    attrmap_element!(CKA_SUBPRIME; as BytesType),
    attrmap_element!(CKA_BASE; as BytesType),
    attrmap_element!(CKA_VALUE_BITS; as NumType),
    attrmap_element!(CKA_VALUE_LEN; as NumType),
    attrmap_element!(CKA_EXTRACTABLE; as BoolType),
    attrmap_element!(CKA_LOCAL; as BoolType),
    attrmap_element!(CKA_NEVER_EXTRACTABLE; as BoolType),
    attrmap_element!(CKA_ALWAYS_SENSITIVE; as BoolType),
    attrmap_element!(CKA_KEY_GEN_MECHANISM; as NumType),
    attrmap_element!(CKA_MODIFIABLE; as BoolType),
    attrmap_element!(CKA_COPYABLE; as BoolType),
    attrmap_element!(CKA_DESTROYABLE; as BoolType),
    attrmap_element!(CKA_EC_PARAMS; as BytesType),
    attrmap_element!(CKA_EC_POINT; as BytesType),
    attrmap_element!(CKA_ALWAYS_AUTHENTICATE; as BoolType),
    attrmap_element!(CKA_WRAP_WITH_TRUSTED; as BoolType),
    attrmap_element!(CKA_WRAP_TEMPLATE; as TemplateType),
    attrmap_element!(CKA_UNWRAP_TEMPLATE; as TemplateType),
    attrmap_element!(CKA_DERIVE_TEMPLATE; as TemplateType),
    attrmap_element!(CKA_MECHANISM_TYPE; as NumType),
    attrmap_element!(CKA_ALLOWED_MECHANISMS; as BytesType),
];

fn attrmap_entry(id: CK_ATTRIBUTE_TYPE) -> Option<AttrType> {
    for a in &ATTRMAP {
        if a.id == id {
            return Some(a.atype);
        }
    }
    None
}

/// Returns the symbolic name of an attribute id, for tracing
pub fn attr_name(id: CK_ATTRIBUTE_TYPE) -> String {
    for a in &ATTRMAP {
        if a.id == id {
            return a.name.to_string();
        }
    }
    format!("0x{:08x}", id)
}

/// Maps the 22 boolean-property attributes to their bit position.
///
/// The positions match the order the properties are declared in and are
/// stable, an implementation may cache them in a bit vector.
pub fn boolprop_shift(id: CK_ATTRIBUTE_TYPE) -> Option<u32> {
    match id {
        CKA_TOKEN => Some(0),
        CKA_PRIVATE => Some(1),
        CKA_TRUSTED => Some(2),
        CKA_SENSITIVE => Some(3),
        CKA_ENCRYPT => Some(4),
        CKA_DECRYPT => Some(5),
        CKA_WRAP => Some(6),
        CKA_UNWRAP => Some(7),
        CKA_SIGN => Some(8),
        CKA_SIGN_RECOVER => Some(9),
        CKA_VERIFY => Some(10),
        CKA_VERIFY_RECOVER => Some(11),
        CKA_DERIVE => Some(12),
        CKA_EXTRACTABLE => Some(13),
        CKA_LOCAL => Some(14),
        CKA_NEVER_EXTRACTABLE => Some(15),
        CKA_ALWAYS_SENSITIVE => Some(16),
        CKA_MODIFIABLE => Some(17),
        CKA_COPYABLE => Some(18),
        CKA_DESTROYABLE => Some(19),
        CKA_ALWAYS_AUTHENTICATE => Some(20),
        CKA_WRAP_WITH_TRUSTED => Some(21),
        _ => None,
    }
}

/// Checks that an id names a known attribute and that the value size is
/// admissible for its type class. Returns the type on success.
pub fn valid_attribute(id: CK_ATTRIBUTE_TYPE, size: usize) -> Result<AttrType> {
    let atype = match attrmap_entry(id) {
        Some(t) => t,
        None => return Err(CKR_ATTRIBUTE_TYPE_INVALID)?,
    };
    let ok = match atype {
        AttrType::BoolType => size == 1,
        AttrType::NumType => size == 4,
        AttrType::DateType => size == 0 || size == 8,
        AttrType::StringType => true,
        AttrType::BytesType => true,
        AttrType::TemplateType => true,
        AttrType::IgnoreType => true,
        AttrType::DenyType => false,
    };
    if !ok {
        return Err(CKR_TEMPLATE_INCONSISTENT)?;
    }
    Ok(atype)
}

/// An attribute id paired with its typed value bytes
#[derive(Debug, Clone)]
pub struct Attribute {
    id: CK_ATTRIBUTE_TYPE,
    atype: AttrType,
    value: Vec<u8>,
}

impl Attribute {
    pub fn get_type(&self) -> CK_ATTRIBUTE_TYPE {
        self.id
    }

    pub fn get_attrtype(&self) -> AttrType {
        self.atype
    }

    pub fn get_value(&self) -> &Vec<u8> {
        &self.value
    }

    pub fn name(&self) -> String {
        attr_name(self.id)
    }

    pub fn zeroize(&mut self) {
        self.value.zeroize();
    }

    pub fn from_bool(id: CK_ATTRIBUTE_TYPE, val: bool) -> Attribute {
        Attribute {
            id: id,
            atype: AttrType::BoolType,
            value: vec![if val { CK_TRUE } else { CK_FALSE }],
        }
    }

    pub fn from_ulong(id: CK_ATTRIBUTE_TYPE, val: CK_ULONG) -> Attribute {
        Attribute {
            id: id,
            atype: AttrType::NumType,
            value: val.to_le_bytes().to_vec(),
        }
    }

    pub fn from_string(id: CK_ATTRIBUTE_TYPE, val: String) -> Attribute {
        Attribute {
            id: id,
            atype: AttrType::StringType,
            value: val.into_bytes(),
        }
    }

    pub fn from_bytes(id: CK_ATTRIBUTE_TYPE, val: Vec<u8>) -> Attribute {
        Attribute {
            id: id,
            atype: AttrType::BytesType,
            value: val,
        }
    }

    pub fn from_date_bytes(id: CK_ATTRIBUTE_TYPE, val: Vec<u8>) -> Attribute {
        Attribute {
            id: id,
            atype: AttrType::DateType,
            value: val,
        }
    }

    /// Wraps an already serialized nested template
    pub fn from_template_bytes(
        id: CK_ATTRIBUTE_TYPE,
        val: Vec<u8>,
    ) -> Attribute {
        Attribute {
            id: id,
            atype: AttrType::TemplateType,
            value: val,
        }
    }

    /// Builds an attribute from a wire entry, validating the id and the
    /// value size against the attribute catalog
    pub fn from_wire_entry(
        id: CK_ATTRIBUTE_TYPE,
        value: &[u8],
    ) -> Result<Attribute> {
        let atype = valid_attribute(id, value.len())?;
        Ok(Attribute {
            id: id,
            atype: atype,
            value: value.to_vec(),
        })
    }

    pub fn to_bool(&self) -> Result<bool> {
        if self.value.len() != 1 {
            return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
        }
        Ok(self.value[0] != CK_FALSE)
    }

    pub fn to_ulong(&self) -> Result<CK_ULONG> {
        if self.value.len() != 4 {
            return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
        }
        Ok(CK_ULONG::from_le_bytes(self.value.as_slice().try_into()?))
    }

    pub fn to_string(&self) -> Result<String> {
        match std::str::from_utf8(&self.value) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
        }
    }

    pub fn to_bytes(&self) -> Result<&Vec<u8>> {
        Ok(&self.value)
    }

    /// Parses the value as a nested attribute template
    pub fn to_template(&self) -> Result<Attrs> {
        if self.atype != AttrType::TemplateType {
            return Err(CKR_ATTRIBUTE_TYPE_INVALID)?;
        }
        Attrs::deserialize(&self.value)
    }
}

/// Byte length of the serialized attribute list header
pub const ATTRS_HEADER_SIZE: usize = 8;

fn read_u32_le(buf: &[u8], off: usize) -> Result<u32> {
    match buf.get(off..off + 4) {
        Some(b) => Ok(u32::from_le_bytes(b.try_into()?)),
        None => Err(Error::ck_rv(CKR_ARGUMENTS_BAD)),
    }
}

/// An ordered collection of attributes.
///
/// Insertion order is preserved but carries no meaning. All lookup
/// helpers return the first match; the builder and the policy engine
/// rely on the sanitizer having collapsed duplicates beforehand.
#[derive(Debug, Clone, Default)]
pub struct Attrs {
    attrs: Vec<Attribute>,
}

impl Attrs {
    /// Returns an empty attribute list
    pub fn new() -> Attrs {
        Attrs { attrs: Vec::new() }
    }

    /// Appends an attribute at the tail.
    ///
    /// The backing storage is grown first so that on allocation failure
    /// the list is left in its prior valid state.
    pub fn add(&mut self, attr: Attribute) -> Result<()> {
        match self.attrs.try_reserve(1) {
            Ok(()) => {
                self.attrs.push(attr);
                Ok(())
            }
            Err(e) => Err(Error::ck_rv_from_error(CKR_DEVICE_MEMORY, e)),
        }
    }

    /// Removes the first entry with the given id
    pub fn remove(&mut self, id: CK_ATTRIBUTE_TYPE) -> Result<()> {
        match self.attrs.iter().position(|a| a.get_type() == id) {
            Some(idx) => {
                self.attrs.remove(idx);
                Ok(())
            }
            None => Err(Error::not_found(attr_name(id))),
        }
    }

    /// Removes the first entry with the given id only if its value is
    /// empty. Used by builders to drop placeholder slots before adding
    /// filled values.
    pub fn remove_empty(&mut self, id: CK_ATTRIBUTE_TYPE) -> Result<()> {
        match self.attrs.iter().position(|a| a.get_type() == id) {
            Some(idx) => {
                if !self.attrs[idx].get_value().is_empty() {
                    return Err(CKR_GENERAL_ERROR)?;
                }
                self.attrs.remove(idx);
                Ok(())
            }
            None => Err(Error::not_found(attr_name(id))),
        }
    }

    /// Removes all entries with the given id, up to `max_check`
    /// occurrences
    pub fn remove_check(
        &mut self,
        id: CK_ATTRIBUTE_TYPE,
        max_check: usize,
    ) -> Result<()> {
        let mut removed = 0;
        while removed < max_check {
            match self.attrs.iter().position(|a| a.get_type() == id) {
                Some(idx) => {
                    self.attrs.remove(idx);
                    removed += 1;
                }
                None => break,
            }
        }
        if removed == 0 {
            return Err(Error::not_found(attr_name(id)));
        }
        Ok(())
    }

    /// Returns a borrowed view of the first entry with the given id
    pub fn find(&self, id: CK_ATTRIBUTE_TYPE) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.get_type() == id)
    }

    /// Restartable enumeration of all entries with the given id, in
    /// insertion order
    pub fn find_all(
        &self,
        id: CK_ATTRIBUTE_TYPE,
    ) -> impl Iterator<Item = &Attribute> {
        self.attrs.iter().filter(move |a| a.get_type() == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.attrs.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Attribute> {
        self.attrs.iter_mut()
    }

    /// Replaces the first entry with the same id in place, or appends
    /// when no entry exists yet
    pub fn set(&mut self, attr: Attribute) -> Result<()> {
        match self
            .attrs
            .iter()
            .position(|a| a.get_type() == attr.get_type())
        {
            Some(idx) => {
                self.attrs[idx] = attr;
                Ok(())
            }
            None => self.add(attr),
        }
    }

    /// Number of entries
    pub fn count(&self) -> usize {
        self.attrs.len()
    }

    /// Total serialized size in bytes, header included
    pub fn byte_size(&self) -> usize {
        let mut size = ATTRS_HEADER_SIZE;
        for a in &self.attrs {
            size += 8 + a.get_value().len();
        }
        size
    }

    /// Returns the 32 bit value of the attribute.
    ///
    /// A present entry whose value is not exactly 4 bytes is an invariant
    /// violation and reported as CKR_GENERAL_ERROR.
    pub fn get_ulong(&self, id: CK_ATTRIBUTE_TYPE) -> Result<CK_ULONG> {
        match self.find(id) {
            Some(a) => {
                if a.get_value().len() != 4 {
                    return Err(CKR_GENERAL_ERROR)?;
                }
                a.to_ulong()
            }
            None => Err(Error::not_found(attr_name(id))),
        }
    }

    /// Returns the boolean value of the attribute, false when absent.
    ///
    /// Callers never rely on "absent" being distinguished here. A stored
    /// value that is not a single byte is an invariant violation; it is
    /// logged and evaluates to false rather than panicking.
    pub fn get_bool(&self, id: CK_ATTRIBUTE_TYPE) -> bool {
        match self.find(id) {
            Some(a) => match a.to_bool() {
                Ok(b) => b,
                Err(_) => {
                    log::error!(
                        "malformed boolean value for {}",
                        attr_name(id)
                    );
                    false
                }
            },
            None => false,
        }
    }

    /// Returns the object class, CKO_UNDEFINED when absent or malformed
    pub fn get_class(&self) -> CK_OBJECT_CLASS {
        match self.get_ulong(CKA_CLASS) {
            Ok(c) => c,
            Err(_) => CKO_UNDEFINED,
        }
    }

    /// Returns the key type, CKK_UNDEFINED when absent or malformed
    pub fn get_key_type(&self) -> CK_KEY_TYPE {
        match self.get_ulong(CKA_KEY_TYPE) {
            Ok(k) => k,
            Err(_) => CKK_UNDEFINED,
        }
    }

    /// True if every attribute in `self` appears in `candidate` with
    /// identical value bytes
    pub fn match_reference(&self, candidate: &Attrs) -> bool {
        for a in &self.attrs {
            match candidate.find(a.get_type()) {
                Some(c) => {
                    if c.get_value() != a.get_value() {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Serializes the list to the wire format
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_size());
        let attrs_size = self.byte_size() - ATTRS_HEADER_SIZE;
        buf.extend_from_slice(&(attrs_size as u32).to_le_bytes());
        buf.extend_from_slice(&(self.attrs.len() as u32).to_le_bytes());
        for a in &self.attrs {
            buf.extend_from_slice(&a.get_type().to_le_bytes());
            buf.extend_from_slice(&(a.get_value().len() as u32).to_le_bytes());
            buf.extend_from_slice(a.get_value());
        }
        buf
    }

    /// Parses a serialized attribute list, validating each entry against
    /// the attribute catalog.
    ///
    /// Only used for data the token itself produced (stored objects,
    /// sanitized nested templates); client input goes through the
    /// sanitizer instead.
    pub fn deserialize(buf: &[u8]) -> Result<Attrs> {
        if buf.len() < ATTRS_HEADER_SIZE {
            return Err(CKR_ARGUMENTS_BAD)?;
        }
        let attrs_size = read_u32_le(buf, 0)? as usize;
        let attrs_count = read_u32_le(buf, 4)? as usize;
        if buf.len() < ATTRS_HEADER_SIZE + attrs_size {
            return Err(CKR_ARGUMENTS_BAD)?;
        }
        let mut attrs = Attrs::new();
        let mut cur = ATTRS_HEADER_SIZE;
        let end = ATTRS_HEADER_SIZE + attrs_size;
        while cur < end {
            let id = read_u32_le(buf, cur)?;
            let size = read_u32_le(buf, cur + 4)? as usize;
            if cur + 8 + size > end {
                return Err(CKR_ARGUMENTS_BAD)?;
            }
            /* zero-size entries are placeholder slots the builder left
             * for mandated attributes, keep them as such */
            if size == 0 {
                attrs.add(Attribute::from_bytes(id, Vec::new()))?;
            } else {
                attrs.add(Attribute::from_wire_entry(
                    id,
                    &buf[cur + 8..cur + 8 + size],
                )?)?;
            }
            cur += 8 + size;
        }
        if cur != end || attrs.count() != attrs_count {
            return Err(CKR_GENERAL_ERROR)?;
        }
        Ok(attrs)
    }
}
