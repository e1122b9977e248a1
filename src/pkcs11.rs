// Copyright 2023 Trustoken Contributors
// See LICENSE.txt file for terms

//! Cryptoki identifiers and types as carried on the token service ABI.
//!
//! All values are 32 bit little-endian on the wire. The identifiers mirror
//! the PKCS#11 v2.40 client API values; the few entries above 0x80000000
//! are vendor extensions used only inside the service and never returned
//! to applications.

#![allow(dead_code)]

pub type CK_RV = u32;
pub type CK_ULONG = u32;
pub type CK_BBOOL = u8;
pub type CK_FLAGS = u32;
pub type CK_ATTRIBUTE_TYPE = u32;
pub type CK_OBJECT_CLASS = u32;
pub type CK_KEY_TYPE = u32;
pub type CK_MECHANISM_TYPE = u32;
pub type CK_OBJECT_HANDLE = u32;
pub type CK_SESSION_HANDLE = u32;
pub type CK_USER_TYPE = u32;

pub const CK_FALSE: CK_BBOOL = 0;
pub const CK_TRUE: CK_BBOOL = 1;

pub const CK_INVALID_HANDLE: u32 = 0;
pub const CK_UNAVAILABLE_INFORMATION: CK_ULONG = !0;

/* Reserved vendor value for "no id set" */
pub const CK_UNDEFINED_ID: CK_ULONG = !0;

/* Users */
pub const CKU_SO: CK_USER_TYPE = 0;
pub const CKU_USER: CK_USER_TYPE = 1;

/* Object classes */
pub const CKO_DATA: CK_OBJECT_CLASS = 0x0000;
pub const CKO_CERTIFICATE: CK_OBJECT_CLASS = 0x0001;
pub const CKO_PUBLIC_KEY: CK_OBJECT_CLASS = 0x0002;
pub const CKO_PRIVATE_KEY: CK_OBJECT_CLASS = 0x0003;
pub const CKO_SECRET_KEY: CK_OBJECT_CLASS = 0x0004;
pub const CKO_HW_FEATURE: CK_OBJECT_CLASS = 0x0005;
pub const CKO_DOMAIN_PARAMETERS: CK_OBJECT_CLASS = 0x0006;
pub const CKO_MECHANISM: CK_OBJECT_CLASS = 0x0007;
pub const CKO_OTP_KEY: CK_OBJECT_CLASS = 0x0008;
pub const CKO_UNDEFINED: CK_OBJECT_CLASS = CK_UNDEFINED_ID;

/* Key types */
pub const CKK_RSA: CK_KEY_TYPE = 0x0000;
pub const CKK_DSA: CK_KEY_TYPE = 0x0001;
pub const CKK_DH: CK_KEY_TYPE = 0x0002;
pub const CKK_EC: CK_KEY_TYPE = 0x0003;
pub const CKK_GENERIC_SECRET: CK_KEY_TYPE = 0x0010;
pub const CKK_AES: CK_KEY_TYPE = 0x001f;
pub const CKK_MD5_HMAC: CK_KEY_TYPE = 0x0027;
pub const CKK_SHA_1_HMAC: CK_KEY_TYPE = 0x0028;
pub const CKK_SHA256_HMAC: CK_KEY_TYPE = 0x002b;
pub const CKK_SHA384_HMAC: CK_KEY_TYPE = 0x002c;
pub const CKK_SHA512_HMAC: CK_KEY_TYPE = 0x002d;
pub const CKK_SHA224_HMAC: CK_KEY_TYPE = 0x002e;
pub const CKK_UNDEFINED: CK_KEY_TYPE = CK_UNDEFINED_ID;

/* Array-valued attributes carry a nested attribute template */
pub const CKF_ARRAY_ATTRIBUTE: CK_ATTRIBUTE_TYPE = 0x40000000;

/* Attributes */
pub const CKA_CLASS: CK_ATTRIBUTE_TYPE = 0x0000;
pub const CKA_TOKEN: CK_ATTRIBUTE_TYPE = 0x0001;
pub const CKA_PRIVATE: CK_ATTRIBUTE_TYPE = 0x0002;
pub const CKA_LABEL: CK_ATTRIBUTE_TYPE = 0x0003;
pub const CKA_APPLICATION: CK_ATTRIBUTE_TYPE = 0x0010;
pub const CKA_VALUE: CK_ATTRIBUTE_TYPE = 0x0011;
pub const CKA_OBJECT_ID: CK_ATTRIBUTE_TYPE = 0x0012;
pub const CKA_TRUSTED: CK_ATTRIBUTE_TYPE = 0x0086;
pub const CKA_KEY_TYPE: CK_ATTRIBUTE_TYPE = 0x0100;
pub const CKA_SUBJECT: CK_ATTRIBUTE_TYPE = 0x0101;
pub const CKA_ID: CK_ATTRIBUTE_TYPE = 0x0102;
pub const CKA_SENSITIVE: CK_ATTRIBUTE_TYPE = 0x0103;
pub const CKA_ENCRYPT: CK_ATTRIBUTE_TYPE = 0x0104;
pub const CKA_DECRYPT: CK_ATTRIBUTE_TYPE = 0x0105;
pub const CKA_WRAP: CK_ATTRIBUTE_TYPE = 0x0106;
pub const CKA_UNWRAP: CK_ATTRIBUTE_TYPE = 0x0107;
pub const CKA_SIGN: CK_ATTRIBUTE_TYPE = 0x0108;
pub const CKA_SIGN_RECOVER: CK_ATTRIBUTE_TYPE = 0x0109;
pub const CKA_VERIFY: CK_ATTRIBUTE_TYPE = 0x010a;
pub const CKA_VERIFY_RECOVER: CK_ATTRIBUTE_TYPE = 0x010b;
pub const CKA_DERIVE: CK_ATTRIBUTE_TYPE = 0x010c;
pub const CKA_START_DATE: CK_ATTRIBUTE_TYPE = 0x0110;
pub const CKA_END_DATE: CK_ATTRIBUTE_TYPE = 0x0111;
pub const CKA_MODULUS: CK_ATTRIBUTE_TYPE = 0x0120;
pub const CKA_MODULUS_BITS: CK_ATTRIBUTE_TYPE = 0x0121;
pub const CKA_PUBLIC_EXPONENT: CK_ATTRIBUTE_TYPE = 0x0122;
pub const CKA_PRIVATE_EXPONENT: CK_ATTRIBUTE_TYPE = 0x0123;
pub const CKA_PRIME_1: CK_ATTRIBUTE_TYPE = 0x0124;
pub const CKA_PRIME_2: CK_ATTRIBUTE_TYPE = 0x0125;
pub const CKA_EXPONENT_1: CK_ATTRIBUTE_TYPE = 0x0126;
pub const CKA_EXPONENT_2: CK_ATTRIBUTE_TYPE = 0x0127;
pub const CKA_COEFFICIENT: CK_ATTRIBUTE_TYPE = 0x0128;
pub const CKA_PUBLIC_KEY_INFO: CK_ATTRIBUTE_TYPE = 0x0129;
pub const CKA_PRIME: CK_ATTRIBUTE_TYPE = 0x0130;
pub const CKA_SUBPRIME: CK_ATTRIBUTE_TYPE = 0x0131;
pub const CKA_BASE: CK_ATTRIBUTE_TYPE = 0x0132;
pub const CKA_VALUE_BITS: CK_ATTRIBUTE_TYPE = 0x0160;
pub const CKA_VALUE_LEN: CK_ATTRIBUTE_TYPE = 0x0161;
pub const CKA_EXTRACTABLE: CK_ATTRIBUTE_TYPE = 0x0162;
pub const CKA_LOCAL: CK_ATTRIBUTE_TYPE = 0x0163;
pub const CKA_NEVER_EXTRACTABLE: CK_ATTRIBUTE_TYPE = 0x0164;
pub const CKA_ALWAYS_SENSITIVE: CK_ATTRIBUTE_TYPE = 0x0165;
pub const CKA_KEY_GEN_MECHANISM: CK_ATTRIBUTE_TYPE = 0x0166;
pub const CKA_MODIFIABLE: CK_ATTRIBUTE_TYPE = 0x0170;
pub const CKA_COPYABLE: CK_ATTRIBUTE_TYPE = 0x0171;
pub const CKA_DESTROYABLE: CK_ATTRIBUTE_TYPE = 0x0172;
pub const CKA_EC_PARAMS: CK_ATTRIBUTE_TYPE = 0x0180;
pub const CKA_EC_POINT: CK_ATTRIBUTE_TYPE = 0x0181;
pub const CKA_ALWAYS_AUTHENTICATE: CK_ATTRIBUTE_TYPE = 0x0202;
pub const CKA_WRAP_WITH_TRUSTED: CK_ATTRIBUTE_TYPE = 0x0210;
pub const CKA_WRAP_TEMPLATE: CK_ATTRIBUTE_TYPE = CKF_ARRAY_ATTRIBUTE | 0x0211;
pub const CKA_UNWRAP_TEMPLATE: CK_ATTRIBUTE_TYPE = CKF_ARRAY_ATTRIBUTE | 0x0212;
pub const CKA_DERIVE_TEMPLATE: CK_ATTRIBUTE_TYPE = CKF_ARRAY_ATTRIBUTE | 0x0213;
pub const CKA_MECHANISM_TYPE: CK_ATTRIBUTE_TYPE = 0x0500;
pub const CKA_ALLOWED_MECHANISMS: CK_ATTRIBUTE_TYPE =
    CKF_ARRAY_ATTRIBUTE | 0x0600;

/* Mechanisms */
pub const CKM_RSA_PKCS_KEY_PAIR_GEN: CK_MECHANISM_TYPE = 0x00000;
pub const CKM_RSA_PKCS: CK_MECHANISM_TYPE = 0x00001;
pub const CKM_RSA_9796: CK_MECHANISM_TYPE = 0x00002;
pub const CKM_RSA_X_509: CK_MECHANISM_TYPE = 0x00003;
pub const CKM_SHA1_RSA_PKCS: CK_MECHANISM_TYPE = 0x00006;
pub const CKM_RSA_PKCS_OAEP: CK_MECHANISM_TYPE = 0x00009;
pub const CKM_RSA_PKCS_PSS: CK_MECHANISM_TYPE = 0x0000d;
pub const CKM_SHA1_RSA_PKCS_PSS: CK_MECHANISM_TYPE = 0x0000e;
pub const CKM_DH_PKCS_DERIVE: CK_MECHANISM_TYPE = 0x00021;
pub const CKM_SHA256_RSA_PKCS: CK_MECHANISM_TYPE = 0x00040;
pub const CKM_SHA384_RSA_PKCS: CK_MECHANISM_TYPE = 0x00041;
pub const CKM_SHA512_RSA_PKCS: CK_MECHANISM_TYPE = 0x00042;
pub const CKM_SHA256_RSA_PKCS_PSS: CK_MECHANISM_TYPE = 0x00043;
pub const CKM_SHA384_RSA_PKCS_PSS: CK_MECHANISM_TYPE = 0x00044;
pub const CKM_SHA512_RSA_PKCS_PSS: CK_MECHANISM_TYPE = 0x00045;
pub const CKM_SHA224_RSA_PKCS: CK_MECHANISM_TYPE = 0x00046;
pub const CKM_SHA224_RSA_PKCS_PSS: CK_MECHANISM_TYPE = 0x00047;
pub const CKM_MD5: CK_MECHANISM_TYPE = 0x00210;
pub const CKM_MD5_HMAC: CK_MECHANISM_TYPE = 0x00211;
pub const CKM_SHA_1: CK_MECHANISM_TYPE = 0x00220;
pub const CKM_SHA_1_HMAC: CK_MECHANISM_TYPE = 0x00221;
pub const CKM_SHA256: CK_MECHANISM_TYPE = 0x00250;
pub const CKM_SHA256_HMAC: CK_MECHANISM_TYPE = 0x00251;
pub const CKM_SHA224: CK_MECHANISM_TYPE = 0x00255;
pub const CKM_SHA224_HMAC: CK_MECHANISM_TYPE = 0x00256;
pub const CKM_SHA384: CK_MECHANISM_TYPE = 0x00260;
pub const CKM_SHA384_HMAC: CK_MECHANISM_TYPE = 0x00261;
pub const CKM_SHA512: CK_MECHANISM_TYPE = 0x00270;
pub const CKM_SHA512_HMAC: CK_MECHANISM_TYPE = 0x00271;
pub const CKM_GENERIC_SECRET_KEY_GEN: CK_MECHANISM_TYPE = 0x00350;
pub const CKM_EC_KEY_PAIR_GEN: CK_MECHANISM_TYPE = 0x01040;
pub const CKM_ECDSA: CK_MECHANISM_TYPE = 0x01041;
pub const CKM_ECDSA_SHA1: CK_MECHANISM_TYPE = 0x01042;
pub const CKM_ECDSA_SHA224: CK_MECHANISM_TYPE = 0x01043;
pub const CKM_ECDSA_SHA256: CK_MECHANISM_TYPE = 0x01044;
pub const CKM_ECDSA_SHA384: CK_MECHANISM_TYPE = 0x01045;
pub const CKM_ECDSA_SHA512: CK_MECHANISM_TYPE = 0x01046;
pub const CKM_ECDH1_DERIVE: CK_MECHANISM_TYPE = 0x01050;
pub const CKM_ECDH1_COFACTOR_DERIVE: CK_MECHANISM_TYPE = 0x01051;
pub const CKM_ECMQV_DERIVE: CK_MECHANISM_TYPE = 0x01052;
pub const CKM_ECDH_AES_KEY_WRAP: CK_MECHANISM_TYPE = 0x01053;
pub const CKM_RSA_AES_KEY_WRAP: CK_MECHANISM_TYPE = 0x01054;
pub const CKM_AES_KEY_GEN: CK_MECHANISM_TYPE = 0x01080;
pub const CKM_AES_ECB: CK_MECHANISM_TYPE = 0x01081;
pub const CKM_AES_CBC: CK_MECHANISM_TYPE = 0x01082;
pub const CKM_AES_CBC_PAD: CK_MECHANISM_TYPE = 0x01085;
pub const CKM_AES_CTR: CK_MECHANISM_TYPE = 0x01086;
pub const CKM_AES_GCM: CK_MECHANISM_TYPE = 0x01087;
pub const CKM_AES_CCM: CK_MECHANISM_TYPE = 0x01088;
pub const CKM_AES_CTS: CK_MECHANISM_TYPE = 0x01089;
pub const CKM_AES_CMAC: CK_MECHANISM_TYPE = 0x0108a;
pub const CKM_AES_CMAC_GENERAL: CK_MECHANISM_TYPE = 0x0108b;
pub const CKM_AES_XCBC_MAC: CK_MECHANISM_TYPE = 0x0108c;
pub const CKM_AES_GMAC: CK_MECHANISM_TYPE = 0x0108e;
pub const CKM_AES_ECB_ENCRYPT_DATA: CK_MECHANISM_TYPE = 0x01104;
pub const CKM_AES_CBC_ENCRYPT_DATA: CK_MECHANISM_TYPE = 0x01105;

/*
 * Vendor extensions: processing identifiers for operations that are not
 * tied to a Cryptoki mechanism. Internal only.
 */
pub const PROCESSING_IMPORT: CK_MECHANISM_TYPE = 0x80000000;
pub const PROCESSING_COPY: CK_MECHANISM_TYPE = 0x80000001;
pub const CKM_UNDEFINED: CK_MECHANISM_TYPE = CK_UNDEFINED_ID;

/* Mechanism function flags */
pub const CKF_HW: CK_FLAGS = 1 << 0;
pub const CKF_ENCRYPT: CK_FLAGS = 1 << 8;
pub const CKF_DECRYPT: CK_FLAGS = 1 << 9;
pub const CKF_DIGEST: CK_FLAGS = 1 << 10;
pub const CKF_SIGN: CK_FLAGS = 1 << 11;
pub const CKF_SIGN_RECOVER: CK_FLAGS = 1 << 12;
pub const CKF_VERIFY: CK_FLAGS = 1 << 13;
pub const CKF_VERIFY_RECOVER: CK_FLAGS = 1 << 14;
pub const CKF_GENERATE: CK_FLAGS = 1 << 15;
pub const CKF_GENERATE_KEY_PAIR: CK_FLAGS = 1 << 16;
pub const CKF_WRAP: CK_FLAGS = 1 << 17;
pub const CKF_UNWRAP: CK_FLAGS = 1 << 18;
pub const CKF_DERIVE: CK_FLAGS = 1 << 19;

/* Return values */
pub const CKR_OK: CK_RV = 0x0000;
pub const CKR_CANCEL: CK_RV = 0x0001;
pub const CKR_SLOT_ID_INVALID: CK_RV = 0x0003;
pub const CKR_GENERAL_ERROR: CK_RV = 0x0005;
pub const CKR_FUNCTION_FAILED: CK_RV = 0x0006;
pub const CKR_ARGUMENTS_BAD: CK_RV = 0x0007;
pub const CKR_ATTRIBUTE_READ_ONLY: CK_RV = 0x0010;
pub const CKR_ATTRIBUTE_SENSITIVE: CK_RV = 0x0011;
pub const CKR_ATTRIBUTE_TYPE_INVALID: CK_RV = 0x0012;
pub const CKR_ATTRIBUTE_VALUE_INVALID: CK_RV = 0x0013;
pub const CKR_ACTION_PROHIBITED: CK_RV = 0x001b;
pub const CKR_DEVICE_ERROR: CK_RV = 0x0030;
pub const CKR_DEVICE_MEMORY: CK_RV = 0x0031;
pub const CKR_FUNCTION_NOT_SUPPORTED: CK_RV = 0x0054;
pub const CKR_KEY_HANDLE_INVALID: CK_RV = 0x0060;
pub const CKR_KEY_SIZE_RANGE: CK_RV = 0x0062;
pub const CKR_KEY_TYPE_INCONSISTENT: CK_RV = 0x0063;
pub const CKR_KEY_FUNCTION_NOT_PERMITTED: CK_RV = 0x0068;
pub const CKR_KEY_NOT_WRAPPABLE: CK_RV = 0x0069;
pub const CKR_KEY_UNEXTRACTABLE: CK_RV = 0x006a;
pub const CKR_MECHANISM_INVALID: CK_RV = 0x0070;
pub const CKR_MECHANISM_PARAM_INVALID: CK_RV = 0x0071;
pub const CKR_OBJECT_HANDLE_INVALID: CK_RV = 0x0082;
pub const CKR_OPERATION_ACTIVE: CK_RV = 0x0090;
pub const CKR_OPERATION_NOT_INITIALIZED: CK_RV = 0x0091;
pub const CKR_SESSION_HANDLE_INVALID: CK_RV = 0x00b3;
pub const CKR_SESSION_READ_ONLY: CK_RV = 0x00b5;
pub const CKR_TEMPLATE_INCOMPLETE: CK_RV = 0x00d0;
pub const CKR_TEMPLATE_INCONSISTENT: CK_RV = 0x00d1;
pub const CKR_USER_ALREADY_LOGGED_IN: CK_RV = 0x0100;
pub const CKR_USER_NOT_LOGGED_IN: CK_RV = 0x0101;
pub const CKR_USER_TYPE_INVALID: CK_RV = 0x0103;
pub const CKR_BUFFER_TOO_SMALL: CK_RV = 0x0150;

/*
 * Vendor extensions: internal status values, translated before leaving
 * the service.
 */
pub const RV_NOT_FOUND: CK_RV = 0x80000000;
pub const RV_NOT_IMPLEMENTED: CK_RV = 0x80000001;
