// avp.rs - Attribute-Value Pair construction and encoding
//
// Grounded on examples/original_source/libradi/radius.py::RadiusAvp. The
// Python class recurses through an `allow_child` flag to build nested
// Vendor-Specific Attributes; this module keeps that one non-recursive
// level (RADIUS only nests one level deep: type 26 wrapping a vendor's own
// sub-attributes) rather than a general recursive tree.

use bytes::BytesMut;

use crate::dictionary::AttributeDef;
use crate::error::{Error, Result};
use std::sync::Arc;

/// Attribute type used for all Vendor-Specific Attributes (RFC 2865 §5.26).
pub const VENDOR_SPECIFIC_TYPE: u8 = 26;

/// A single wire-ready attribute, carrying its own sub-AVP if it is vendor-scoped.
#[derive(Debug, Clone)]
pub struct Avp {
    pub def: Arc<AttributeDef>,
    pub value: crate::types::TypedValue,
}

impl Avp {
    /// Build an AVP from a dictionary attribute and a textual literal.
    ///
    /// If the literal names an enumerated `VALUE`, it is resolved to its
    /// wire integer first; numeric literals remain numeric literals.
    /// Enumerated attributes with literals not found either way are
    /// rejected with `DisallowedValue`.
    pub fn new(def: Arc<AttributeDef>, literal: &str) -> Result<Self> {
        let value = if !def.values.is_empty() {
            match def.resolve_value(literal) {
                Some(wire_value) => {
                    crate::types::TypedValue::parse(def.type_tag, &wire_value.to_string())?
                }
                None => match crate::types::TypedValue::parse(def.type_tag, literal) {
                    Ok(v) => v,
                    Err(_) => {
                        return Err(Error::DisallowedValue {
                            attr: def.name.clone(),
                            value: literal.to_string(),
                        })
                    }
                },
            }
        } else {
            crate::types::TypedValue::parse(def.type_tag, literal)?
        };
        Ok(Self { def, value })
    }

    /// Build an AVP directly from an already-typed value (used by callers
    /// that construct structured values, e.g. the 3GPP location-info octet
    /// string, rather than a textual literal).
    pub fn from_value(def: Arc<AttributeDef>, value: crate::types::TypedValue) -> Self {
        Self { def, value }
    }

    /// Total wire length of this AVP: type(1) + length(1) + value, plus the
    /// Vendor-Specific wrapper (type 26, length, vendor-id(4)) when this
    /// attribute belongs to a vendor.
    pub fn byte_len(&self) -> usize {
        let inner = 2 + self.value.byte_len();
        match &self.def.vendor {
            Some(_) => 2 + 4 + inner,
            None => inner,
        }
    }

    /// Encode this AVP (and its Vendor-Specific wrapper, if any) onto `out`.
    pub fn encode(&self, out: &mut BytesMut, vendor_number: Option<u32>) -> Result<()> {
        let total = self.byte_len();
        if total > 255 {
            return Err(Error::LengthOverflow {
                what: "AVP",
                len: total,
                max: 255,
            });
        }

        match (&self.def.vendor, vendor_number) {
            (Some(_), Some(number)) => {
                out.extend_from_slice(&[VENDOR_SPECIFIC_TYPE, total as u8]);
                out.extend_from_slice(&number.to_be_bytes());
                out.extend_from_slice(&[self.def.code as u8, (2 + self.value.byte_len()) as u8]);
                self.value.encode(out);
            }
            (Some(name), None) => {
                return Err(Error::UnknownVendor(name.clone()));
            }
            (None, _) => {
                out.extend_from_slice(&[self.def.code as u8, total as u8]);
                self.value.encode(out);
            }
        }
        Ok(())
    }
}
