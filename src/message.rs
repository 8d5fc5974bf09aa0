// message.rs - RADIUS packet assembly and the Request Authenticator
//
// Grounded on examples/original_source/libradi/radius.py::RadiusMessage.
// `RADIUS_HDR_TMPL = "!BBH16s"` becomes an explicit byte-for-byte encode;
// the MD5 digest uses the `md-5` RustCrypto crate (the teacher's own
// Message-Authenticator was a non-functional `vec![0; 16]` stub - this is
// the first place it is wired up for real, grounded in the actual usage
// pattern in examples/hdds-team-hdds/crates/hdds/src/xtypes/equivalence.rs).

use bytes::{BufMut, BytesMut};
use md5::{Digest, Md5};

use crate::avp::Avp;
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};

/// RADIUS packet codes this client emits. Non-goals (Access-Request/
/// Response) are intentionally absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketCode {
    AccountingRequest,
}

impl PacketCode {
    fn wire(self) -> u8 {
        match self {
            Self::AccountingRequest => 4,
        }
    }
}

const HEADER_LEN: usize = 20;
const MAX_PACKET_LEN: usize = 4096;

/// An assembled Accounting-Request, ready to encode or already encoded.
pub struct Message {
    code: PacketCode,
    identifier: u8,
    secret: String,
    avps: Vec<Avp>,
}

impl Message {
    pub fn new(code: PacketCode, identifier: u8, secret: impl Into<String>) -> Self {
        Self {
            code,
            identifier,
            secret: secret.into(),
            avps: Vec::new(),
        }
    }

    /// Append an AVP, checking the packet would not exceed the wire length
    /// limit once encoded.
    pub fn add_avp(&mut self, avp: Avp) -> Result<()> {
        let prospective = self.body_len() + avp.byte_len();
        if HEADER_LEN + prospective > MAX_PACKET_LEN {
            return Err(Error::LengthOverflow {
                what: "message",
                len: HEADER_LEN + prospective,
                max: MAX_PACKET_LEN,
            });
        }
        self.avps.push(avp);
        Ok(())
    }

    fn body_len(&self) -> usize {
        self.avps.iter().map(Avp::byte_len).sum()
    }

    /// Encode the full packet: header + AVPs, with the Request
    /// Authenticator computed per RFC 2866 section 3:
    /// `MD5(code || id || length || 16 zero bytes || AVPs || secret)`.
    pub fn encode(&self, dictionary: &Dictionary) -> Result<Vec<u8>> {
        let mut avp_bytes = BytesMut::new();
        for avp in &self.avps {
            let vendor_number = avp
                .def
                .vendor
                .as_ref()
                .map(|name| dictionary.vendor(name).map(|v| v.number))
                .transpose()?;
            avp.encode(&mut avp_bytes, vendor_number)?;
        }

        let total_len = HEADER_LEN + avp_bytes.len();
        if total_len > MAX_PACKET_LEN {
            return Err(Error::LengthOverflow {
                what: "message",
                len: total_len,
                max: MAX_PACKET_LEN,
            });
        }

        let mut digest_input = BytesMut::with_capacity(total_len + self.secret.len());
        digest_input.put_u8(self.code.wire());
        digest_input.put_u8(self.identifier);
        digest_input.put_u16(total_len as u16);
        digest_input.put_slice(&[0u8; 16]);
        digest_input.extend_from_slice(&avp_bytes);
        digest_input.extend_from_slice(self.secret.as_bytes());

        let mut hasher = Md5::new();
        hasher.update(&digest_input);
        let authenticator = hasher.finalize();

        let mut out = BytesMut::with_capacity(total_len);
        out.put_u8(self.code.wire());
        out.put_u8(self.identifier);
        out.put_u16(total_len as u16);
        out.put_slice(&authenticator);
        out.extend_from_slice(&avp_bytes);

        tracing::debug!(
            avp_count = self.avps.len(),
            length = total_len,
            "message assembled"
        );

        Ok(out.to_vec())
    }
}
