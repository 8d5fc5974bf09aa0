// assembler.rs - builds the fixed-order AVP sequence for an accounting request
//
// Grounded on examples/original_source/radi.py::create_radius_request, the
// newest and most complete of the retrieved CLI variants. The 3GPP SAI
// packed structure (`!BBBBHH`) is grounded on the same file's
// `subs_loc_info` handling.

use bytes::BufMut;
use std::sync::Arc;

use crate::avp::Avp;
use crate::config::{Action, Config};
use crate::dictionary::{AttributeDef, Dictionary};
use crate::error::Result;
use crate::types::{bits_to_ip4mask, TypedValue};

/// Default 3GPP Supported-Area-Identity used when `-a 3gpp-location-info=...`
/// is not given: location type 0, MCC/MNC 000/00, LAC 0, CI 0.
fn default_location_info() -> Vec<u8> {
    let mut buf = bytes::BytesMut::with_capacity(8);
    buf.put_u8(0); // location type
    buf.put_u8(0); // MCC/MNC digit pack (byte 1)
    buf.put_u8(0); // MCC/MNC digit pack (byte 2)
    buf.put_u8(0); // MCC/MNC digit pack (byte 3)
    buf.put_u16(0); // LAC
    buf.put_u16(0); // CI
    buf.to_vec()
}

fn attr(dict: &Dictionary, name: &str) -> Result<Arc<AttributeDef>> {
    dict.attribute(name)
}

/// Build the ordered AVP list for one accounting request, per the fixed
/// attribute order: User-Name, Acct-Status-Type, NAS-IP(v6)-Address
/// (derived from `radius_dest`), Framed-IP(v6-Prefix | -Address+-Netmask),
/// Framed-Protocol (always sent), Calling/Called-Station-Id,
/// 3GPP-Location-Info, 3GPP-IMSI, 3GPP-IMEISV, then any extra
/// `-a name=value` AVPs in the order they were given.
pub fn build_avps(cfg: &Config, dict: &Dictionary, action: Action) -> Result<Vec<Avp>> {
    let mut avps = Vec::new();

    if let Some(username) = &cfg.username {
        avps.push(Avp::new(attr(dict, "User-Name")?, username)?);
    }

    avps.push(Avp::new(
        attr(dict, "Acct-Status-Type")?,
        action.status_type_name(),
    )?);

    if cfg.radius_dest.contains(':') {
        avps.push(Avp::new(attr(dict, "NAS-IPv6-Address")?, &cfg.radius_dest)?);
    } else {
        avps.push(Avp::new(attr(dict, "NAS-IP-Address")?, &cfg.radius_dest)?);
    }

    if let Some(framed_ip) = &cfg.framed_ip {
        let is_v6 = framed_ip.contains(':');
        if is_v6 {
            let mask = cfg.framed_mask.unwrap_or(128);
            avps.push(Avp::new(
                attr(dict, "Framed-IPv6-Prefix")?,
                &format!("{framed_ip}/{mask}"),
            )?);
        } else {
            avps.push(Avp::new(attr(dict, "Framed-IP-Address")?, framed_ip)?);
            if let Some(mask_bits) = cfg.framed_mask {
                let dotted = bits_to_ip4mask(mask_bits as i32)?;
                avps.push(Avp::new(attr(dict, "Framed-IP-Netmask")?, &dotted)?);
            }
        }
    }
    // Framed-Protocol is sent unconditionally, matching
    // original_source/radi.py's rad.add_avp("Framed-Protocol", ...) call,
    // which sits outside the v4/v6 framed-ip branching.
    avps.push(Avp::new(attr(dict, "Framed-Protocol")?, "1")?);

    if let Some(calling_id) = &cfg.calling_id {
        avps.push(Avp::new(attr(dict, "Calling-Station-Id")?, calling_id)?);
    }
    if let Some(called_id) = &cfg.called_id {
        avps.push(Avp::new(attr(dict, "Called-Station-Id")?, called_id)?);
    }

    if let Ok(location_attr) = attr(dict, "3GPP-Location-Info") {
        let value = match &cfg.subs_loc_info {
            Some(hex_literal) => parse_hex_octets(hex_literal)?,
            None => default_location_info(),
        };
        avps.push(Avp::from_value(location_attr, TypedValue::Text(value)));
    }

    if let Some(imsi) = &cfg.imsi {
        if let Ok(imsi_attr) = attr(dict, "3GPP-IMSI") {
            avps.push(Avp::new(imsi_attr, imsi)?);
        }
    }
    if let Some(imei) = &cfg.imei {
        if let Ok(imei_attr) = attr(dict, "3GPP-IMEISV") {
            avps.push(Avp::new(imei_attr, imei)?);
        }
    }

    for (name, value) in &cfg.avps {
        avps.push(Avp::new(attr(dict, name)?, value)?);
    }

    Ok(avps)
}

fn parse_hex_octets(literal: &str) -> Result<Vec<u8>> {
    let stripped = literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
        .unwrap_or(literal);
    let mut bytes = Vec::with_capacity(stripped.len() / 2);
    let chars: Vec<char> = stripped.chars().collect();
    for pair in chars.chunks(2) {
        let s: String = pair.iter().collect();
        let b = u8::from_str_radix(&s, 16).map_err(|_| crate::error::Error::ParseError {
            type_tag: "octets",
            literal: literal.to_string(),
            reason: "expected a hex string".to_string(),
        })?;
        bytes.push(b);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_location_info_is_eight_zero_bytes() {
        assert_eq!(default_location_info(), vec![0u8; 8]);
    }

    #[test]
    fn parse_hex_octets_strips_0x_prefix() {
        assert_eq!(parse_hex_octets("0x0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert_eq!(parse_hex_octets("ff00").unwrap(), vec![0xff, 0x00]);
    }

    #[test]
    fn build_avps_orders_fixed_attributes_before_extras() {
        let dir = std::env::temp_dir().join(format!("rad-acct-asm-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let dict_path = dir.join("dictionary");
        std::fs::write(
            &dict_path,
            "ATTRIBUTE User-Name 1 string\n\
             ATTRIBUTE Acct-Status-Type 40 integer\n\
             VALUE Acct-Status-Type Start 1\n\
             ATTRIBUTE NAS-IP-Address 4 ipaddr\n\
             ATTRIBUTE Framed-Protocol 7 integer\n\
             ATTRIBUTE Calling-Station-Id 31 string\n",
        )
        .unwrap();
        let dict = crate::dictionary::Dictionary::load(&dict_path).unwrap();

        let cfg = Config {
            radius_dest: "127.0.0.1".to_string(),
            radius_port: 1813,
            radius_secret: "secret".to_string(),
            action: Action::Start,
            username: Some("bob".to_string()),
            imsi: None,
            imei: None,
            framed_ip: None,
            framed_mask: None,
            calling_id: Some("555-1234".to_string()),
            called_id: None,
            subs_loc_info: None,
            delay: 1,
            avps: Vec::new(),
            dict_path: dir.clone(),
            dict_fname: "dictionary".to_string(),
        };

        let avps = build_avps(&cfg, &dict, Action::Start).unwrap();
        assert_eq!(avps[0].def.name, "User-Name");
        assert_eq!(avps[1].def.name, "Acct-Status-Type");
        assert_eq!(avps[2].def.name, "NAS-IP-Address");
        assert_eq!(avps[3].def.name, "Framed-Protocol");
        assert_eq!(avps[4].def.name, "Calling-Station-Id");
    }

    #[test]
    fn framed_protocol_is_sent_even_without_framed_ip() {
        let dir = std::env::temp_dir().join(format!("rad-acct-asm-test2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let dict_path = dir.join("dictionary");
        std::fs::write(
            &dict_path,
            "ATTRIBUTE Acct-Status-Type 40 integer\n\
             VALUE Acct-Status-Type Start 1\n\
             ATTRIBUTE NAS-IP-Address 4 ipaddr\n\
             ATTRIBUTE Framed-Protocol 7 integer\n",
        )
        .unwrap();
        let dict = crate::dictionary::Dictionary::load(&dict_path).unwrap();

        let cfg = Config {
            radius_dest: "127.0.0.1".to_string(),
            radius_port: 1813,
            radius_secret: "secret".to_string(),
            action: Action::Start,
            username: None,
            imsi: None,
            imei: None,
            framed_ip: None,
            framed_mask: None,
            calling_id: None,
            called_id: None,
            subs_loc_info: None,
            delay: 1,
            avps: Vec::new(),
            dict_path: dir.clone(),
            dict_fname: "dictionary".to_string(),
        };

        let avps = build_avps(&cfg, &dict, Action::Start).unwrap();
        assert!(avps.iter().any(|a| a.def.name == "Framed-Protocol"));
        assert!(avps.iter().any(|a| a.def.name == "NAS-IP-Address"));
    }

    #[test]
    fn nas_ipv6_address_used_for_ipv6_destination() {
        let dir = std::env::temp_dir().join(format!("rad-acct-asm-test3-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let dict_path = dir.join("dictionary");
        std::fs::write(
            &dict_path,
            "ATTRIBUTE Acct-Status-Type 40 integer\n\
             VALUE Acct-Status-Type Start 1\n\
             ATTRIBUTE NAS-IPv6-Address 95 ipv6addr\n\
             ATTRIBUTE Framed-Protocol 7 integer\n",
        )
        .unwrap();
        let dict = crate::dictionary::Dictionary::load(&dict_path).unwrap();

        let cfg = Config {
            radius_dest: "2001:db8::1".to_string(),
            radius_port: 1813,
            radius_secret: "secret".to_string(),
            action: Action::Start,
            username: None,
            imsi: None,
            imei: None,
            framed_ip: None,
            framed_mask: None,
            calling_id: None,
            called_id: None,
            subs_loc_info: None,
            delay: 1,
            avps: Vec::new(),
            dict_path: dir.clone(),
            dict_fname: "dictionary".to_string(),
        };

        let avps = build_avps(&cfg, &dict, Action::Start).unwrap();
        assert!(avps.iter().any(|a| a.def.name == "NAS-IPv6-Address"));
    }
}
