//! Wire-format conversion
//!
//! Pure mapping between the canonical record shape and the rdata field names
//! DNS backends speak (`ipAddress`, `mailExchange`, `ptrName`, ...). Both
//! directions are stateless; adapters own the HTTP envelope around this.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{DnsRecord, RecordType};

/// A record as a backend transmits it: name, type, TTL and per-type rdata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: String,
    pub ttl: u32,
    #[serde(default)]
    pub r_data: WireRecordData,
}

/// Backend rdata, one field set per record type
///
/// Unrecognized fields collect in `extra` so nothing a backend sends is
/// dropped on the floor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecordData {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mail_exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub preference: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ptr_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub flags: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tag: Option<String>,
    /// Generic payload for extension types
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<String>,
    /// Anything the backend sent that no named field covers
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Convert a canonical record into its wire form
pub fn to_wire(record: &DnsRecord) -> WireRecord {
    let mut rdata = WireRecordData::default();
    match record.rtype {
        RecordType::A | RecordType::Aaaa => {
            rdata.ip_address = Some(record.content.clone());
        }
        RecordType::Cname => {
            rdata.cname = Some(record.content.clone());
        }
        RecordType::Aname => {
            rdata.aname = Some(record.content.clone());
        }
        RecordType::Txt => {
            rdata.text = Some(record.content.clone());
        }
        RecordType::Mx => {
            rdata.mail_exchange = Some(record.content.clone());
            rdata.preference = record.priority;
        }
        RecordType::Ns => {
            rdata.name_server = Some(record.content.clone());
        }
        RecordType::Ptr => {
            rdata.ptr_name = Some(record.content.clone());
        }
        RecordType::Srv => {
            rdata.target = Some(record.content.clone());
            rdata.priority = record.priority;
            rdata.weight = record.weight;
            rdata.port = record.port;
        }
        RecordType::Caa => {
            rdata.value = Some(record.content.clone());
            rdata.flags = record.flags;
            rdata.tag = record.tag.clone();
        }
        RecordType::Other(_) => {
            rdata.data = Some(record.content.clone());
        }
    }
    WireRecord {
        name: record.name.clone(),
        rtype: record.rtype.as_str().to_string(),
        ttl: record.ttl,
        r_data: rdata,
    }
}

/// Convert a wire record back into the canonical shape.
///
/// The type selects which rdata field becomes `content`; a payload that
/// carries none of the expected fields is serialized into `content` whole,
/// so nothing is lost even for shapes this code has never seen.
pub fn from_wire(wire: &WireRecord) -> DnsRecord {
    let rtype = RecordType::from(wire.rtype.clone());
    let rdata = &wire.r_data;

    let mut priority = None;
    let mut weight = None;
    let mut port = None;
    let mut flags = None;
    let mut tag = None;

    let content = match rtype {
        RecordType::A | RecordType::Aaaa => rdata.ip_address.clone(),
        RecordType::Cname => rdata.cname.clone(),
        RecordType::Aname => rdata.aname.clone(),
        RecordType::Txt => rdata.text.clone(),
        RecordType::Mx => {
            priority = rdata.preference;
            rdata.mail_exchange.clone()
        }
        RecordType::Ns => rdata.name_server.clone(),
        RecordType::Ptr => rdata.ptr_name.clone(),
        RecordType::Srv => {
            priority = rdata.priority;
            weight = rdata.weight;
            port = rdata.port;
            rdata.target.clone()
        }
        RecordType::Caa => {
            flags = rdata.flags;
            tag = rdata.tag.clone();
            rdata.value.clone()
        }
        RecordType::Other(_) => rdata.data.clone(),
    };

    let content = content.unwrap_or_else(|| raw_payload(rdata));

    DnsRecord {
        name: wire.name.clone(),
        rtype,
        content,
        ttl: wire.ttl,
        priority,
        weight,
        port,
        flags,
        tag,
        native_ref: None,
    }
}

/// Serialize an rdata payload we could not interpret into a compact string
fn raw_payload(rdata: &WireRecordData) -> String {
    serde_json::to_value(rdata)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSpec;

    fn round_trip(record: &DnsRecord) -> DnsRecord {
        from_wire(&to_wire(record))
    }

    fn base(name: &str, rtype: RecordType, content: &str) -> DnsRecord {
        DnsRecord::from_spec(&RecordSpec::new(name, rtype, content), 300)
    }

    #[test]
    fn a_record_round_trips() {
        let rec = base("app.example.com", RecordType::A, "192.0.2.10");
        let wire = to_wire(&rec);
        assert_eq!(wire.r_data.ip_address.as_deref(), Some("192.0.2.10"));
        assert_eq!(round_trip(&rec), rec);
    }

    #[test]
    fn aaaa_record_round_trips() {
        let rec = base("app.example.com", RecordType::Aaaa, "2001:db8::1");
        assert_eq!(round_trip(&rec), rec);
    }

    #[test]
    fn cname_and_aname_use_their_own_fields() {
        let cname = base("www.example.com", RecordType::Cname, "app.example.com");
        assert_eq!(to_wire(&cname).r_data.cname.as_deref(), Some("app.example.com"));
        assert_eq!(round_trip(&cname), cname);

        let aname = base("example.com", RecordType::Aname, "app.example.com");
        assert_eq!(to_wire(&aname).r_data.aname.as_deref(), Some("app.example.com"));
        assert_eq!(round_trip(&aname), aname);
    }

    #[test]
    fn mx_record_carries_preference() {
        let mut rec = base("example.com", RecordType::Mx, "mail.example.com");
        rec.priority = Some(10);
        let wire = to_wire(&rec);
        assert_eq!(wire.r_data.mail_exchange.as_deref(), Some("mail.example.com"));
        assert_eq!(wire.r_data.preference, Some(10));
        assert_eq!(round_trip(&rec), rec);
    }

    #[test]
    fn srv_record_carries_all_numeric_fields() {
        let mut rec = base("_sip._tcp.example.com", RecordType::Srv, "sip.example.com");
        rec.priority = Some(0);
        rec.weight = Some(5);
        rec.port = Some(5060);
        let wire = to_wire(&rec);
        assert_eq!(wire.r_data.target.as_deref(), Some("sip.example.com"));
        assert_eq!(wire.r_data.port, Some(5060));
        assert_eq!(round_trip(&rec), rec);
    }

    #[test]
    fn caa_record_carries_flags_and_tag() {
        let mut rec = base("example.com", RecordType::Caa, "letsencrypt.org");
        rec.flags = Some(0);
        rec.tag = Some("issue".to_string());
        let wire = to_wire(&rec);
        assert_eq!(wire.r_data.value.as_deref(), Some("letsencrypt.org"));
        assert_eq!(wire.r_data.tag.as_deref(), Some("issue"));
        assert_eq!(round_trip(&rec), rec);
    }

    #[test]
    fn extension_type_passes_content_through() {
        let rec = base("example.com", RecordType::Other("FWD".to_string()), "http://example.net/");
        let wire = to_wire(&rec);
        assert_eq!(wire.r_data.data.as_deref(), Some("http://example.net/"));
        assert_eq!(round_trip(&rec), rec);
    }

    #[test]
    fn unknown_payload_serializes_into_content() {
        let wire: WireRecord = serde_json::from_value(serde_json::json!({
            "name": "example.com",
            "type": "NAPTR",
            "ttl": 600,
            "rData": {"order": 10, "service": "E2U+sip"},
        }))
        .unwrap();
        let rec = from_wire(&wire);
        assert_eq!(rec.rtype, RecordType::Other("NAPTR".to_string()));
        assert!(rec.content.contains("E2U+sip"));
        assert_eq!(rec.ttl, 600);
    }

    #[test]
    fn wire_json_uses_backend_field_names() {
        let mut rec = base("example.com", RecordType::Mx, "mail.example.com");
        rec.priority = Some(10);
        let json = serde_json::to_value(to_wire(&rec)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "example.com",
                "type": "MX",
                "ttl": 300,
                "rData": {"mailExchange": "mail.example.com", "preference": 10},
            })
        );
    }
}
