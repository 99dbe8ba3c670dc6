//! Record validation
//!
//! Stateless checks run before any mutation reaches a provider. Adapters may
//! add provider-specific rules on top (for example a TTL floor), but the
//! rules here hold for every backend.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};
use crate::record::{normalize_name, RecordSpec, RecordType};

/// Maximum length of a full hostname
const MAX_NAME_LEN: usize = 253;

/// Maximum length of a single label
const MAX_LABEL_LEN: usize = 63;

/// Validate hostname syntax.
///
/// Labels are ASCII letters, digits and hyphens, with a leading underscore
/// allowed for service labels (`_sip._tcp`, `_dmarc`). A single trailing dot
/// is tolerated.
pub fn validate_hostname(name: &str) -> Result<()> {
    let trimmed = name.trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(Error::validation("hostname is empty"));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "hostname '{}' exceeds {} characters",
            name, MAX_NAME_LEN
        )));
    }
    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(Error::validation(format!(
                "hostname '{}' contains an empty label",
                name
            )));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(Error::validation(format!(
                "label '{}' exceeds {} characters",
                label, MAX_LABEL_LEN
            )));
        }
        let body = label.strip_prefix('_').unwrap_or(label);
        if body.starts_with('-') || body.ends_with('-') {
            return Err(Error::validation(format!(
                "label '{}' starts or ends with a hyphen",
                label
            )));
        }
        if !body.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::validation(format!(
                "label '{}' contains invalid characters",
                label
            )));
        }
    }
    Ok(())
}

/// Validate a desired record against the general rules.
///
/// `zone` is the apex name of the zone the record belongs to; it drives the
/// apex-CNAME rejection (an ANAME at the apex is the supported alternative).
pub fn validate_spec(spec: &RecordSpec, zone: &str) -> Result<()> {
    validate_hostname(&spec.name)?;

    if let Some(ttl) = spec.ttl
        && ttl == 0
    {
        return Err(Error::validation(format!(
            "record '{}' has a zero TTL",
            spec.name
        )));
    }

    if spec.content.is_empty() {
        return Err(Error::validation(format!(
            "record '{}' ({}) has empty content",
            spec.name, spec.rtype
        )));
    }

    match spec.rtype {
        RecordType::A => {
            spec.content.parse::<Ipv4Addr>().map_err(|_| {
                Error::validation(format!(
                    "record '{}': '{}' is not a valid IPv4 address",
                    spec.name, spec.content
                ))
            })?;
        }
        RecordType::Aaaa => {
            spec.content.parse::<Ipv6Addr>().map_err(|_| {
                Error::validation(format!(
                    "record '{}': '{}' is not a valid IPv6 address",
                    spec.name, spec.content
                ))
            })?;
        }
        RecordType::Cname => {
            validate_hostname(&spec.content)?;
            if normalize_name(&spec.name) == normalize_name(zone) {
                return Err(Error::validation(format!(
                    "CNAME at zone apex '{}' is not allowed (use ANAME)",
                    zone
                )));
            }
        }
        RecordType::Aname | RecordType::Ns | RecordType::Ptr | RecordType::Mx => {
            validate_hostname(&spec.content)?;
        }
        RecordType::Srv => {
            validate_hostname(&spec.content)?;
            if spec.port.is_none() {
                return Err(Error::validation(format!(
                    "SRV record '{}' is missing a port",
                    spec.name
                )));
            }
        }
        RecordType::Caa => {
            if spec.tag.is_none() {
                return Err(Error::validation(format!(
                    "CAA record '{}' is missing a tag",
                    spec.name
                )));
            }
        }
        RecordType::Txt | RecordType::Other(_) => {}
    }

    Ok(())
}

/// Fill in the server-side defaults for fields the caller left unset:
/// MX preference 10, SRV priority and weight 0, CAA flags 0.
pub fn apply_server_defaults(spec: &mut RecordSpec) {
    match spec.rtype {
        RecordType::Mx => {
            spec.priority.get_or_insert(10);
        }
        RecordType::Srv => {
            spec.priority.get_or_insert(0);
            spec.weight.get_or_insert(0);
        }
        RecordType::Caa => {
            spec.flags.get_or_insert(0);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZONE: &str = "example.com";

    #[test]
    fn accepts_ordinary_hostnames() {
        for name in [
            "example.com",
            "app.example.com",
            "app.example.com.",
            "a-b.example.com",
            "_dmarc.example.com",
            "_sip._tcp.example.com",
        ] {
            assert!(validate_hostname(name).is_ok(), "rejected {}", name);
        }
    }

    #[test]
    fn rejects_malformed_hostnames() {
        let long_label = format!("{}.example.com", "x".repeat(64));
        let long_name = format!("{}.example.com", "x.".repeat(130));
        for name in [
            "",
            "app..example.com",
            "-app.example.com",
            "app-.example.com",
            "app!.example.com",
            long_label.as_str(),
            long_name.as_str(),
        ] {
            assert!(validate_hostname(name).is_err(), "accepted {:?}", name);
        }
    }

    #[test]
    fn rejects_invalid_ipv4_content() {
        let spec = RecordSpec::new("app.example.com", RecordType::A, "999.1.1.1");
        let err = validate_spec(&spec, ZONE).unwrap_err();
        assert!(err.to_string().contains("not a valid IPv4 address"));
    }

    #[test]
    fn accepts_valid_address_records() {
        let a = RecordSpec::new("app.example.com", RecordType::A, "192.0.2.10");
        assert!(validate_spec(&a, ZONE).is_ok());

        let aaaa = RecordSpec::new("app.example.com", RecordType::Aaaa, "2001:db8::1");
        assert!(validate_spec(&aaaa, ZONE).is_ok());
    }

    #[test]
    fn rejects_zero_ttl() {
        let spec = RecordSpec::new("app.example.com", RecordType::A, "192.0.2.10").with_ttl(0);
        assert!(validate_spec(&spec, ZONE).is_err());
    }

    #[test]
    fn rejects_cname_at_apex() {
        let spec = RecordSpec::new("example.com", RecordType::Cname, "target.example.net");
        let err = validate_spec(&spec, ZONE).unwrap_err();
        assert!(err.to_string().contains("apex"));

        // trailing dot and case do not dodge the check
        let spec = RecordSpec::new("Example.COM.", RecordType::Cname, "target.example.net");
        assert!(validate_spec(&spec, ZONE).is_err());
    }

    #[test]
    fn allows_aname_at_apex() {
        let spec = RecordSpec::new("example.com", RecordType::Aname, "target.example.net");
        assert!(validate_spec(&spec, ZONE).is_ok());
    }

    #[test]
    fn allows_cname_below_apex() {
        let spec = RecordSpec::new("www.example.com", RecordType::Cname, "app.example.com");
        assert!(validate_spec(&spec, ZONE).is_ok());
    }

    #[test]
    fn srv_requires_port() {
        let mut spec = RecordSpec::new("_sip._tcp.example.com", RecordType::Srv, "sip.example.com");
        assert!(validate_spec(&spec, ZONE).is_err());

        spec.port = Some(5060);
        assert!(validate_spec(&spec, ZONE).is_ok());
    }

    #[test]
    fn caa_requires_tag() {
        let mut spec = RecordSpec::new("example.com", RecordType::Caa, "letsencrypt.org");
        assert!(validate_spec(&spec, ZONE).is_err());

        spec.tag = Some("issue".to_string());
        assert!(validate_spec(&spec, ZONE).is_ok());
    }

    #[test]
    fn server_defaults_fill_unset_fields_only() {
        let mut mx = RecordSpec::new("example.com", RecordType::Mx, "mail.example.com");
        apply_server_defaults(&mut mx);
        assert_eq!(mx.priority, Some(10));

        let mut mx_set = RecordSpec::new("example.com", RecordType::Mx, "mail.example.com")
            .with_priority(5);
        apply_server_defaults(&mut mx_set);
        assert_eq!(mx_set.priority, Some(5));

        let mut srv = RecordSpec::new("_sip._tcp.example.com", RecordType::Srv, "sip.example.com");
        srv.port = Some(5060);
        apply_server_defaults(&mut srv);
        assert_eq!(srv.priority, Some(0));
        assert_eq!(srv.weight, Some(0));

        let mut caa = RecordSpec::new("example.com", RecordType::Caa, "letsencrypt.org");
        caa.tag = Some("issue".to_string());
        apply_server_defaults(&mut caa);
        assert_eq!(caa.flags, Some(0));
    }
}
