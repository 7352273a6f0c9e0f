//! The ACL model consumed by the TSIG & ACL gate and by the
//! transfer/NOTIFY layer.
//!
//! Grounded on `cascade`'s historical `zone_loader` unit, whose
//! `ZoneConfig` carried `provide_xfr_to` / `send_notify_to` /
//! `allow_notify_from` / `request_xfr_from` lists, each entry an address
//! (optionally masked) paired with an optional TSIG key name.

use std::net::IpAddr;

use crate::error::{Error, ErrorKind, Result};

/// One entry in an ACL: a source, optionally restricted to addresses
/// matching `prefix_len` bits of `network`, and an optional TSIG key that
/// must have signed the request for this entry to match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AclEntry {
    pub network: IpAddr,
    pub prefix_len: u8,
    pub key_name: Option<String>,
}

impl AclEntry {
    /// An entry matching any address, requiring no TSIG key.
    pub fn any() -> Self {
        Self {
            network: IpAddr::from([0, 0, 0, 0]),
            prefix_len: 0,
            key_name: None,
        }
    }

    fn matches_addr(&self, addr: IpAddr) -> bool {
        if self.prefix_len == 0 && self.network.is_unspecified() {
            return true;
        }
        match (self.network, addr) {
            (IpAddr::V4(net), IpAddr::V4(a)) => {
                let mask = u32::MAX.checked_shl(32 - self.prefix_len as u32).unwrap_or(0);
                u32::from(net) & mask == u32::from(a) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(a)) => {
                let mask = u128::MAX
                    .checked_shl(128 - self.prefix_len as u32)
                    .unwrap_or(0);
                u128::from(net) & mask == u128::from(a) & mask
            }
            _ => false,
        }
    }
}

/// A named list of [`AclEntry`] values, checked as "does any entry match
/// this source address and key name".
#[derive(Clone, Debug, Default)]
pub struct Acl {
    entries: Vec<AclEntry>,
}

impl Acl {
    pub fn new(entries: Vec<AclEntry>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Find the first entry whose address range covers `addr`, regardless
    /// of what key (if any) it requires.
    ///
    /// This is the address-only match the gate runs first: whether a key
    /// is required, and whether the presented one satisfies it, is a
    /// separate question answered by [`Acl::required_key`] and the
    /// caller in [`crate::tsig_gate::admit`].
    fn matching_entry(&self, addr: IpAddr) -> Option<&AclEntry> {
        self.entries.iter().find(|entry| entry.matches_addr(addr))
    }

    /// Check `addr` against every entry's address range, returning
    /// `Ok(())` if any entry matches, or [`ErrorKind::Eacces`] otherwise.
    ///
    /// This is address-only: it says nothing about whether the matched
    /// entry also requires a TSIG key. Callers that care which key (if
    /// any) the matched entry requires should use [`Acl::required_key`]
    /// instead, which performs the same address match and also reports
    /// that entry's `key_name`.
    pub fn check(&self, addr: IpAddr) -> Result<()> {
        if self.matching_entry(addr).is_some() {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::Eacces,
                format!("no ACL entry matches {addr}"),
            ))
        }
    }

    /// Find the address-matching entry and report the TSIG key name it
    /// requires, if any (`Ok(None)` means the matched entry requires no
    /// key at all). [`ErrorKind::Eacces`] if no entry's address range
    /// covers `addr`.
    pub fn required_key(&self, addr: IpAddr) -> Result<Option<&str>> {
        self.matching_entry(addr)
            .map(|entry| entry.key_name.as_deref())
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::Eacces,
                    format!("no ACL entry matches {addr}"),
                )
            })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_matches_exact_address_with_no_key_requirement() {
        let acl = Acl::new(vec![AclEntry {
            network: "192.0.2.1".parse().unwrap(),
            prefix_len: 32,
            key_name: None,
        }]);
        assert!(acl.check("192.0.2.1".parse().unwrap()).is_ok());
        assert_eq!(
            acl.required_key("192.0.2.1".parse().unwrap()).unwrap(),
            None
        );
    }

    #[test]
    fn acl_rejects_address_outside_subnet() {
        let acl = Acl::new(vec![AclEntry {
            network: "192.0.2.0".parse().unwrap(),
            prefix_len: 24,
            key_name: None,
        }]);
        assert!(acl.check("192.0.3.1".parse().unwrap()).is_err());
    }

    #[test]
    fn required_key_reports_the_matched_entrys_key() {
        let acl = Acl::new(vec![AclEntry {
            network: "192.0.2.1".parse().unwrap(),
            prefix_len: 32,
            key_name: Some("primary-key".to_owned()),
        }]);
        assert_eq!(
            acl.required_key("192.0.2.1".parse().unwrap()).unwrap(),
            Some("primary-key")
        );
    }

    #[test]
    fn required_key_reports_no_entry_as_eacces() {
        let acl = Acl::new(vec![AclEntry {
            network: "192.0.2.1".parse().unwrap(),
            prefix_len: 32,
            key_name: Some("primary-key".to_owned()),
        }]);
        let err = acl.required_key("203.0.113.1".parse().unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Eacces);
    }

    #[test]
    fn any_entry_matches_everything() {
        let acl = Acl::new(vec![AclEntry::any()]);
        assert!(acl.check("203.0.113.7".parse().unwrap()).is_ok());
    }
}
