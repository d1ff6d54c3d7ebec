// Copyright 2023 subregsim authors
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! In-memory DNS record storage for the simulated domains.
//!
//! All records of all domains live behind one lock. Mutations hold the write
//! half for the whole validate-and-apply step, reads and zone rendering hold
//! the read half.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::utils::serde_utils::{lenient, lenient_int, option_is_empty};
use crate::zone;

/// TTL given to records added without one.
pub const DEFAULT_TTL: i64 = 600;

/// Record types the registrar accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Spf,
    Srv,
    Ns,
    Tlsa,
    Caa,
    Sshfp,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Spf => "SPF",
            RecordType::Srv => "SRV",
            RecordType::Ns => "NS",
            RecordType::Tlsa => "TLSA",
            RecordType::Caa => "CAA",
            RecordType::Sshfp => "SSHFP",
        }
    }

    /// Validates an optional wire value. Absent counts as unknown.
    fn parse_required(value: Option<&str>) -> Result<Self, ApiError> {
        value.ok_or(ApiError::UnknownRecordType)?.parse()
    }
}

impl FromStr for RecordType {
    type Err = ApiError;

    /// Matching is case sensitive, "a" is not a record type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "MX" => RecordType::Mx,
            "TXT" => RecordType::Txt,
            "SPF" => RecordType::Spf,
            "SRV" => RecordType::Srv,
            "NS" => RecordType::Ns,
            "TLSA" => RecordType::Tlsa,
            "CAA" => RecordType::Caa,
            "SSHFP" => RecordType::Sshfp,
            _ => return Err(ApiError::UnknownRecordType),
        })
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored DNS record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[serde(default, skip_serializing_if = "option_is_empty")]
    pub content: Option<String>,
    pub prio: i64,
    pub ttl: i64,
}

/// Record fields of an Add_DNS_Record request.
///
/// Integers are signed on the wire. A field of the wrong JSON type reads as
/// absent and is then reported by the matching validation step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "option_is_empty")]
    pub name: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "option_is_empty"
    )]
    pub record_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "option_is_empty")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "option_is_empty")]
    pub prio: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "option_is_empty")]
    pub ttl: Option<i64>,
}

/// Record fields of a Modify_DNS_Record request.
///
/// Every field other than `id` is merged into the stored record when present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "option_is_empty")]
    pub id: Option<i64>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "option_is_empty"
    )]
    pub record_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "option_is_empty")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "option_is_empty")]
    pub prio: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "option_is_empty")]
    pub ttl: Option<i64>,
}

/// Record fields of a Delete_DNS_Record request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "option_is_empty")]
    pub id: Option<i64>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "option_is_empty"
    )]
    pub record_type: Option<String>,
}

/// Entry of the Domains_List response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    pub name: String,
    pub expire: NaiveDate,
    pub autorenew: u8,
}

/// Expiry date reported for every domain. Renewal is not simulated.
fn placeholder_expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 10, 20).unwrap_or_default()
}

struct StoreState {
    /// Records per domain, indexed like `RecordStore::domains`.
    zones: Vec<Vec<Record>>,
    next_id: u64,
    serial: u64,
}

/// Records of the fixed set of simulated domains.
pub struct RecordStore {
    domains: Vec<String>,
    state: RwLock<StoreState>,
}

impl RecordStore {
    /// Creates an empty store. Repeated domain names are kept once, in order
    /// of first appearance.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for domain in domains {
            let domain = domain.into();
            if !unique.contains(&domain) {
                unique.push(domain);
            }
        }

        let zones = vec![Vec::new(); unique.len()];
        Self {
            domains: unique,
            state: RwLock::new(StoreState {
                zones,
                next_id: 1,
                serial: 1,
            }),
        }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Current SOA serial.
    pub fn serial(&self) -> u64 {
        self.state.read().serial
    }

    fn domain_index(&self, domain: &str) -> Result<usize, ApiError> {
        self.domains
            .iter()
            .position(|d| d == domain)
            .ok_or(ApiError::InvalidDomain)
    }

    pub fn list_domains(&self) -> Vec<DomainInfo> {
        let expire = placeholder_expiry();
        self.domains
            .iter()
            .map(|name| DomainInfo {
                name: name.clone(),
                expire,
                autorenew: 0,
            })
            .collect()
    }

    /// Returns the records of `domain` in insertion order.
    pub fn get_zone(&self, domain: &str) -> Result<Vec<Record>, ApiError> {
        let index = self.domain_index(domain)?;
        Ok(self.state.read().zones[index].clone())
    }

    /// Appends a record and returns the id assigned to it.
    pub fn add_record(&self, domain: &str, record: NewRecord) -> Result<u64, ApiError> {
        let index = self.domain_index(domain)?;
        let record_type = RecordType::parse_required(record.record_type.as_deref())?;
        let name = record.name.ok_or(ApiError::InvalidRecordName)?;

        let mut state = self.state.write();

        if record_type == RecordType::Cname
            && state.zones[index].iter().any(|found| {
                found.record_type == record_type
                    && found.name == name
                    && found.content == record.content
            })
        {
            return Err(ApiError::DuplicateCname);
        }

        let id = state.next_id;
        state.next_id += 1;
        state.zones[index].push(Record {
            id,
            name,
            record_type,
            content: record.content,
            prio: record.prio.unwrap_or(0),
            ttl: record.ttl.unwrap_or(DEFAULT_TTL),
        });
        state.serial += 1;

        debug!(domain, id, serial = state.serial, "record added");
        Ok(id)
    }

    /// Merges the present fields of `patch` into the record it names.
    pub fn modify_record(&self, domain: &str, patch: RecordPatch) -> Result<(), ApiError> {
        let index = self.domain_index(domain)?;
        let id = patch.id.ok_or(ApiError::MissingRecordId)?;
        let record_type = patch
            .record_type
            .as_deref()
            .map(RecordType::from_str)
            .transpose()?;

        let mut state = self.state.write();

        let position = find_record(&state.zones[index], id).ok_or(ApiError::RecordNotFound)?;
        let found = &mut state.zones[index][position];

        if let Some(record_type) = record_type {
            found.record_type = record_type;
        }
        if let Some(content) = patch.content {
            found.content = Some(content);
        }
        if let Some(prio) = patch.prio {
            found.prio = prio;
        }
        if let Some(ttl) = patch.ttl {
            found.ttl = ttl;
        }
        state.serial += 1;

        debug!(domain, id, serial = state.serial, "record modified");
        Ok(())
    }

    pub fn delete_record(&self, domain: &str, reference: RecordRef) -> Result<(), ApiError> {
        let index = self.domain_index(domain)?;
        let id = reference.id.ok_or(ApiError::MissingRecordId)?;
        if let Some(record_type) = reference.record_type.as_deref() {
            record_type.parse::<RecordType>()?;
        }

        let mut state = self.state.write();

        let position = find_record(&state.zones[index], id).ok_or(ApiError::RecordNotFound)?;
        state.zones[index].remove(position);
        state.serial += 1;

        debug!(domain, id, serial = state.serial, "record deleted");
        Ok(())
    }

    /// Renders all domains as one zone file.
    pub fn zone(&self) -> String {
        let state = self.state.read();
        zone::render(
            state.serial,
            self.domains
                .iter()
                .zip(state.zones.iter())
                .map(|(domain, records)| (domain.as_str(), records.as_slice())),
        )
    }
}

/// Position of the record with wire id `id`. Negative ids never match.
fn find_record(records: &[Record], id: i64) -> Option<usize> {
    let id = u64::try_from(id).ok()?;
    records.iter().position(|r| r.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RecordStore {
        RecordStore::new(["example.com", "example.org"])
    }

    fn record(name: &str, record_type: &str, content: &str) -> NewRecord {
        NewRecord {
            name: Some(name.into()),
            record_type: Some(record_type.into()),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    #[test]
    fn add_assigns_ids_and_defaults() {
        let store = store();
        assert_eq!(store.add_record("example.com", record("www", "A", "1.2.3.4")), Ok(1));
        assert_eq!(store.add_record("example.org", record("www", "A", "1.2.3.5")), Ok(2));
        assert_eq!(store.add_record("example.com", record("@", "MX", "mx")), Ok(3));

        let records = store.get_zone("example.com").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            Record {
                id: 1,
                name: "www".into(),
                record_type: RecordType::A,
                content: Some("1.2.3.4".into()),
                prio: 0,
                ttl: 600,
            }
        );
        assert_eq!(records[1].id, 3);
        assert_eq!(store.serial(), 4);
    }

    #[test]
    fn add_validation_order() {
        let store = store();
        let mut bad = record("www", "PTR", "x");
        bad.name = None;

        assert_eq!(store.add_record("example.net", bad.clone()), Err(ApiError::InvalidDomain));
        assert_eq!(store.add_record("example.com", bad.clone()), Err(ApiError::UnknownRecordType));

        bad.record_type = None;
        assert_eq!(store.add_record("example.com", bad.clone()), Err(ApiError::UnknownRecordType));

        bad.record_type = Some("TXT".into());
        assert_eq!(store.add_record("example.com", bad), Err(ApiError::InvalidRecordName));
        assert_eq!(store.serial(), 1);
    }

    #[test]
    fn record_type_is_case_sensitive() {
        let store = store();
        assert_eq!(
            store.add_record("example.com", record("www", "a", "1.2.3.4")),
            Err(ApiError::UnknownRecordType)
        );
    }

    #[test]
    fn duplicate_cname_is_rejected() {
        let store = store();
        store.add_record("example.com", record("www", "CNAME", "host")).unwrap();
        assert_eq!(
            store.add_record("example.com", record("www", "CNAME", "host")),
            Err(ApiError::DuplicateCname)
        );
        store.add_record("example.com", record("www", "CNAME", "other")).unwrap();
        store.add_record("example.org", record("www", "CNAME", "host")).unwrap();
        store.add_record("example.com", record("www", "TXT", "host")).unwrap();
        store.add_record("example.com", record("www", "TXT", "host")).unwrap();
        assert_eq!(store.get_zone("example.com").unwrap().len(), 4);
    }

    #[test]
    fn modify_merges_only_present_fields() {
        let store = store();
        store.add_record("example.com", record("mail", "MX", "mx1")).unwrap();

        let patch = RecordPatch {
            id: Some(1),
            prio: Some(10),
            ..Default::default()
        };
        store.modify_record("example.com", patch).unwrap();

        let patch = RecordPatch {
            id: Some(1),
            record_type: Some("TXT".into()),
            ttl: Some(1800),
            ..Default::default()
        };
        store.modify_record("example.com", patch).unwrap();

        let records = store.get_zone("example.com").unwrap();
        assert_eq!(
            records[0],
            Record {
                id: 1,
                name: "mail".into(),
                record_type: RecordType::Txt,
                content: Some("mx1".into()),
                prio: 10,
                ttl: 1800,
            }
        );
        assert_eq!(store.serial(), 4);
    }

    #[test]
    fn modify_errors() {
        let store = store();
        store.add_record("example.com", record("www", "A", "1.2.3.4")).unwrap();

        assert_eq!(
            store.modify_record("example.com", RecordPatch::default()),
            Err(ApiError::MissingRecordId)
        );
        let patch = RecordPatch {
            id: Some(1),
            record_type: Some("PTR".into()),
            ..Default::default()
        };
        assert_eq!(store.modify_record("example.com", patch), Err(ApiError::UnknownRecordType));

        let patch = RecordPatch {
            id: Some(1),
            ..Default::default()
        };
        // ids are looked up within the given domain only
        assert_eq!(store.modify_record("example.org", patch), Err(ApiError::RecordNotFound));
        assert_eq!(store.serial(), 2);
    }

    #[test]
    fn delete_twice() {
        let store = store();
        store.add_record("example.com", record("a", "A", "1.1.1.1")).unwrap();
        store.add_record("example.com", record("b", "A", "2.2.2.2")).unwrap();

        let reference = RecordRef {
            id: Some(1),
            record_type: None,
        };
        assert_eq!(store.delete_record("example.com", reference.clone()), Ok(()));
        assert_eq!(
            store.delete_record("example.com", reference),
            Err(ApiError::RecordNotFound)
        );

        let records = store.get_zone("example.com").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "b");
        assert_eq!(store.serial(), 4);

        // freed ids are not handed out again
        assert_eq!(store.add_record("example.com", record("c", "A", "3.3.3.3")), Ok(3));
    }

    #[test]
    fn delete_validation() {
        let store = store();
        assert_eq!(
            store.delete_record("example.com", RecordRef::default()),
            Err(ApiError::MissingRecordId)
        );
        let reference = RecordRef {
            id: Some(1),
            record_type: Some("BOGUS".into()),
        };
        assert_eq!(store.delete_record("example.com", reference), Err(ApiError::UnknownRecordType));
        let reference = RecordRef {
            id: Some(1),
            record_type: None,
        };
        assert_eq!(store.delete_record("nope.com", reference), Err(ApiError::InvalidDomain));
    }

    #[test]
    fn negative_ids_are_not_found() {
        let store = store();
        store.add_record("example.com", record("www", "A", "1.2.3.4")).unwrap();

        let patch = RecordPatch {
            id: Some(-1),
            ttl: Some(60),
            ..Default::default()
        };
        assert_eq!(store.modify_record("example.com", patch), Err(ApiError::RecordNotFound));
        let reference = RecordRef {
            id: Some(-1),
            record_type: None,
        };
        assert_eq!(store.delete_record("example.com", reference), Err(ApiError::RecordNotFound));
        assert_eq!(store.serial(), 2);
    }

    #[test]
    fn signed_prio_and_ttl_are_stored_as_sent() {
        let store = store();
        let mut mx = record("@", "MX", "mx");
        mx.prio = Some(-5);
        mx.ttl = Some(-1);
        store.add_record("example.com", mx).unwrap();

        let stored = &store.get_zone("example.com").unwrap()[0];
        assert_eq!((stored.prio, stored.ttl), (-5, -1));
        assert!(store.zone().contains("\n@ -1 IN MX -5 mx"));
    }

    #[test]
    fn wire_record_fields_tolerate_wrong_types() {
        let patch: RecordPatch = serde_json::from_str(r#"{"id": "3", "type": 1, "ttl": "x", "prio": -4}"#).unwrap();
        assert_eq!(patch.id, Some(3));
        assert_eq!(patch.record_type, None);
        assert_eq!(patch.ttl, None);
        assert_eq!(patch.prio, Some(-4));

        let added: NewRecord = serde_json::from_str(r#"{"name": ["www"], "type": "A", "ttl": -5}"#).unwrap();
        assert_eq!(added.name, None);
        assert_eq!(added.ttl, Some(-5));
        assert_eq!(
            store().add_record("example.com", added),
            Err(ApiError::InvalidRecordName)
        );
    }

    #[test]
    fn domains_are_listed_in_configuration_order() {
        let store = RecordStore::new(["b.com", "a.com", "b.com"]);
        let listed: Vec<_> = store.list_domains().into_iter().map(|d| d.name).collect();
        assert_eq!(listed, ["b.com", "a.com"]);
        assert_eq!(store.list_domains()[0].autorenew, 0);
        assert_eq!(store.list_domains()[0].expire.to_string(), "2023-10-20");
    }

    #[test]
    fn concurrent_adds_get_unique_ids() {
        let store = store();
        std::thread::scope(|s| {
            for t in 0..8 {
                let store = &store;
                s.spawn(move || {
                    for i in 0..50 {
                        let name = format!("host{t}-{i}");
                        store.add_record("example.com", record(&name, "A", "10.0.0.1")).unwrap();
                    }
                });
            }
        });

        let mut ids: Vec<u64> = store.get_zone("example.com").unwrap().iter().map(|r| r.id).collect();
        // insertion order follows id order
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        ids.dedup();
        assert_eq!(ids.len(), 400);
        assert_eq!(*ids.last().unwrap(), 400);
        assert_eq!(store.serial(), 401);
    }
}
