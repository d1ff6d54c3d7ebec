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

//! Zone file rendering.
//!
//! The output is meant for a zone file resolver and uses `$ORIGIN .`, so
//! record names are taken as they were stored.

use crate::store::{Record, RecordType};

/// Default TTL declared by the `$TTL` header.
pub const ZONE_TTL: i64 = 1800;

/// Renders the given domains and their records as zone file text.
///
/// Domains are emitted in iteration order, each starting with its SOA line.
pub fn render<'a, I>(serial: u64, domains: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a [Record])>,
{
    let mut lines = vec!["$ORIGIN .".to_string(), format!("$TTL {ZONE_TTL}")];

    for (domain, records) in domains {
        lines.push(format!(
            "{domain} IN SOA ns.example.com admin.example.com ( {serial} 86400 900 1209600 {ZONE_TTL} )"
        ));
        lines.extend(records.iter().map(render_record));
    }

    lines.join("\n")
}

fn render_record(record: &Record) -> String {
    let ttl = if record.ttl == ZONE_TTL {
        String::new()
    } else {
        record.ttl.to_string()
    };

    let prio = match record.record_type {
        RecordType::Mx => record.prio.to_string(),
        _ => String::new(),
    };

    let content = record.content.as_deref().unwrap_or_default();
    let content = match record.record_type {
        RecordType::Txt => format!("\"{}\"", content.replace('"', "\\\"")),
        _ => content.to_string(),
    };

    format!(
        "{} {} IN {} {} {}",
        record.name, ttl, record.record_type, prio, content
    )
}
