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

//! DNS view of the simulated zones.
//!
//! Every query re-reads [`Api::zone`], so a record is resolvable as soon as
//! the API has stored it. The zone text is matched literally: a record
//! answers when its owner equals the query name and its type is the query
//! type, the query asks for `ANY`, or the record is a CNAME. A name with no
//! matching record gets NXDOMAIN.

use std::io;
use std::sync::Arc;

use domain::base::iana::Rcode;
use domain::base::message_builder::PushError;
use domain::base::{Message, MessageBuilder, Rtype, ToName};
use domain::zonefile::inplace::{self, Entry, ScannedRecord, Zonefile};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::api::Api;

/// Largest reply sent without EDNS; longer ones go out truncated.
const MAX_UDP_PAYLOAD: usize = 512;

/// Answers one wire-format query from zone file text.
///
/// Returns `None` when `query` is not a DNS query at all.
pub fn answer(zone: &str, query: &[u8]) -> Option<Vec<u8>> {
    let request = Message::from_octets(query).ok()?;
    if request.header().qr() {
        return None;
    }

    let question = match request.sole_question() {
        Ok(question) => question,
        Err(_) => return reply(&request, Rcode::FORMERR, &[]),
    };

    let records = match parse_zone(zone) {
        Ok(records) => records,
        Err(err) => {
            warn!("cannot parse simulated zone: {}", err);
            return reply(&request, Rcode::SERVFAIL, &[]);
        }
    };

    let qtype = question.qtype();
    let matching: Vec<ScannedRecord> = records
        .into_iter()
        .filter(|record| {
            record.owner().name_eq(question.qname())
                && (qtype == Rtype::ANY || record.rtype() == qtype || record.rtype() == Rtype::CNAME)
        })
        .collect();

    let rcode = if matching.is_empty() {
        Rcode::NXDOMAIN
    } else {
        Rcode::NOERROR
    };
    debug!(qname = %question.qname(), %qtype, %rcode, answers = matching.len(), "DNS query");
    reply(&request, rcode, &matching)
}

fn parse_zone(zone: &str) -> Result<Vec<ScannedRecord>, inplace::Error> {
    let mut reader = Zonefile::from(zone);
    reader.extend_from_slice(b"\n");

    let mut records = Vec::new();
    while let Some(entry) = reader.next_entry()? {
        if let Entry::Record(record) = entry {
            records.push(record);
        }
    }
    Ok(records)
}

fn reply(request: &Message<&[u8]>, rcode: Rcode, records: &[ScannedRecord]) -> Option<Vec<u8>> {
    match compose(request, rcode, records) {
        Ok(message) => Some(message),
        Err(err) => {
            warn!("cannot compose DNS reply: {}", err);
            None
        }
    }
}

fn compose(request: &Message<&[u8]>, rcode: Rcode, records: &[ScannedRecord]) -> Result<Vec<u8>, PushError> {
    let mut answer = MessageBuilder::new_vec().start_answer(request, rcode)?;
    answer.header_mut().set_aa(true);
    for record in records {
        answer.push(record.clone())?;
    }
    let message = answer.finish();
    if message.len() <= MAX_UDP_PAYLOAD {
        return Ok(message);
    }

    let mut answer = MessageBuilder::new_vec().start_answer(request, rcode)?;
    answer.header_mut().set_aa(true);
    answer.header_mut().set_tc(true);
    Ok(answer.finish())
}

/// Answers queries arriving on `socket` until `shutdown` resolves.
pub async fn serve<F>(socket: UdpSocket, api: Arc<Api>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let mut buf = vec![0u8; u16::MAX as usize];
    tokio::pin!(shutdown);

    loop {
        let (len, peer) = tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(err) => {
                    warn!("failed to receive DNS query: {}", err);
                    continue;
                }
            },
            () = &mut shutdown => return Ok(()),
        };

        let Some(message) = answer(&api.zone(), &buf[..len]) else {
            debug!(%peer, "ignoring datagram that is not a DNS query");
            continue;
        };
        if let Err(err) = socket.send_to(&message, peer).await {
            warn!(%peer, "failed to send DNS reply: {}", err);
        }
    }
}
