//! Subreg.cz DNS API simulator
//!
//! A test double for clients of the Subreg.cz registrar API:
//! - Single account, single session login
//! - DNS record CRUD over a fixed set of domains
//! - Zone file export of everything stored
//! - HTTP JSON binding (optionally over TLS) and a typed client for it
//! - DNS (UDP) view of the simulated zones
//!
//! # Example
//! ```
//! use subregsim::api::Api;
//! use subregsim::session::Credentials;
//! use subregsim::store::NewRecord;
//!
//! let api = Api::new(Credentials::new("user", "pass"), ["example.com"]);
//! let ssid = api.login("user", "pass").into_result().unwrap().unwrap().ssid;
//!
//! let record = NewRecord {
//!     name: Some("www".into()),
//!     record_type: Some("A".into()),
//!     content: Some("1.2.3.4".into()),
//!     ..Default::default()
//! };
//! assert!(api.add_dns_record(Some(&ssid), "example.com", record).is_ok());
//! assert!(api.zone().contains("www 600 IN A  1.2.3.4"));
//! ```

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

pub mod api;
pub mod client;
pub mod config;
pub mod dns;
pub mod error;
pub mod server;
pub mod session;
pub mod store;
pub mod tls;
pub mod utils;
pub mod zone;
