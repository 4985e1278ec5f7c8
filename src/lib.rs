// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! `udns` is a small authoritative and forwarding DNS server library.
//!
//! Zones are loaded from RFC 1035 master files ([`zone_file`]) into
//! in-memory [`zone::Zone`]s, which answer queries, serve AXFR/IXFR,
//! and reload themselves when their backing files change
//! ([`watcher`]). Queries that fall outside every served zone can be
//! passed to a chain of upstream resolvers ([`forward`]). The
//! [`server`] module ties these together and serves them over UDP and
//! TCP through the [`io`] module.

pub mod class;
pub mod forward;
pub mod io;
pub mod message;
pub mod name;
pub mod rr;
pub mod server;
mod util;
pub mod watcher;
pub mod zone;
pub mod zone_file;
