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

//! Routing of queries to zones and forwarders.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Transport;
use crate::forward::ForwarderChain;
use crate::name::Name;
use crate::zone::Zone;

/// What to do with a query that reaches a route.
#[derive(Clone)]
pub enum Handler {
    /// Answer from the zone's records.
    Answer(Arc<Zone>),

    /// Serve a zone transfer of the zone.
    Transfer(Arc<Zone>),

    /// Pass the query to upstream servers.
    Forward(Arc<ForwarderChain>),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Answer(zone) => write!(f, "Answer({})", zone.origin()),
            Self::Transfer(zone) => write!(f, "Transfer({})", zone.origin()),
            Self::Forward(chain) => write!(f, "Forward({} upstreams)", chain.resolvers().len()),
        }
    }
}

/// A table of [`Handler`]s keyed by zone origin, with an optional
/// wildcard used when no origin encloses the query name.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: HashMap<Name, Handler>,
    wildcard: Option<Handler>,
}

impl RouteTable {
    /// Adds a route, returning the handler it replaces, if any.
    pub fn insert(&mut self, origin: Name, handler: Handler) -> Option<Handler> {
        self.routes.insert(origin, handler)
    }

    pub fn set_wildcard(&mut self, handler: Handler) {
        self.wildcard = Some(handler);
    }

    /// Finds the handler for `qname`: the one registered under the
    /// closest enclosing origin, or else the wildcard.
    pub fn route(&self, qname: &Name) -> Option<&Handler> {
        (0..qname.len())
            .filter_map(|skip| qname.superdomain(skip))
            .find_map(|origin| self.routes.get(&origin))
            .or(self.wildcard.as_ref())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.wildcard.is_none()
    }
}

/// Separate [`RouteTable`]s for queries received over UDP and TCP.
#[derive(Clone, Debug, Default)]
pub struct Router {
    pub udp: RouteTable,
    pub tcp: RouteTable,
}

impl Router {
    pub fn table(&self, transport: Transport) -> &RouteTable {
        match transport {
            Transport::Udp => &self.udp,
            Transport::Tcp => &self.tcp,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
