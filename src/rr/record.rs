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

//! Implementation of the [`Record`] type.

use std::fmt;

use super::{Rdata, Ttl, Type};
use crate::class::Class;
use crate::name::Name;

/// A single resource record.
///
/// Records are immutable once parsed. A zone reload replaces its
/// records wholesale rather than changing them in place.
///
/// The [`Display`](fmt::Display) implementation produces the canonical
/// presentation form with tab-separated fields:
///
/// ```text
/// owner   ttl   class   type   rdata
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    pub owner: Name,
    pub rr_type: Type,
    pub class: Class,
    pub ttl: Ttl,
    pub rdata: Rdata,
}

impl Record {
    /// Returns the serial number if this is an SOA record.
    pub fn soa_serial(&self) -> Option<u32> {
        if self.rr_type == Type::SOA {
            self.rdata.as_soa().map(|soa| soa.serial)
        } else {
            None
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.owner, self.ttl, self.class, self.rr_type, self.rdata
        )
    }
}
