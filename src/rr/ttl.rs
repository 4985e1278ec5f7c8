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

//! Provides the [`Ttl`] structure for DNS RR TTLs.

use std::fmt;
use std::str::FromStr;

/// The time to live (TTL) of a DNS record, in seconds.
///
/// [RFC 2181 § 8] settles the contradictory definitions in RFC 1035:
/// a TTL is an unsigned value between 0 and 2³¹ - 1. A 32-bit value
/// with the most significant bit set, whether read from the wire or
/// from a zone file, is treated as zero.
///
/// [RFC 2181 § 8]: https://datatracker.ietf.org/doc/html/rfc2181#section-8
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Ttl(u32);

impl From<u32> for Ttl {
    fn from(raw: u32) -> Self {
        if raw > i32::MAX as u32 {
            Self(0)
        } else {
            Self(raw)
        }
    }
}

impl From<Ttl> for u32 {
    fn from(ttl: Ttl) -> Self {
        ttl.0
    }
}

impl FromStr for Ttl {
    type Err = std::num::ParseIntError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        text.parse::<u32>().map(Self::from)
    }
}

impl fmt::Debug for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_above_i32_max_become_zero() {
        assert_eq!(u32::from(Ttl::from(3600)), 3600);
        assert_eq!(u32::from(Ttl::from(i32::MAX as u32)), i32::MAX as u32);
        assert_eq!(u32::from(Ttl::from(i32::MAX as u32 + 1)), 0);
        assert_eq!("4294967295".parse::<Ttl>(), Ok(Ttl::from(0)));
    }

    #[test]
    fn rejects_non_numeric_text() {
        assert!("1h".parse::<Ttl>().is_err());
        assert!("-1".parse::<Ttl>().is_err());
    }
}
