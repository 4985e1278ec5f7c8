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

//! Implementation of types relating to DNS questions.

use std::fmt;
use std::str::FromStr;

use crate::class::Class;
use crate::name::Name;
use crate::rr::Type;
use crate::util::Caseless;

////////////////////////////////////////////////////////////////////////
// QUESTIONS                                                          //
////////////////////////////////////////////////////////////////////////

/// The question of a DNS query ([RFC 1035 § 4.1.2]): the name being
/// asked about, the [QTYPE](Qtype) and the [QCLASS](Qclass).
///
/// [RFC 1035 § 4.1.2]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.2
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Question {
    pub qname: Name,
    pub qtype: Qtype,
    pub qclass: Qclass,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.qname, self.qclass, self.qtype)
    }
}

////////////////////////////////////////////////////////////////////////
// QTYPES                                                             //
////////////////////////////////////////////////////////////////////////

/// The QTYPE of a DNS [question](Question).
///
/// Every RR [`Type`] is a QTYPE. The QTYPE-only values this server
/// cares about are the zone transfer requests [AXFR](Qtype::AXFR) and
/// [IXFR](Qtype::IXFR).
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Qtype(u16);

impl Qtype {
    // RFC 1995
    pub const IXFR: Self = Self(251);

    // RFC 1035
    pub const AXFR: Self = Self(252);
    pub const ANY: Self = Self(255);

    /// Returns whether this QTYPE requests a zone transfer.
    pub fn is_transfer(self) -> bool {
        self == Self::AXFR || self == Self::IXFR
    }
}

impl From<u16> for Qtype {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Qtype> for u16 {
    fn from(qtype: Qtype) -> Self {
        qtype.0
    }
}

impl From<Type> for Qtype {
    fn from(rr_type: Type) -> Self {
        Self(rr_type.into())
    }
}

impl fmt::Display for Qtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::IXFR => f.write_str("IXFR"),
            Self::AXFR => f.write_str("AXFR"),
            Self::ANY => f.write_str("ANY"),
            _ => fmt::Display::fmt(&Type::from(*self), f),
        }
    }
}

impl fmt::Debug for Qtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Qtype {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mnemonic = Caseless(text);
        if mnemonic == Caseless("IXFR") {
            Ok(Self::IXFR)
        } else if mnemonic == Caseless("AXFR") {
            Ok(Self::AXFR)
        } else if mnemonic == Caseless("ANY") || text == "*" {
            Ok(Self::ANY)
        } else {
            text.parse::<Type>().map(Into::into)
        }
    }
}

////////////////////////////////////////////////////////////////////////
// QCLASSES                                                           //
////////////////////////////////////////////////////////////////////////

/// The QCLASS of a DNS [question](Question). Every [`Class`] is a
/// QCLASS; [`Qclass::ANY`] is the only additional value named here.
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct Qclass(u16);

impl Qclass {
    pub const ANY: Self = Self(255);
}

impl From<u16> for Qclass {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Qclass> for u16 {
    fn from(qclass: Qclass) -> Self {
        qclass.0
    }
}

impl From<Class> for Qclass {
    fn from(class: Class) -> Self {
        Self(class.into())
    }
}

impl fmt::Display for Qclass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::ANY => f.write_str("ANY"),
            _ => fmt::Display::fmt(&Class::from(*self), f),
        }
    }
}

impl fmt::Debug for Qclass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_qtypes_are_recognized() {
        assert!(Qtype::AXFR.is_transfer());
        assert!("ixfr".parse::<Qtype>().unwrap().is_transfer());
        assert!(!Qtype::from(Type::SOA).is_transfer());
        assert!(!Qtype::ANY.is_transfer());
    }

    #[test]
    fn qtype_mnemonics_ignore_case() {
        assert_eq!("axfr".parse::<Qtype>(), Ok(Qtype::AXFR));
        assert_eq!("Ixfr".parse::<Qtype>(), Ok(Qtype::IXFR));
        assert_eq!("any".parse::<Qtype>(), Ok(Qtype::ANY));
        assert_eq!("*".parse::<Qtype>(), Ok(Qtype::ANY));
        assert_eq!("soa".parse::<Qtype>(), Ok(Qtype::from(Type::SOA)));
    }

    #[test]
    fn qtype_falls_back_to_type_text() {
        assert_eq!("MX".parse::<Qtype>(), Ok(Qtype::from(Type::MX)));
        assert_eq!(Qtype::from(Type::AAAA).to_string(), "AAAA");
        assert_eq!(Qtype::AXFR.to_string(), "AXFR");
    }
}
