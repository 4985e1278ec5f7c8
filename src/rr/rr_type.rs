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

//! Provides the [`Type`] structure for DNS RR types.

use std::fmt;
use std::str::FromStr;

use crate::message::Qtype;
use crate::util::Caseless;

/// Represents the RR type of a DNS record.
///
/// On the wire an RR type is an unsigned 16-bit integer, so `Type` is a
/// thin wrapper around [`u16`]. Constants are provided for the types
/// that have typed [`Rdata`](super::Rdata); any other value is still a
/// valid `Type` and is written in the RFC 3597 `TYPEnnn` form.
///
/// The ordering of `Type`s is the ordering of their numeric values,
/// which is the order the zone file serializer groups records in.
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Type(u16);

impl Type {
    pub const A: Type = Type(1);
    pub const NS: Type = Type(2);
    pub const CNAME: Type = Type(5);
    pub const SOA: Type = Type(6);
    pub const PTR: Type = Type(12);
    pub const MX: Type = Type(15);
    pub const TXT: Type = Type(16);
    pub const AAAA: Type = Type(28);
    pub const SRV: Type = Type(33);
}

/// Mnemonics of the types that have one, used for both parsing and
/// display.
const MNEMONICS: [(Type, &str); 9] = [
    (Type::A, "A"),
    (Type::NS, "NS"),
    (Type::CNAME, "CNAME"),
    (Type::SOA, "SOA"),
    (Type::PTR, "PTR"),
    (Type::MX, "MX"),
    (Type::TXT, "TXT"),
    (Type::AAAA, "AAAA"),
    (Type::SRV, "SRV"),
];

impl From<u16> for Type {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Type> for u16 {
    fn from(rr_type: Type) -> Self {
        rr_type.0
    }
}

impl From<Qtype> for Type {
    fn from(qtype: Qtype) -> Self {
        Self(qtype.into())
    }
}

impl FromStr for Type {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if let Some((rr_type, _)) = MNEMONICS
            .iter()
            .find(|(_, mnemonic)| Caseless(mnemonic) == Caseless(text))
        {
            Ok(*rr_type)
        } else if text
            .get(0..4)
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case("TYPE"))
        {
            text[4..]
                .parse::<u16>()
                .map(Self::from)
                .or(Err("type value is not a valid unsigned 16-bit integer"))
        } else {
            Err("unknown type")
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match MNEMONICS.iter().find(|(rr_type, _)| rr_type == self) {
            Some((_, mnemonic)) => f.write_str(mnemonic),
            None => write!(f, "TYPE{}", self.0), // RFC 3597 § 5
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_are_case_insensitive() {
        assert_eq!("mx".parse::<Type>(), Ok(Type::MX));
        assert_eq!("Aaaa".parse::<Type>(), Ok(Type::AAAA));
        assert_eq!(Type::SRV.to_string(), "SRV");
    }

    #[test]
    fn unknown_types_use_rfc3597_form() {
        let private = Type::from(0xff00);
        assert_eq!(private.to_string(), "TYPE65280");
        assert_eq!("type65280".parse::<Type>(), Ok(private));
        assert_eq!("TYPE1".parse::<Type>(), Ok(Type::A));
        assert!("TYPE65536".parse::<Type>().is_err());
        assert!("HINFOO".parse::<Type>().is_err());
    }

    #[test]
    fn types_order_by_value() {
        assert!(Type::SOA < Type::MX);
        assert!(Type::AAAA < Type::SRV);
    }
}
