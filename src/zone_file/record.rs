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

//! Parsing of resource records.

use std::net::{Ipv4Addr, Ipv6Addr};

use super::{Error, ErrorKind, FieldOrEol, Parser, Result};
use crate::class::Class;
use crate::rr::{Rdata, Record, Soa, Ttl, Type};
use crate::util::hex_digit_value;

/// The largest RDATA that fits in the 16-bit RDLENGTH field.
const MAX_RDATA_LEN: usize = u16::MAX as usize;

impl Parser<'_> {
    ////////////////////////////////////////////////////////////////////
    // PARSING OF RESOURCE RECORDS (OR EMPTY LINES)                   //
    ////////////////////////////////////////////////////////////////////

    /// Parses a resource record or an empty line.
    pub(super) fn parse_record_or_empty(&mut self) -> Result<Option<Record>> {
        let start_of_line = self.reader.position();
        let leading_whitespace = self.reader.skip_whitespace();
        if self.reader.skip_to_next_field_or_through_eol()? == FieldOrEol::Eol {
            return Ok(None);
        }

        // Leading whitespace means the owner is the previous owner.
        let owner = if leading_whitespace {
            match self.context.previous_owner {
                Some(ref previous_owner) => previous_owner.clone(),
                None => {
                    return Err(Error::new(
                        start_of_line,
                        ErrorKind::EmptyOwnerWithNoPrevious,
                    ))
                }
            }
        } else {
            self.parse_name()?
        };

        self.reader
            .skip_to_next_field(ErrorKind::ExpectedTtlClassOrType)?;
        let (ttl, class) = self.parse_ttl_and_class()?;

        self.reader.skip_to_next_field(ErrorKind::ExpectedType)?;
        let rr_type: Type = self.reader.read_field(ErrorKind::InvalidType)?;

        // parse_rdata skips to the RDATA itself and consumes the end
        // of the line.
        let rdata = self.parse_rdata(rr_type)?;

        self.context.previous_owner = Some(owner.clone());
        self.context.previous_ttl = Some(ttl);
        self.context.previous_class = Some(class);

        Ok(Some(Record {
            owner,
            rr_type,
            class,
            ttl,
            rdata,
        }))
    }

    ////////////////////////////////////////////////////////////////////
    // RESOURCE RECORD PARSING HELPERS                                //
    ////////////////////////////////////////////////////////////////////

    /// Parses the TTL and CLASS fields of a record. We may see TTL then
    /// CLASS, CLASS then TTL, only one of the two, or neither. When
    /// omitted, the CLASS defaults to the previous record's CLASS. The
    /// TTL defaults to the one given by the most recent `$TTL`
    /// directive ([RFC 2308 § 4]), or failing that, the previous
    /// record's TTL.
    ///
    /// [RFC 2308 § 4]: https://datatracker.ietf.org/doc/html/rfc2308#section-4
    fn parse_ttl_and_class(&mut self) -> Result<(Ttl, Class)> {
        // The TTL, class, and type fields are disjoint (RFC 1035 §
        // 5.1), and read_field consumes nothing on failure, so we can
        // just try each possibility.
        if let Ok(ttl) = self.parse_ttl() {
            self.reader
                .skip_to_next_field(ErrorKind::ExpectedClassOrType)?;
            if let Ok(class) = self.parse_class() {
                Ok((ttl, class))
            } else if let Some(class) = self.context.previous_class {
                Ok((ttl, class))
            } else {
                Err(Error::new(
                    self.reader.position(),
                    ErrorKind::OmittedClassWithNoPrevious,
                ))
            }
        } else if let Ok(class) = self.parse_class() {
            self.reader
                .skip_to_next_field(ErrorKind::ExpectedTtlOrType)?;
            if let Ok(ttl) = self.parse_ttl() {
                Ok((ttl, class))
            } else if let Some(ttl) = self.default_or_previous_ttl() {
                Ok((ttl, class))
            } else {
                Err(Error::new(
                    self.reader.position(),
                    ErrorKind::OmittedTtlWithNoDefaultOrPrevious,
                ))
            }
        } else {
            match (self.default_or_previous_ttl(), self.context.previous_class) {
                (Some(ttl), Some(class)) => Ok((ttl, class)),
                (Some(_), None) => Err(Error::new(
                    self.reader.position(),
                    ErrorKind::OmittedClassWithNoPrevious,
                )),
                (None, _) => Err(Error::new(
                    self.reader.position(),
                    ErrorKind::OmittedTtlWithNoDefaultOrPrevious,
                )),
            }
        }
    }

    fn parse_ttl(&mut self) -> Result<Ttl> {
        self.reader.read_field(ErrorKind::InvalidTtl)
    }

    fn parse_class(&mut self) -> Result<Class> {
        self.reader.read_field(ErrorKind::InvalidClass)
    }

    /// Returns the TTL to use if the TTL field is omitted.
    fn default_or_previous_ttl(&self) -> Option<Ttl> {
        self.context.default_ttl.or(self.context.previous_ttl)
    }

    ////////////////////////////////////////////////////////////////////
    // RDATA PARSING                                                  //
    ////////////////////////////////////////////////////////////////////

    // RFC 3597 § 5 allows the RDATA of *any* type to be given in the
    // generic \# format. For types we know, such RDATA is decoded (and
    // thereby validated) with the same code that reads RDATA off the
    // wire.
    //
    // Unlike elsewhere in this module, these methods skip to the RDATA
    // themselves, since the right "expected ..." message depends on
    // the type. They also consume the line ending, as some formats
    // (TXT) have no fixed number of fields. Every check happens before
    // the line ending is consumed, so that a failed record can always
    // be skipped as a whole.

    /// Parses RDATA for a record of type `rr_type`, through the end of
    /// the line.
    fn parse_rdata(&mut self, rr_type: Type) -> Result<Rdata> {
        self.reader.skip_to_next_field(ErrorKind::ExpectedRdata)?;
        if self.reader.expect_field(b"\\#") {
            return self.parse_generic_rdata(rr_type);
        }

        let rdata = match rr_type {
            Type::A => Rdata::A(self.parse_ipv4()?),
            Type::AAAA => Rdata::Aaaa(self.parse_ipv6()?),
            Type::NS => Rdata::Ns(self.parse_name()?),
            Type::CNAME => Rdata::Cname(self.parse_name()?),
            Type::PTR => Rdata::Ptr(self.parse_name()?),
            Type::MX => {
                let preference = self.reader.read_field(ErrorKind::InvalidInt)?;
                self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
                Rdata::Mx {
                    preference,
                    exchange: self.parse_name()?,
                }
            }
            Type::SOA => Rdata::Soa(Box::new(self.parse_soa_fields()?)),
            Type::TXT => Rdata::Txt(self.parse_txt_strings()?),
            Type::SRV => {
                let priority = self.reader.read_field(ErrorKind::InvalidInt)?;
                self.reader.skip_to_next_field(ErrorKind::ExpectedU16)?;
                let weight = self.reader.read_field(ErrorKind::InvalidInt)?;
                self.reader.skip_to_next_field(ErrorKind::ExpectedU16)?;
                let port = self.reader.read_field(ErrorKind::InvalidInt)?;
                self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
                Rdata::Srv {
                    priority,
                    weight,
                    port,
                    target: self.parse_name()?,
                }
            }
            _ => {
                return Err(Error::new(
                    self.reader.position(),
                    ErrorKind::ExpectedBackslashHash,
                ))
            }
        };
        self.reader.expect_eol()?;
        Ok(rdata)
    }

    fn parse_ipv4(&mut self) -> Result<Ipv4Addr> {
        self.reader.read_field(ErrorKind::InvalidIpv4)
    }

    fn parse_ipv6(&mut self) -> Result<Ipv6Addr> {
        self.reader.read_field(ErrorKind::InvalidIpv6)
    }

    /// Parses the seven fields of SOA RDATA.
    fn parse_soa_fields(&mut self) -> Result<Soa> {
        let mname = self.parse_name()?;
        self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
        let rname = self.parse_name()?;
        let mut numbers = [0u32; 5];
        for number in numbers.iter_mut() {
            self.reader.skip_to_next_field(ErrorKind::ExpectedU32)?;
            *number = self.reader.read_field(ErrorKind::InvalidInt)?;
        }
        let [serial, refresh, retry, expire, minimum] = numbers;
        Ok(Soa {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        })
    }

    /// Parses the `<character-string>`s of TXT RDATA up to (but not
    /// through) the end of the line.
    fn parse_txt_strings(&mut self) -> Result<Vec<Box<[u8]>>> {
        let start_position = self.reader.position();
        let mut strings = Vec::new();
        let mut rdata_len = 0;
        loop {
            let string = self.parse_character_string()?;
            rdata_len += string.len() + 1;
            if rdata_len > MAX_RDATA_LEN {
                return Err(Error::new(start_position, ErrorKind::TxtTooLong));
            }
            strings.push(string);
            if self.reader.skip_to_next_field_or_to_eol()? == FieldOrEol::Eol {
                return Ok(strings);
            }
        }
    }

    /// Parses RDATA in the `\# <length> <hex>` format. The caller has
    /// already consumed the `\#`.
    fn parse_generic_rdata(&mut self, rr_type: Type) -> Result<Rdata> {
        self.reader.skip_to_next_field(ErrorKind::ExpectedRdataLen)?;
        let len: u16 = self.reader.read_field(ErrorKind::InvalidRdataLen)?;
        let hex_position = self.reader.position();
        let octets = self.parse_hex_octets(len as usize)?;
        let rdata = Rdata::read(rr_type, &octets, 0, len)
            .map_err(|_| Error::new(hex_position, ErrorKind::InvalidRdataForType))?;
        self.reader.expect_eol()?;
        Ok(rdata)
    }

    /// Parses hexadecimal digits for exactly `len` octets. The digits
    /// may be split into several fields, but not within an octet.
    fn parse_hex_octets(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut octets = Vec::with_capacity(len);
        while octets.len() < len {
            self.reader.skip_to_next_field(ErrorKind::ExpectedHexRdata)?;
            while let Some(high) = self.reader.read_field_octet() {
                let low = self.reader.read_field_octet();
                match (hex_digit_value(high), low.and_then(hex_digit_value)) {
                    (Some(high), Some(low)) => octets.push((high << 4) | low),
                    _ => {
                        return Err(Error::new(
                            self.reader.position(),
                            ErrorKind::InvalidHexDigit,
                        ))
                    }
                }
            }
        }
        if self.reader.skip_to_next_field_or_to_eol()? == FieldOrEol::Field || octets.len() != len {
            Err(Error::new(self.reader.position(), ErrorKind::RdataLenMismatch))
        } else {
            Ok(octets)
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
