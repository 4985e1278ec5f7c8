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

//! Parsing and writing of [RFC 1035 § 5] zone files.
//!
//! This module provides the [`Parser`] structure, which reads zone
//! file text from memory and can be iterated over to read DNS records.
//! Unlike a strict parser, iteration does not end at a syntax error:
//! the offending logical line is discarded and parsing resumes with
//! the next one, so one bad record does not take down a whole zone.
//! `$ORIGIN` and `$TTL` directives are processed internally; `$INCLUDE`
//! is reported as an [error](ErrorKind::IncludeNotSupported).
//!
//! On top of the [`Parser`], [`load`] builds a
//! [`RecordStore`](crate::zone::RecordStore) from a stream, and
//! [`write_zone`] produces zone file text from one.
//!
//! ```
//! use udns::rr::Type;
//! use udns::zone_file::Parser;
//!
//! const ZONE_FILE: &[u8] = br#"
//! $ORIGIN example.test.
//! $TTL 86400
//! @   IN SOA ns1 admin (
//!     123     ; SERIAL
//!     3600    ; REFRESH
//!     900     ; RETRY
//!     86400   ; EXPIRE
//!     3600    ; MINIMUM
//! )
//!     IN NS ns1
//! ns1 IN A 127.0.0.1
//! bad IN A not-an-address
//!     IN AAAA ::1
//! "#;
//!
//! let mut parser = Parser::new(ZONE_FILE);
//! assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::SOA);
//! assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::NS);
//! assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::A);
//! assert!(parser.next().unwrap().is_err());
//! assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::AAAA);
//! assert!(parser.next().is_none());
//! ```
//!
//! # A note about the implementation
//!
//! It is hard to write a clean lexer for DNS zone files. The format is
//! line-based, but parentheses can extend a record across lines.
//! Leading whitespace is significant, since it signals that the owner
//! is the previous one. Escaping applies to domain names and
//! `<character-string>`s but not to the [RFC 3597 § 5] `\#` token.
//! And the TTL and class may each be omitted or appear in either
//! order, while the RDATA format depends on the record type.
//!
//! So there is no clean lexer/parser split here. An internal `Reader`
//! implements the basic operations for reading data and moving between
//! fields and lines (including comments and parentheses), and the
//! [`Parser`] uses it to parse records, including escape sequences.
//!
//! [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5
//! [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5

use crate::class::Class;
use crate::name::Name;
use crate::rr::{Record, Ttl};

mod character_string;
mod directive;
mod error;
mod escape;
mod load;
mod name;
mod reader;
mod record;
mod writer;

pub use error::{Error, ErrorKind, Result};
pub use load::{find_origin, load, LoadedZone, OriginError};
use reader::{FieldOrEol, Position, Reader};
pub use writer::write_zone;

////////////////////////////////////////////////////////////////////////
// STRUCTURES                                                         //
////////////////////////////////////////////////////////////////////////

/// A parser for [RFC 1035 § 5] DNS zone files.
///
/// A `Parser` borrows the zone file text and can then be iterated to
/// read DNS records. See the [module-level documentation](`self`) for
/// details and example usage.
///
/// [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5
pub struct Parser<'a> {
    reader: Reader<'a>,
    context: Context,
}

/// Tracks the parse context of a [`Parser`].
///
/// An `@` symbol is shorthand for the current origin (set with
/// `$ORIGIN`), and partially qualified domain names are interpreted
/// relative to it. Default TTLs are set with `$TTL`; otherwise an
/// omitted TTL is the previous record's. Omitted classes and owners
/// default to the previous record's.
#[derive(Clone, Default)]
struct Context {
    origin: Option<Name>,
    previous_owner: Option<Name>,
    previous_ttl: Option<Ttl>,
    previous_class: Option<Class>,
    default_ttl: Option<Ttl>,
}

////////////////////////////////////////////////////////////////////////
// PARSER CONSTRUCTION AND ITERATION                                  //
////////////////////////////////////////////////////////////////////////

impl<'a> Parser<'a> {
    /// Creates a new [`Parser`] to read the zone file text in `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            reader: Reader::new(input),
            context: Context::default(),
        }
    }

    /// Creates a new [`Parser`] whose origin is `origin` until the
    /// file says otherwise.
    pub fn with_origin(input: &'a [u8], origin: Name) -> Self {
        let mut parser = Self::new(input);
        parser.context.origin = Some(origin);
        parser
    }

    /// Returns the TTL set by the most recent `$TTL` directive read so
    /// far, if any.
    pub fn default_ttl(&self) -> Option<Ttl> {
        self.context.default_ttl
    }

    /// An internal helper to parse a single logical line of a zone
    /// file.
    fn parse_line(&mut self) -> Result<Option<Record>> {
        if self.reader.peek_octet() == Some(b'$') {
            self.parse_directive().map(|()| None)
        } else {
            self.parse_record_or_empty()
        }
    }

    /// An internal helper to parse lines until a record is found.
    fn parse_lines_until_record_found(&mut self) -> Result<Option<Record>> {
        while !self.reader.at_eof() {
            if let Some(record) = self.parse_line()? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

impl Iterator for Parser<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.parse_lines_until_record_found() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.reader.recover();
                Some(Err(e))
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::{Rdata, Type};

    /// A helper used throughout the [`zone_file`](`super`) module's
    /// tests.
    pub(super) fn make_parser(data: &[u8]) -> Parser {
        Parser::new(data)
    }

    #[test]
    fn parser_continues_after_bad_records() {
        let records: Vec<_> = make_parser(
            b"$ORIGIN example.test.\n\
              a 60 IN A 192.0.2.1\n\
              b 60 IN A 192.0.2.300\n\
              c 60 IN MX ( 10\n\
              mail.example.test. extra )\n\
              d 60 IN A 192.0.2.4\n",
        )
        .collect();
        assert_eq!(records.len(), 4);
        assert!(records[0].is_ok());
        assert_eq!(records[1].as_ref().unwrap_err().line(), 3);
        assert!(records[2].is_err());
        let last = records[3].as_ref().unwrap();
        assert_eq!(last.owner, "d.example.test.".parse().unwrap());
        assert_eq!(last.rdata, Rdata::A([192, 0, 2, 4].into()));
    }

    #[test]
    fn parser_uses_known_origin() {
        let mut parser = Parser::with_origin(b"www 300 IN CNAME @\n", "example.test.".parse().unwrap());
        let record = parser.next().unwrap().unwrap();
        assert_eq!(record.owner, "www.example.test.".parse().unwrap());
        assert_eq!(record.rr_type, Type::CNAME);
        assert_eq!(record.rdata, Rdata::Cname("example.test.".parse().unwrap()));
        assert!(parser.next().is_none());
    }

    #[test]
    fn parser_reports_include_and_moves_on() {
        let mut parser = Parser::with_origin(
            b"$INCLUDE other.zone\n@ 60 IN A 192.0.2.1\n",
            "example.test.".parse().unwrap(),
        );
        assert_eq!(
            parser.next().unwrap().unwrap_err().kind(),
            &ErrorKind::IncludeNotSupported
        );
        assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::A);
    }
}
