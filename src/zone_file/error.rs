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

//! Error types for zone file parsing.
//!
//! All syntax errors carry an [`ErrorKind`] and the position at which
//! they were detected, so messages stay consistent without allocating
//! strings.

use std::fmt;
use std::net::AddrParseError;
use std::num::ParseIntError;
use std::str::Utf8Error;

use super::Position;
use crate::name;

////////////////////////////////////////////////////////////////////////
// ERROR STRUCTURE                                                    //
////////////////////////////////////////////////////////////////////////

/// A zone file syntax error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    pub(super) position: Position,
    pub(super) kind: ErrorKind,
}

impl Error {
    pub(super) fn new(position: Position, kind: ErrorKind) -> Self {
        Self { position, kind }
    }

    /// Returns the line in the file at which the error occurred.
    pub fn line(&self) -> usize {
        self.position.line
    }

    /// Returns the column in the file at which the error occurred.
    pub fn column(&self) -> usize {
        self.position.column
    }

    /// Returns the kind of syntax error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at line {} column {}",
            self.kind, self.position.line, self.position.column,
        )
    }
}

impl std::error::Error for Error {}

/// A result type for zone file parsing.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// SYNTAX ERROR KINDS                                                 //
////////////////////////////////////////////////////////////////////////

/// Kinds of zone file syntax errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    AtWhenOriginNotSet,
    BadUtf8(Utf8Error),
    CharacterStringTooLong,
    EmptyOwnerWithNoPrevious,
    EofBeforeCloseParen,
    EofInEscape,
    EofInQuotedCharacterString,
    EscapeNeedsThreeDigits,
    EscapeValueOutOfRange,
    ExpectedBackslashHash,
    ExpectedCharacterString,
    ExpectedClassOrType,
    ExpectedEol,
    ExpectedHexRdata,
    ExpectedName,
    ExpectedRdata,
    ExpectedRdataLen,
    ExpectedTtl,
    ExpectedTtlClassOrType,
    ExpectedTtlOrType,
    ExpectedType,
    ExpectedU16,
    ExpectedU32,
    FieldTooLong,
    IncludeNotSupported,
    InvalidClass(&'static str),
    InvalidHexDigit,
    InvalidInt(ParseIntError),
    InvalidIpv4(AddrParseError),
    InvalidIpv6(AddrParseError),
    InvalidLabel(name::Error),
    InvalidName(name::Error),
    InvalidRdataForType,
    InvalidRdataLen(ParseIntError),
    InvalidTtl(ParseIntError),
    InvalidType(&'static str),
    NestedParens,
    OmittedClassWithNoPrevious,
    OmittedTtlWithNoDefaultOrPrevious,
    PqdnWhenOriginNotSet,
    RdataLenMismatch,
    TxtTooLong,
    UnknownDirective,
    UnmatchedCloseParen,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AtWhenOriginNotSet => f.write_str("cannot use @ when no origin is set"),
            Self::BadUtf8(err) => write!(f, "field is not UTF-8: {err}"),
            Self::CharacterStringTooLong => f.write_str("<character-string> is too long"),
            Self::EmptyOwnerWithNoPrevious => {
                f.write_str("the owner cannot be empty when no previous owner is available")
            }
            Self::EofBeforeCloseParen => {
                f.write_str("reached end of file before close parenthesis")
            }
            Self::EofInEscape => f.write_str("reached end of file in escape sequence"),
            Self::EofInQuotedCharacterString => {
                f.write_str("reached end of file in quoted <character-string>")
            }
            Self::EscapeNeedsThreeDigits => {
                f.write_str("invalid escape sequence: expected three decimal digits")
            }
            Self::EscapeValueOutOfRange => {
                f.write_str("invalid escape sequence: escaped octet value is out of range")
            }
            Self::ExpectedBackslashHash => f.write_str("expected \\# for RDATA of unknown type"),
            Self::ExpectedCharacterString => f.write_str("expected a <character-string>"),
            Self::ExpectedClassOrType => f.write_str("expected a class or RR type"),
            Self::ExpectedEol => f.write_str("expected end of line"),
            Self::ExpectedHexRdata => f.write_str("expected hexadecimal RDATA"),
            Self::ExpectedName => f.write_str("expected a domain name"),
            Self::ExpectedRdata => f.write_str("expected RDATA"),
            Self::ExpectedRdataLen => f.write_str("expected an RDATA length"),
            Self::ExpectedTtl => f.write_str("expected a TTL"),
            Self::ExpectedTtlClassOrType => f.write_str("expected a TTL, class, or RR type"),
            Self::ExpectedTtlOrType => f.write_str("expected a TTL or RR type"),
            Self::ExpectedType => f.write_str("expected an RR type"),
            Self::ExpectedU16 => f.write_str("expected a 16-bit unsigned integer"),
            Self::ExpectedU32 => f.write_str("expected a 32-bit unsigned integer"),
            Self::FieldTooLong => f.write_str("field is too long"),
            Self::IncludeNotSupported => f.write_str("$INCLUDE is not supported"),
            Self::InvalidClass(err) => write!(f, "invalid class: {err}"),
            Self::InvalidHexDigit => f.write_str("invalid hexadecimal digit"),
            Self::InvalidInt(err) => write!(f, "invalid integer: {err}"),
            Self::InvalidIpv4(err) => write!(f, "invalid IPv4 address: {err}"),
            Self::InvalidIpv6(err) => write!(f, "invalid IPv6 address: {err}"),
            Self::InvalidLabel(err) => write!(f, "invalid label: {err}"),
            Self::InvalidName(err) => write!(f, "invalid domain name: {err}"),
            Self::InvalidRdataForType => f.write_str("RDATA is not valid for the RR type"),
            Self::InvalidRdataLen(err) => write!(f, "invalid RDATA length: {err}"),
            Self::InvalidTtl(err) => write!(f, "invalid TTL: {err}"),
            Self::InvalidType(err) => write!(f, "invalid RR type: {err}"),
            Self::NestedParens => f.write_str("parentheses cannot be nested"),
            Self::OmittedClassWithNoPrevious => {
                f.write_str("the class cannot be omitted when no previous class is available")
            }
            Self::OmittedTtlWithNoDefaultOrPrevious => f.write_str(
                "the TTL cannot be omitted when no default or previous TTL is available",
            ),
            Self::PqdnWhenOriginNotSet => {
                f.write_str("cannot use a relative domain name when no origin is set")
            }
            Self::RdataLenMismatch => {
                f.write_str("the number of RDATA octets does not match the given length")
            }
            Self::TxtTooLong => f.write_str("TXT RDATA is too long"),
            Self::UnknownDirective => f.write_str("unknown directive"),
            Self::UnmatchedCloseParen => f.write_str("unmatched close parenthesis"),
        }
    }
}
