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

//! Implementation of the [`Reader`] type to read on-the-wire DNS
//! messages.

use std::fmt;

use super::constants::*;
use super::{Opcode, Question, Rcode};
use crate::name::{self, Name};
use crate::rr::{Rdata, ReadRdataError, Record};

////////////////////////////////////////////////////////////////////////
// READER                                                             //
////////////////////////////////////////////////////////////////////////

/// A "frame" around a buffer containing a DNS message that enables
/// reading the message data.
///
/// A `Reader` is constructed using its [`TryFrom`] implementation,
/// which fails unless the buffer holds at least a full 12-octet
/// header. Header fields can be read at any time. Questions and then
/// records are read in message order with [`Reader::read_question`]
/// and [`Reader::read_rr`], which advance a cursor that starts just
/// after the header.
#[derive(Eq, PartialEq)]
pub struct Reader<'a> {
    octets: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    /// Returns the 16-bit ID of the message.
    pub fn id(&self) -> u16 {
        self.header_u16(ID_START)
    }

    /// Returns whether the QR (query response) bit is set.
    pub fn qr(&self) -> bool {
        self.octets[FLAGS_HI] & QR_MASK != 0
    }

    /// Returns the opcode of the message.
    pub fn opcode(&self) -> Opcode {
        Opcode::from((self.octets[FLAGS_HI] & OPCODE_MASK) >> OPCODE_SHIFT)
    }

    /// Returns whether the AA (authoritative answer) bit is set.
    pub fn aa(&self) -> bool {
        self.octets[FLAGS_HI] & AA_MASK != 0
    }

    /// Returns whether the TC (truncation) bit is set.
    pub fn tc(&self) -> bool {
        self.octets[FLAGS_HI] & TC_MASK != 0
    }

    /// Returns whether the RD (recursion desired) bit is set.
    pub fn rd(&self) -> bool {
        self.octets[FLAGS_HI] & RD_MASK != 0
    }

    /// Returns whether the RA (recursion available) bit is set.
    pub fn ra(&self) -> bool {
        self.octets[FLAGS_LO] & RA_MASK != 0
    }

    /// Returns the RCODE of the message.
    pub fn rcode(&self) -> Rcode {
        Rcode::from(self.octets[FLAGS_LO] & RCODE_MASK)
    }

    pub fn qdcount(&self) -> u16 {
        self.header_u16(QDCOUNT_START)
    }

    pub fn ancount(&self) -> u16 {
        self.header_u16(ANCOUNT_START)
    }

    pub fn nscount(&self) -> u16 {
        self.header_u16(NSCOUNT_START)
    }

    pub fn arcount(&self) -> u16 {
        self.header_u16(ARCOUNT_START)
    }

    fn header_u16(&self, start: usize) -> u16 {
        u16::from_be_bytes([self.octets[start], self.octets[start + 1]])
    }

    /// Reads a [`Question`] starting at the current cursor.
    ///
    /// This method is atomic, in that the cursor is not changed on
    /// failure.
    pub fn read_question(&mut self) -> Result<Question> {
        let (qname, qname_len) =
            Name::try_from_compressed(self.octets, self.cursor).map_err(Error::InvalidOwner)?;
        let qname_end = self.cursor + qname_len;
        let qtype = read_u16(self.octets, qname_end)?.into();
        let qclass = read_u16(self.octets, qname_end + 2)?.into();
        self.cursor = qname_end + 4;
        Ok(Question {
            qname,
            qtype,
            qclass,
        })
    }

    /// Reads a resource record at the current cursor.
    ///
    /// This method is atomic, in that the cursor is not changed on
    /// failure.
    pub fn read_rr(&mut self) -> Result<Record> {
        let (owner, owner_len) =
            Name::try_from_compressed(self.octets, self.cursor).map_err(Error::InvalidOwner)?;
        let owner_end = self.cursor + owner_len;
        let rr_type = read_u16(self.octets, owner_end)?.into();
        let class = read_u16(self.octets, owner_end + 2)?.into();
        let ttl = read_u32(self.octets, owner_end + 4)?.into();
        let rdlength = read_u16(self.octets, owner_end + 8)?;
        let rdata = Rdata::read(rr_type, self.octets, owner_end + 10, rdlength)?;
        self.cursor = owner_end + 10 + rdlength as usize;
        Ok(Record {
            owner,
            rr_type,
            class,
            ttl,
            rdata,
        })
    }

    /// Returns whether the `Reader`'s cursor has reached the end of the
    /// message.
    pub fn at_eom(&self) -> bool {
        self.cursor >= self.octets.len()
    }
}

impl<'a> TryFrom<&'a [u8]> for Reader<'a> {
    type Error = Error;

    fn try_from(octets: &'a [u8]) -> Result<Self> {
        if octets.len() >= HEADER_SIZE {
            Ok(Self {
                octets,
                cursor: HEADER_SIZE,
            })
        } else {
            Err(Error::HeaderTooShort)
        }
    }
}

impl fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Reader")
            .field("id", &self.id())
            .field("qr", &self.qr())
            .field("opcode", &self.opcode())
            .field("rcode", &self.rcode())
            .field("qdcount", &self.qdcount())
            .field("ancount", &self.ancount())
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Reads a network-byte-order `u16` at `index` of `octets`.
fn read_u16(octets: &[u8], index: usize) -> Result<u16> {
    match octets.get(index..index + 2) {
        Some(field) => Ok(u16::from_be_bytes([field[0], field[1]])),
        None => Err(Error::UnexpectedEomInField),
    }
}

/// Reads a network-byte-order `u32` at `index` of `octets`.
fn read_u32(octets: &[u8], index: usize) -> Result<u32> {
    match octets.get(index..index + 4) {
        Some(field) => Ok(u32::from_be_bytes([field[0], field[1], field[2], field[3]])),
        None => Err(Error::UnexpectedEomInField),
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a [`Question`] or resource record could not
/// be read.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    HeaderTooShort,
    UnexpectedEomInField,
    InvalidOwner(name::Error),
    InvalidRdata(ReadRdataError),
}

impl From<ReadRdataError> for Error {
    fn from(err: ReadRdataError) -> Self {
        Self::InvalidRdata(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::HeaderTooShort => f.write_str("header too short"),
            Self::UnexpectedEomInField => f.write_str("unexpected end of message in field"),
            Self::InvalidOwner(err) => write!(f, "invalid owner: {err}"),
            Self::InvalidRdata(err) => fmt::Display::fmt(&err, f),
        }
    }
}

impl std::error::Error for Error {}

/// The type returned by fallible [`Reader`] methods.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::message::Qtype;
    use crate::rr::Type;

    const QUERY: &[u8] = b"\x12\x34\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\
                           \x03www\x07example\x04test\x00\x00\x01\x00\x01";

    #[test]
    fn reads_header_and_question() {
        let mut reader = Reader::try_from(QUERY).unwrap();
        assert_eq!(reader.id(), 0x1234);
        assert!(!reader.qr());
        assert!(reader.rd());
        assert_eq!(reader.opcode(), Opcode::Query);
        assert_eq!(reader.qdcount(), 1);
        let question = reader.read_question().unwrap();
        assert_eq!(question.qname, "www.example.test.".parse().unwrap());
        assert_eq!(question.qtype, Qtype::from(Type::A));
        assert_eq!(question.qclass, Class::IN.into());
        assert!(reader.at_eom());
    }

    #[test]
    fn reads_rr_with_compressed_owner() {
        let mut message = QUERY.to_vec();
        message.extend_from_slice(b"\xc0\x0c\x00\x01\x00\x01\x00\x00\x0e\x10\x00\x04\xc0\x00\x02\x01");
        let mut reader = Reader::try_from(message.as_slice()).unwrap();
        reader.read_question().unwrap();
        let record = reader.read_rr().unwrap();
        assert_eq!(record.owner, "www.example.test.".parse().unwrap());
        assert_eq!(u32::from(record.ttl), 3600);
        assert_eq!(record.rdata, Rdata::A([192, 0, 2, 1].into()));
    }

    #[test]
    fn rejects_short_header() {
        assert_eq!(
            Reader::try_from(&QUERY[..11]),
            Err(Error::HeaderTooShort)
        );
    }

    #[test]
    fn read_question_is_atomic() {
        let truncated = &QUERY[..QUERY.len() - 1];
        let mut reader = Reader::try_from(truncated).unwrap();
        assert_eq!(reader.read_question(), Err(Error::UnexpectedEomInField));
        assert!(!reader.at_eom());
    }
}
