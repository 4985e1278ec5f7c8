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

//! Implementation of the [`Writer`] type to serialize DNS messages.

use std::collections::HashMap;
use std::fmt;

use super::constants::*;
use super::{Opcode, Question, Rcode};
use crate::name::Name;
use crate::rr::{Rdata, Record};

////////////////////////////////////////////////////////////////////////
// WRITER                                                             //
////////////////////////////////////////////////////////////////////////

/// Serializes a DNS message into a buffer of bounded size.
///
/// A new `Writer` holds a zeroed header. Header fields are set with the
/// `set_*` methods at any time, while the question and answer records
/// are appended in order with [`Writer::add_question`] and
/// [`Writer::add_answer`]. Names are compressed against names already
/// in the message where RFC 3597 § 4 permits.
///
/// If an addition would take the message past its size limit, it fails
/// with [`Error::Truncation`] and the message is left exactly as it was
/// before the call, so the caller can still finish what has been
/// written so far.
pub struct Writer {
    octets: Vec<u8>,
    limit: usize,
    compression: HashMap<Name, u16>,
}

impl Writer {
    /// Creates a new `Writer` whose message may not grow beyond `limit`
    /// octets. The limit is raised to the header size if necessary.
    pub fn new(limit: usize) -> Self {
        Self {
            octets: vec![0; HEADER_SIZE],
            limit: limit.max(HEADER_SIZE),
            compression: HashMap::new(),
        }
    }

    /// Returns the current length of the message.
    pub fn len(&self) -> usize {
        self.octets.len()
    }

    /// Returns whether no question or record has been written yet.
    pub fn is_empty(&self) -> bool {
        self.octets.len() == HEADER_SIZE
    }

    pub fn set_id(&mut self, id: u16) {
        self.octets[ID_START..ID_START + 2].copy_from_slice(&id.to_be_bytes());
    }

    pub fn set_qr(&mut self, qr: bool) {
        self.set_flag(FLAGS_HI, QR_MASK, qr);
    }

    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.octets[FLAGS_HI] &= !OPCODE_MASK;
        self.octets[FLAGS_HI] |= u8::from(opcode) << OPCODE_SHIFT;
    }

    pub fn set_aa(&mut self, aa: bool) {
        self.set_flag(FLAGS_HI, AA_MASK, aa);
    }

    pub fn set_tc(&mut self, tc: bool) {
        self.set_flag(FLAGS_HI, TC_MASK, tc);
    }

    pub fn set_rd(&mut self, rd: bool) {
        self.set_flag(FLAGS_HI, RD_MASK, rd);
    }

    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.octets[FLAGS_LO] &= !RCODE_MASK;
        self.octets[FLAGS_LO] |= u8::from(rcode);
    }

    fn set_flag(&mut self, byte: usize, mask: u8, value: bool) {
        if value {
            self.octets[byte] |= mask;
        } else {
            self.octets[byte] &= !mask;
        }
    }

    pub fn qdcount(&self) -> u16 {
        self.header_u16(QDCOUNT_START)
    }

    pub fn ancount(&self) -> u16 {
        self.header_u16(ANCOUNT_START)
    }

    fn header_u16(&self, start: usize) -> u16 {
        u16::from_be_bytes([self.octets[start], self.octets[start + 1]])
    }

    fn increment_count(&mut self, start: usize) {
        let count = self.header_u16(start).wrapping_add(1);
        self.octets[start..start + 2].copy_from_slice(&count.to_be_bytes());
    }

    /// Adds a question to the message. Questions must be added before
    /// any answers.
    pub fn add_question(&mut self, question: &Question) -> Result<()> {
        if self.ancount() > 0 {
            return Err(Error::OutOfOrder);
        }
        self.atomically(|writer, added| {
            writer.write_name(&question.qname, true, added)?;
            writer.push(&u16::from(question.qtype).to_be_bytes())?;
            writer.push(&u16::from(question.qclass).to_be_bytes())
        })?;
        self.increment_count(QDCOUNT_START);
        Ok(())
    }

    /// Adds a record to the answer section.
    pub fn add_answer(&mut self, record: &Record) -> Result<()> {
        self.atomically(|writer, added| writer.write_record(record, added))?;
        self.increment_count(ANCOUNT_START);
        Ok(())
    }

    /// Finishes the message and returns its octets.
    pub fn finish(self) -> Vec<u8> {
        self.octets
    }

    /// Runs `write`, undoing everything it wrote (including entries in
    /// the compression table) if it fails.
    fn atomically<F>(&mut self, write: F) -> Result<()>
    where
        F: FnOnce(&mut Self, &mut Vec<Name>) -> Result<()>,
    {
        let start = self.octets.len();
        let mut added = Vec::new();
        let result = write(self, &mut added);
        if result.is_err() {
            self.octets.truncate(start);
            for name in added {
                self.compression.remove(&name);
            }
        }
        result
    }

    fn push(&mut self, octets: &[u8]) -> Result<()> {
        if self.octets.len() + octets.len() > self.limit {
            Err(Error::Truncation)
        } else {
            self.octets.extend_from_slice(octets);
            Ok(())
        }
    }

    fn write_record(&mut self, record: &Record, added: &mut Vec<Name>) -> Result<()> {
        self.write_name(&record.owner, true, added)?;
        self.push(&u16::from(record.rr_type).to_be_bytes())?;
        self.push(&u16::from(record.class).to_be_bytes())?;
        self.push(&u32::from(record.ttl).to_be_bytes())?;
        let rdlength_index = self.octets.len();
        self.push(&[0, 0])?;
        self.write_rdata(&record.rdata, added)?;
        let rdlength = u16::try_from(self.octets.len() - rdlength_index - 2)
            .or(Err(Error::RdataTooLong))?;
        self.octets[rdlength_index..rdlength_index + 2].copy_from_slice(&rdlength.to_be_bytes());
        Ok(())
    }

    fn write_rdata(&mut self, rdata: &Rdata, added: &mut Vec<Name>) -> Result<()> {
        match rdata {
            Rdata::A(address) => self.push(&address.octets()),
            Rdata::Aaaa(address) => self.push(&address.octets()),
            Rdata::Ns(name) | Rdata::Cname(name) | Rdata::Ptr(name) => {
                self.write_name(name, true, added)
            }
            Rdata::Mx {
                preference,
                exchange,
            } => {
                self.push(&preference.to_be_bytes())?;
                self.write_name(exchange, true, added)
            }
            Rdata::Soa(soa) => {
                self.write_name(&soa.mname, true, added)?;
                self.write_name(&soa.rname, true, added)?;
                for field in [soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum] {
                    self.push(&field.to_be_bytes())?;
                }
                Ok(())
            }
            Rdata::Txt(strings) => {
                for string in strings {
                    let len = u8::try_from(string.len()).or(Err(Error::RdataTooLong))?;
                    self.push(&[len])?;
                    self.push(string)?;
                }
                Ok(())
            }
            Rdata::Srv {
                priority,
                weight,
                port,
                target,
            } => {
                self.push(&priority.to_be_bytes())?;
                self.push(&weight.to_be_bytes())?;
                self.push(&port.to_be_bytes())?;
                // RFC 2782 forbids compressing the target.
                self.write_name(target, false, added)
            }
            Rdata::Unknown(octets) => self.push(octets),
        }
    }

    /// Writes `name`, replacing its longest suffix already present in
    /// the message with a pointer if `compress` is set. Every suffix
    /// written out in full becomes available as a pointer target.
    fn write_name(&mut self, name: &Name, compress: bool, added: &mut Vec<Name>) -> Result<()> {
        let wire = name.wire_repr();
        let mut offset = 0;
        let mut skip = 0;
        while let Some(suffix) = name.superdomain(skip).filter(|s| !s.is_root()) {
            if compress {
                if let Some(pointer) = self.compression.get(&suffix) {
                    return self.push(&(0xc000 | *pointer).to_be_bytes());
                }
            }
            let here = self.octets.len();
            if here <= POINTER_MAX && !self.compression.contains_key(&suffix) {
                self.compression.insert(suffix.clone(), here as u16);
                added.push(suffix);
            }
            let len = wire[offset] as usize;
            self.push(&wire[offset..offset + len + 1])?;
            offset += len + 1;
            skip += 1;
        }
        self.push(&[0])
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Writer")
            .field("len", &self.octets.len())
            .field("limit", &self.limit)
            .field("qdcount", &self.qdcount())
            .field("ancount", &self.ancount())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that data could not be added to a message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    /// The message would exceed its size limit.
    Truncation,

    /// A question was added after an answer.
    OutOfOrder,

    /// The RDATA (or a `<character-string>` within it) is too long to
    /// be encoded.
    RdataTooLong,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Truncation => f.write_str("message size limit exceeded"),
            Self::OutOfOrder => f.write_str("question added after answers"),
            Self::RdataTooLong => f.write_str("RDATA is too long"),
        }
    }
}

impl std::error::Error for Error {}

/// The type returned by fallible [`Writer`] methods.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::message::{Qtype, Reader};
    use crate::rr::{Ttl, Type};

    fn question() -> Question {
        Question {
            qname: "example.test.".parse().unwrap(),
            qtype: Type::MX.into(),
            qclass: Class::IN.into(),
        }
    }

    fn mx(preference: u16, exchange: &str) -> Record {
        Record {
            owner: "example.test.".parse().unwrap(),
            rr_type: Type::MX,
            class: Class::IN,
            ttl: Ttl::from(300),
            rdata: Rdata::Mx {
                preference,
                exchange: exchange.parse().unwrap(),
            },
        }
    }

    #[test]
    fn sets_header_fields() {
        let mut writer = Writer::new(512);
        writer.set_id(0xbeef);
        writer.set_qr(true);
        writer.set_opcode(Opcode::Notify);
        writer.set_aa(true);
        writer.set_rd(true);
        writer.set_rcode(Rcode::ServFail);
        let octets = writer.finish();
        let reader = Reader::try_from(octets.as_slice()).unwrap();
        assert_eq!(reader.id(), 0xbeef);
        assert!(reader.qr());
        assert!(reader.aa());
        assert!(!reader.tc());
        assert!(reader.rd());
        assert_eq!(reader.opcode(), Opcode::Notify);
        assert_eq!(reader.rcode(), Rcode::ServFail);
    }

    #[test]
    fn compresses_names() {
        let mut writer = Writer::new(512);
        writer.add_question(&question()).unwrap();
        writer.add_answer(&mx(10, "mail.example.test.")).unwrap();
        let octets = writer.finish();

        // Header, the question (14 + 4 octets), then the answer: a
        // pointer for the owner, 10 octets of fixed fields, the
        // preference, and "mail" followed by a pointer.
        assert_eq!(octets.len(), 12 + 18 + 2 + 10 + 2 + 5 + 2);
        assert_eq!(&octets[30..32], b"\xc0\x0c");

        let mut reader = Reader::try_from(octets.as_slice()).unwrap();
        assert_eq!(reader.read_question().unwrap(), question());
        assert_eq!(reader.read_rr().unwrap(), mx(10, "mail.example.test."));
        assert!(reader.at_eom());
    }

    #[test]
    fn truncation_rolls_back() {
        let mut writer = Writer::new(70);
        writer.add_question(&question()).unwrap();
        writer.add_answer(&mx(10, "mail.example.test.")).unwrap();
        let len = writer.len();
        assert_eq!(
            writer.add_answer(&mx(20, "a-much-longer-exchange-name.example.test.")),
            Err(Error::Truncation)
        );
        assert_eq!(writer.len(), len);
        assert_eq!(writer.ancount(), 1);

        // A name from the failed record must not be used as a pointer
        // target, since it was never actually written.
        writer.add_answer(&mx(30, "mail.example.test.")).unwrap();
        let octets = writer.finish();
        let mut reader = Reader::try_from(octets.as_slice()).unwrap();
        reader.read_question().unwrap();
        reader.read_rr().unwrap();
        assert_eq!(reader.read_rr().unwrap(), mx(30, "mail.example.test."));
    }

    #[test]
    fn rejects_questions_after_answers() {
        let mut writer = Writer::new(512);
        writer.add_answer(&mx(10, "mail.example.test.")).unwrap();
        assert_eq!(writer.add_question(&question()), Err(Error::OutOfOrder));
        assert_eq!(writer.qdcount(), 0);
    }

    #[test]
    fn transfer_qtype_round_trips() {
        let mut writer = Writer::new(512);
        let axfr = Question {
            qtype: Qtype::AXFR,
            ..question()
        };
        writer.add_question(&axfr).unwrap();
        let octets = writer.finish();
        let mut reader = Reader::try_from(octets.as_slice()).unwrap();
        assert_eq!(reader.read_question().unwrap().qtype, Qtype::AXFR);
    }
}
