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

//! Typed record data and its text and wire representations.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::Type;
use crate::name::{self, Name};
use crate::util::Hex;

////////////////////////////////////////////////////////////////////////
// RDATA                                                              //
////////////////////////////////////////////////////////////////////////

/// The data of a resource record.
///
/// The RR types that the server understands are decoded into typed
/// variants. Data of any other type is kept as opaque octets
/// ([`Rdata::Unknown`]) and rendered in the RFC 3597 generic form. An
/// `Rdata` does not carry its RR type; that lives in the enclosing
/// [`Record`](super::Record).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Rdata {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(Name),
    Cname(Name),
    Ptr(Name),
    Mx { preference: u16, exchange: Name },
    Soa(Box<Soa>),
    Txt(Vec<Box<[u8]>>),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: Name,
    },
    Unknown(Box<[u8]>),
}

/// The fields of an SOA record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl Rdata {
    /// Reads the RDATA of a record of type `rr_type` from a DNS
    /// message. The data occupies `rdlength` octets of `message`
    /// starting at `start`; embedded names may be compressed, so the
    /// whole message must be passed.
    pub fn read(
        rr_type: Type,
        message: &[u8],
        start: usize,
        rdlength: u16,
    ) -> Result<Self, ReadRdataError> {
        let end = start + rdlength as usize;
        let octets = message
            .get(start..end)
            .ok_or(ReadRdataError::UnexpectedEom)?;
        let mut cursor = Cursor {
            message,
            index: start,
            end,
        };

        let rdata = match rr_type {
            Type::A => Self::A(Ipv4Addr::from(
                <[u8; 4]>::try_from(octets).or(Err(ReadRdataError::WrongLength))?,
            )),
            Type::AAAA => Self::Aaaa(Ipv6Addr::from(
                <[u8; 16]>::try_from(octets).or(Err(ReadRdataError::WrongLength))?,
            )),
            Type::NS => Self::Ns(cursor.name()?),
            Type::CNAME => Self::Cname(cursor.name()?),
            Type::PTR => Self::Ptr(cursor.name()?),
            Type::MX => Self::Mx {
                preference: cursor.u16()?,
                exchange: cursor.name()?,
            },
            Type::SOA => Self::Soa(Box::new(Soa {
                mname: cursor.name()?,
                rname: cursor.name()?,
                serial: cursor.u32()?,
                refresh: cursor.u32()?,
                retry: cursor.u32()?,
                expire: cursor.u32()?,
                minimum: cursor.u32()?,
            })),
            Type::TXT => {
                let mut strings = Vec::new();
                while cursor.index < end {
                    strings.push(cursor.character_string()?);
                }
                if strings.is_empty() {
                    return Err(ReadRdataError::WrongLength);
                }
                Self::Txt(strings)
            }
            Type::SRV => Self::Srv {
                priority: cursor.u16()?,
                weight: cursor.u16()?,
                port: cursor.u16()?,
                target: cursor.name()?,
            },
            _ => Self::Unknown(octets.into()),
        };

        if cursor.index == start || cursor.index == end {
            Ok(rdata)
        } else {
            Err(ReadRdataError::WrongLength)
        }
    }

    /// Returns the SOA fields if this is SOA data.
    pub fn as_soa(&self) -> Option<&Soa> {
        match self {
            Self::Soa(soa) => Some(soa),
            _ => None,
        }
    }
}

impl fmt::Display for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::A(address) => write!(f, "{address}"),
            Self::Aaaa(address) => write!(f, "{address}"),
            Self::Ns(name) | Self::Cname(name) | Self::Ptr(name) => write!(f, "{name}"),
            Self::Mx {
                preference,
                exchange,
            } => write!(f, "{preference} {exchange}"),
            Self::Soa(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum,
            ),
            Self::Txt(strings) => {
                for (i, string) in strings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    fmt_character_string(string, f)?;
                }
                Ok(())
            }
            Self::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{priority} {weight} {port} {target}"),
            Self::Unknown(octets) => {
                // RFC 3597 § 5
                write!(f, "\\# {}", octets.len())?;
                if !octets.is_empty() {
                    write!(f, " {}", Hex(octets))?;
                }
                Ok(())
            }
        }
    }
}

/// Writes a `<character-string>` in quoted zone file form.
fn fmt_character_string(octets: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str("\"")?;
    for octet in octets {
        match *octet {
            b'"' => f.write_str("\\\"")?,
            b'\\' => f.write_str("\\\\")?,
            b' ' => f.write_str(" ")?,
            o if o.is_ascii_graphic() => write!(f, "{}", o as char)?,
            o => write!(f, "\\{o:03}")?,
        }
    }
    f.write_str("\"")
}

////////////////////////////////////////////////////////////////////////
// READING HELPERS                                                    //
////////////////////////////////////////////////////////////////////////

/// A cursor over the RDATA of a record inside a message.
struct Cursor<'a> {
    message: &'a [u8],
    index: usize,
    end: usize,
}

impl Cursor<'_> {
    fn take(&mut self, len: usize) -> Result<&[u8], ReadRdataError> {
        if self.index + len > self.end {
            return Err(ReadRdataError::UnexpectedEom);
        }
        let octets = &self.message[self.index..self.index + len];
        self.index += len;
        Ok(octets)
    }

    fn u16(&mut self) -> Result<u16, ReadRdataError> {
        let octets = self.take(2)?;
        Ok(u16::from_be_bytes([octets[0], octets[1]]))
    }

    fn u32(&mut self) -> Result<u32, ReadRdataError> {
        let octets = self.take(4)?;
        Ok(u32::from_be_bytes([octets[0], octets[1], octets[2], octets[3]]))
    }

    fn name(&mut self) -> Result<Name, ReadRdataError> {
        let (name, len) = Name::try_from_compressed(self.message, self.index)
            .map_err(ReadRdataError::InvalidName)?;
        if self.index + len > self.end {
            return Err(ReadRdataError::UnexpectedEom);
        }
        self.index += len;
        Ok(name)
    }

    fn character_string(&mut self) -> Result<Box<[u8]>, ReadRdataError> {
        let len = self.take(1)?[0] as usize;
        Ok(self.take(len)?.into())
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that RDATA read from a message is malformed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReadRdataError {
    UnexpectedEom,
    WrongLength,
    InvalidName(name::Error),
}

impl fmt::Display for ReadRdataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedEom => f.write_str("unexpected end of message in RDATA"),
            Self::WrongLength => f.write_str("RDATA length does not match its contents"),
            Self::InvalidName(err) => write!(f, "invalid name in RDATA: {err}"),
        }
    }
}

impl std::error::Error for ReadRdataError {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_compressed_mx() {
        let message = b"\x07example\x04test\x00\x00\x0a\xc0\x00";
        let rdata = Rdata::read(Type::MX, message, 14, 4).unwrap();
        assert_eq!(
            rdata,
            Rdata::Mx {
                preference: 10,
                exchange: "example.test.".parse().unwrap(),
            }
        );
    }

    #[test]
    fn reads_soa() {
        let mut message = b"\x02ns\x00\x05admin\x00".to_vec();
        for field in [2023010101u32, 3600, 600, 86400, 300] {
            message.extend_from_slice(&field.to_be_bytes());
        }
        let rdata = Rdata::read(Type::SOA, &message, 0, message.len() as u16).unwrap();
        let soa = rdata.as_soa().unwrap();
        assert_eq!(soa.serial, 2023010101);
        assert_eq!(soa.minimum, 300);
        assert_eq!(
            rdata.to_string(),
            "ns. admin. 2023010101 3600 600 86400 300"
        );
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert_eq!(
            Rdata::read(Type::A, b"\x01\x02\x03", 0, 3),
            Err(ReadRdataError::WrongLength)
        );
        assert_eq!(
            Rdata::read(Type::NS, b"\x00\x00", 0, 2),
            Err(ReadRdataError::WrongLength)
        );
        assert_eq!(
            Rdata::read(Type::A, b"\x01\x02", 0, 4),
            Err(ReadRdataError::UnexpectedEom)
        );
    }

    #[test]
    fn txt_displays_quoted_and_escaped() {
        let rdata = Rdata::Txt(vec![
            b"hello world".to_vec().into(),
            b"say \"hi\"\x01".to_vec().into(),
        ]);
        assert_eq!(rdata.to_string(), r#""hello world" "say \"hi\"\001""#);
    }

    #[test]
    fn unknown_displays_in_generic_form() {
        let rdata = Rdata::read(Type::from(65280), b"\x0a\xff", 0, 2).unwrap();
        assert_eq!(rdata.to_string(), "\\# 2 0aff");
        assert_eq!(Rdata::Unknown(Box::new([])).to_string(), "\\# 0");
    }
}
