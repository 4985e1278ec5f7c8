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

//! Parsing of `<character-string>`s.

use arrayvec::ArrayVec;

use super::{Error, ErrorKind, Parser, Position, Result};

/// A `<character-string>` under construction; at most 255 octets.
type Builder = ArrayVec<u8, 255>;

impl Parser<'_> {
    /// Parses an [RFC 1035 § 3.3] `<character-string>`. Such a string
    /// may be quoted or unquoted ([RFC 1035 § 5.1]). This method
    /// expects the caller to skip to the next field before calling it.
    ///
    /// [RFC 1035 § 3.3]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3
    /// [RFC 1035 § 5.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-5.1
    pub(super) fn parse_character_string(&mut self) -> Result<Box<[u8]>> {
        if self.reader.peek_octet() == Some(b'"') {
            self.parse_quoted_character_string()
        } else {
            self.parse_unquoted_character_string()
        }
    }

    /// Parses a quoted `<character-string>`. The caller is expected to
    /// have seen, but not consumed, the opening `"`.
    fn parse_quoted_character_string(&mut self) -> Result<Box<[u8]>> {
        let start_position = self.reader.position();
        self.reader.read_octet();
        let mut character_string = Builder::new();
        loop {
            let character_position = self.reader.position();
            let octet = match self.reader.read_octet() {
                // The closing quote ends the field even if no
                // field-ending character follows, as in BIND.
                Some(b'"') => break,
                Some(b'\\') => self.parse_escape()?,
                Some(octet) => octet,
                None => {
                    return Err(Error::new(
                        character_position,
                        ErrorKind::EofInQuotedCharacterString,
                    ))
                }
            };
            push(&mut character_string, octet, start_position)?;
        }
        Ok(character_string.as_slice().into())
    }

    /// Parses an unquoted `<character-string>`.
    fn parse_unquoted_character_string(&mut self) -> Result<Box<[u8]>> {
        let start_position = self.reader.position();
        let mut character_string = Builder::new();
        while let Some(octet) = self.reader.read_field_octet() {
            let octet = if octet == b'\\' {
                self.parse_escape()?
            } else {
                octet
            };
            push(&mut character_string, octet, start_position)?;
        }
        Ok(character_string.as_slice().into())
    }
}

fn push(character_string: &mut Builder, octet: u8, start_position: Position) -> Result<()> {
    character_string
        .try_push(octet)
        .map_err(|_| Error::new(start_position, ErrorKind::CharacterStringTooLong))
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
