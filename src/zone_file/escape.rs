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

//! Parsing of escape sequences.

use super::{Error, ErrorKind, Parser, Position, Result};

impl Parser<'_> {
    /// Parses an escape sequence (see [RFC 1035 § 5.1] and [RFC 4343 §
    /// 2.1]). This assumes that the caller has already seen and
    /// discarded the leading `\`.
    ///
    /// [RFC 1035 § 5.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-5.1
    /// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
    pub(super) fn parse_escape(&mut self) -> Result<u8> {
        let start_position = self.reader.position();
        match self.reader.read_octet() {
            Some(first) if first.is_ascii_digit() => {
                self.parse_decimal_escape(first, start_position)
            }
            Some(first) => Ok(first),
            None => Err(Error::new(start_position, ErrorKind::EofInEscape)),
        }
    }

    /// Parses a `\DDD` escape after the caller has already read the
    /// first digit (`first`).
    fn parse_decimal_escape(&mut self, first: u8, start_position: Position) -> Result<u8> {
        let mut remaining_two = [0, 0];
        if !self.reader.read(&mut remaining_two) {
            return Err(Error::new(start_position, ErrorKind::EofInEscape));
        }
        if !remaining_two.iter().all(u8::is_ascii_digit) {
            return Err(Error::new(
                start_position,
                ErrorKind::EscapeNeedsThreeDigits,
            ));
        }
        let value = [first, remaining_two[0], remaining_two[1]]
            .iter()
            .fold(0usize, |acc, digit| 10 * acc + (digit - b'0') as usize);
        value
            .try_into()
            .map_err(|_| Error::new(start_position, ErrorKind::EscapeValueOutOfRange))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::tests::make_parser;
    use super::*;

    #[test]
    fn parsing_works_for_digits() {
        assert_eq!(make_parser(b"0234").parse_escape().unwrap(), 23);
    }

    #[test]
    fn parsing_works_for_other_octets() {
        assert_eq!(make_parser(b".23").parse_escape().unwrap(), b'.');
    }

    #[test]
    fn parsing_fails_without_enough_data() {
        for data in [b"".as_slice(), b"0".as_slice(), b"01".as_slice()] {
            assert_eq!(
                make_parser(data).parse_escape().unwrap_err().kind,
                ErrorKind::EofInEscape,
            );
        }
    }

    #[test]
    fn parsing_fails_without_enough_digits() {
        for data in [b"0xx".as_slice(), b"01x".as_slice()] {
            assert_eq!(
                make_parser(data).parse_escape().unwrap_err().kind,
                ErrorKind::EscapeNeedsThreeDigits,
            );
        }
    }

    #[test]
    fn parsing_fails_for_values_out_of_range() {
        assert_eq!(
            make_parser(b"256").parse_escape().unwrap_err().kind,
            ErrorKind::EscapeValueOutOfRange,
        );
    }
}
