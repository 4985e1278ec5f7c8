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

//! The [`Reader`] structure.
//!
//! See the [`zone_file` module-level documentation](`super`) for
//! implementation details about how the [`Reader`] is used.

use std::str::{self, FromStr};

use super::{Error, ErrorKind, Result};

////////////////////////////////////////////////////////////////////////
// STRUCTURES                                                         //
////////////////////////////////////////////////////////////////////////

/// Performs low-level reading of DNS zone file text held in memory.
///
/// The `Reader` implements the basic operations for reading data and
/// moving between fields and lines, including the processing of
/// comments and of parentheses for line extension. It also knows how
/// to [`recover`](Reader::recover) from a syntax error by discarding
/// the rest of the logical line.
pub(super) struct Reader<'a> {
    input: &'a [u8],
    index: usize,
    in_parens: bool,
    position: Position,
}

/// Records the current human-readable position (line and column) in a
/// zone file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) struct Position {
    pub line: usize,
    pub column: usize,
}

/// Indicates whether certain operations stopped at the next field on
/// a line, or at a line ending.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum FieldOrEol {
    Field,
    Eol,
}

/// The maximum length of a field (in octets) that
/// [`Reader::read_field`] will accept.
const MAX_READ_FIELD_SIZE: usize = 65_536;

impl<'a> Reader<'a> {
    ////////////////////////////////////////////////////////////////////
    // BASICS                                                         //
    ////////////////////////////////////////////////////////////////////

    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            index: 0,
            in_parens: false,
            position: Position { line: 1, column: 1 },
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn at_eof(&self) -> bool {
        self.index >= self.input.len()
    }

    /// Returns the octet `offset` octets past the current position.
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.index + offset).copied()
    }

    /// Returns the next octet without consuming it.
    pub fn peek_octet(&self) -> Option<u8> {
        self.peek_at(0)
    }

    /// Consumes `len` octets that are known to contain no newlines.
    fn advance(&mut self, len: usize) {
        self.index += len;
        self.position.column += len;
    }

    /// Consumes and returns the next octet, which may be a newline.
    pub fn read_octet(&mut self) -> Option<u8> {
        let octet = self.peek_octet()?;
        self.index += 1;
        if octet == b'\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
        Some(octet)
    }

    /// Consumes `into.len()` octets into `into` if that many remain.
    /// The octets are assumed to contain no newlines.
    pub fn read(&mut self, into: &mut [u8]) -> bool {
        match self.input.get(self.index..self.index + into.len()) {
            Some(octets) => {
                into.copy_from_slice(octets);
                self.advance(into.len());
                true
            }
            None => false,
        }
    }

    ////////////////////////////////////////////////////////////////////
    // EOL DETECTION                                                  //
    ////////////////////////////////////////////////////////////////////

    /// Returns the length of the line ending at `offset` (`0` for end
    /// of file, `1` for `\n` and `2` for `\r\n`), or `None` if there is
    /// no line ending there.
    fn eol_at(&self, offset: usize) -> Option<usize> {
        match (self.peek_at(offset), self.peek_at(offset + 1)) {
            (None, _) => Some(0),
            (Some(b'\n'), _) => Some(1),
            (Some(b'\r'), Some(b'\n')) => Some(2),
            _ => None,
        }
    }

    fn consume_eol(&mut self, len: usize) {
        if len > 0 {
            self.index += len;
            self.position.line += 1;
            self.position.column = 1;
        }
    }

    ////////////////////////////////////////////////////////////////////
    // READING OF FIELDS                                              //
    ////////////////////////////////////////////////////////////////////

    fn at_field_end_at(&self, offset: usize) -> bool {
        self.eol_at(offset).is_some() || self.peek_at(offset).map_or(true, ends_field)
    }

    fn at_field_end(&self) -> bool {
        self.at_field_end_at(0)
    }

    fn expect_field_impl(&mut self, field: &[u8], comparison: impl Fn(&[u8], &[u8]) -> bool) -> bool {
        match self.input.get(self.index..self.index + field.len()) {
            Some(peek) if comparison(peek, field) && self.at_field_end_at(field.len()) => {
                self.advance(field.len());
                true
            }
            _ => false,
        }
    }

    /// Checks whether the next field is exactly `field`, consuming it
    /// if so.
    pub fn expect_field(&mut self, field: &[u8]) -> bool {
        self.expect_field_impl(field, <[u8]>::eq)
    }

    /// Checks whether the next field is ASCII-case-insensitively equal
    /// to `field`, consuming it if so.
    pub fn expect_field_case_insensitive(&mut self, field: &[u8]) -> bool {
        self.expect_field_impl(field, <[u8]>::eq_ignore_ascii_case)
    }

    /// Consumes a field and parses it into a `T` through UTF-8. Nothing
    /// is consumed on failure, so a caller can try another type.
    /// `or_else` converts the parse error into an [`ErrorKind`].
    pub fn read_field<T, F>(&mut self, or_else: F) -> Result<T>
    where
        T: FromStr,
        F: FnOnce(T::Err) -> ErrorKind,
    {
        let mut len = 0;
        while !self.at_field_end_at(len) {
            len += 1;
            if len > MAX_READ_FIELD_SIZE {
                return Err(Error::new(self.position, ErrorKind::FieldTooLong));
            }
        }
        let text = str::from_utf8(&self.input[self.index..self.index + len])
            .map_err(|e| Error::new(self.position, ErrorKind::BadUtf8(e)))?;
        match text.parse() {
            Ok(field) => {
                self.advance(len);
                Ok(field)
            }
            Err(e) => Err(Error::new(self.position, or_else(e))),
        }
    }

    /// Consumes and returns the next octet of the current field, or
    /// returns `None` at the end of the field.
    pub fn read_field_octet(&mut self) -> Option<u8> {
        if self.at_field_end() {
            None
        } else {
            let octet = self.peek_octet();
            self.advance(1);
            octet
        }
    }

    ////////////////////////////////////////////////////////////////////
    // "NAVIGATION" AMONG FIELDS AND LINES                            //
    ////////////////////////////////////////////////////////////////////

    /// Consumes spaces and tabs. Returns whether any were consumed.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.index;
        while self.peek_octet().map_or(false, is_whitespace) {
            self.advance(1);
        }
        self.index != start
    }

    /// Consumes data up to, but not including, the next line ending.
    fn skip_to_eol(&mut self) {
        while self.eol_at(0).is_none() {
            self.advance(1);
        }
    }

    fn field_or_eol_skipping_impl(&mut self, through_eol: bool) -> Result<FieldOrEol> {
        loop {
            self.skip_whitespace();
            if let Some(eol_len) = self.eol_at(0) {
                if self.in_parens {
                    if eol_len == 0 {
                        return Err(Error::new(self.position, ErrorKind::EofBeforeCloseParen));
                    }
                    self.consume_eol(eol_len);
                } else {
                    if through_eol {
                        self.consume_eol(eol_len);
                    }
                    return Ok(FieldOrEol::Eol);
                }
                continue;
            }

            // Not at EOL, so there is at least one more octet.
            match self.peek_octet() {
                Some(b';') => {
                    self.skip_to_eol();
                    if !self.in_parens {
                        if let (true, Some(eol_len)) = (through_eol, self.eol_at(0)) {
                            self.consume_eol(eol_len);
                        }
                        return Ok(FieldOrEol::Eol);
                    }
                }
                Some(b'(') => {
                    if self.in_parens {
                        return Err(Error::new(self.position, ErrorKind::NestedParens));
                    }
                    self.in_parens = true;
                    self.advance(1);
                }
                Some(b')') => {
                    if !self.in_parens {
                        return Err(Error::new(self.position, ErrorKind::UnmatchedCloseParen));
                    }
                    self.in_parens = false;
                    self.advance(1);
                }
                _ => return Ok(FieldOrEol::Field),
            }
        }
    }

    /// Consumes data until the next field or through the next line
    /// ending, whichever comes first. Line endings inside parentheses
    /// are not considered.
    pub fn skip_to_next_field_or_through_eol(&mut self) -> Result<FieldOrEol> {
        self.field_or_eol_skipping_impl(true)
    }

    /// Like [`Reader::skip_to_next_field_or_through_eol`], except that
    /// a line ending is left unconsumed.
    pub fn skip_to_next_field_or_to_eol(&mut self) -> Result<FieldOrEol> {
        self.field_or_eol_skipping_impl(false)
    }

    /// Consumes data until the next field on the same logical line. If
    /// the line ends first, an error of kind `error_on_eol` is raised.
    pub fn skip_to_next_field(&mut self, error_on_eol: ErrorKind) -> Result<()> {
        if self.skip_to_next_field_or_to_eol()? == FieldOrEol::Field {
            Ok(())
        } else {
            Err(Error::new(self.position, error_on_eol))
        }
    }

    /// Skips through the end of the logical line, failing with
    /// [`ErrorKind::ExpectedEol`] if another field comes first.
    pub fn expect_eol(&mut self) -> Result<()> {
        if self.skip_to_next_field_or_through_eol()? == FieldOrEol::Eol {
            Ok(())
        } else {
            Err(Error::new(self.position, ErrorKind::ExpectedEol))
        }
    }

    ////////////////////////////////////////////////////////////////////
    // ERROR RECOVERY                                                 //
    ////////////////////////////////////////////////////////////////////

    /// Discards the rest of the current logical line, including any
    /// physical lines it spans through parentheses, so that parsing
    /// can resume with the next one. Comments are honored, and
    /// parentheses and semicolons inside quotes are ignored. A quote
    /// never extends past a physical line here.
    pub fn recover(&mut self) {
        let mut quoted = false;
        loop {
            match self.eol_at(0) {
                Some(0) => break,
                Some(eol_len) => {
                    self.consume_eol(eol_len);
                    quoted = false;
                    if !self.in_parens {
                        break;
                    }
                    continue;
                }
                None => (),
            }
            match self.peek_octet() {
                Some(b'\\') => {
                    self.advance(1);
                    if self.eol_at(0).is_none() {
                        self.advance(1);
                    }
                }
                Some(b'"') => {
                    quoted = !quoted;
                    self.advance(1);
                }
                Some(b';') if !quoted => self.skip_to_eol(),
                Some(b'(') if !quoted => {
                    self.in_parens = true;
                    self.advance(1);
                }
                Some(b')') if !quoted => {
                    self.in_parens = false;
                    self.advance(1);
                }
                _ => self.advance(1),
            }
        }
        self.in_parens = false;
    }
}

/// Returns whether `c` is considered whitespace in a zone file.
fn is_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// Returns whether `c` ends a field in a zone file.
fn ends_field(c: u8) -> bool {
    is_whitespace(c) || c == b'(' || c == b')' || c == b';'
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
