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

//! Parsing of zone file `$`-directives.

use super::{Error, ErrorKind, Parser, Result};

impl Parser<'_> {
    /// Parses a zone file directive. This expects that the caller
    /// has already detected, but not consumed, the leading `$`. When
    /// successful, this method reads through the end of the line.
    pub(super) fn parse_directive(&mut self) -> Result<()> {
        if self.reader.expect_field_case_insensitive(b"$ORIGIN") {
            self.parse_origin_directive()
        } else if self.reader.expect_field_case_insensitive(b"$TTL") {
            self.parse_ttl_directive()
        } else if self.reader.expect_field_case_insensitive(b"$INCLUDE") {
            Err(Error::new(
                self.reader.position(),
                ErrorKind::IncludeNotSupported,
            ))
        } else {
            Err(Error::new(
                self.reader.position(),
                ErrorKind::UnknownDirective,
            ))
        }
    }

    // As with RDATA parsing, the skip to the next field is performed
    // by these subroutines so that they can choose the error message.

    /// Parses an `$ORIGIN` directive.
    fn parse_origin_directive(&mut self) -> Result<()> {
        self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
        let name = self.parse_name()?;
        self.reader.expect_eol()?;
        self.context.origin = Some(name);
        Ok(())
    }

    /// Parses a `$TTL` directive.
    fn parse_ttl_directive(&mut self) -> Result<()> {
        self.reader.skip_to_next_field(ErrorKind::ExpectedTtl)?;
        let ttl: u32 = self.reader.read_field(ErrorKind::InvalidTtl)?;
        self.reader.expect_eol()?;
        self.context.default_ttl = Some(ttl.into());
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use crate::name::Name;

    use super::super::tests::make_parser;
    use super::*;

    #[test]
    fn parsing_origin_directive_works() {
        let mut parser = make_parser(b"$ORIGIN test.");
        assert!(parser.context.origin.is_none());
        parser.parse_directive().unwrap();
        assert_eq!(
            parser.context.origin.unwrap(),
            "test.".parse::<Name>().unwrap()
        );
    }

    #[test]
    fn relative_origin_is_completed_by_previous_origin() {
        let mut parser = make_parser(b"$ORIGIN test.\n$origin sub\n");
        parser.parse_directive().unwrap();
        parser.parse_directive().unwrap();
        assert_eq!(
            parser.context.origin.unwrap(),
            "sub.test.".parse::<Name>().unwrap()
        );
    }

    #[test]
    fn parsing_ttl_directive_works() {
        let mut parser = make_parser(b"$TTL 3600 ; one hour");
        assert!(parser.default_ttl().is_none());
        parser.parse_directive().unwrap();
        assert_eq!(parser.default_ttl(), Some(3600.into()));
    }

    #[test]
    fn include_is_not_supported() {
        assert_eq!(
            make_parser(b"$INCLUDE /path/to/file.zone")
                .parse_directive()
                .unwrap_err()
                .kind,
            ErrorKind::IncludeNotSupported,
        );
    }

    #[test]
    fn parser_handles_unknown_directives() {
        assert_eq!(
            make_parser(b"$FROBNICATE 123").parse_directive().unwrap_err().kind,
            ErrorKind::UnknownDirective,
        );
    }

    #[test]
    fn ttl_directive_needs_a_value() {
        assert_eq!(
            make_parser(b"$TTL\n").parse_directive().unwrap_err().kind,
            ErrorKind::ExpectedTtl,
        );
    }
}
