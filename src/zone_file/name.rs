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

//! Parsing of domain names.

use super::{Error, ErrorKind, Parser, Position, Result};
use crate::name::{self, Name, NameBuilder};

impl Parser<'_> {
    /// Tries to parse a domain name, including support for the `@`
    /// shorthand for the current origin. The Reader should be advanced
    /// to the next field before calling this method; if it immediately
    /// encounters a field-ending character, it will return the root
    /// name `.`, which is probably not what you want.
    pub(super) fn parse_name(&mut self) -> Result<Name> {
        let start_position = self.reader.position();
        if self.reader.expect_field(b"@") {
            self.context
                .origin
                .clone()
                .ok_or_else(|| Error::new(start_position, ErrorKind::AtWhenOriginNotSet))
        } else if self.reader.expect_field(b".") {
            Ok(Name::root())
        } else {
            self.parse_non_root_name()
        }
    }

    /// Internal helper to parse a domain name other than `@` and `.`.
    /// A relative name is completed using the current origin.
    fn parse_non_root_name(&mut self) -> Result<Name> {
        let name_start_position = self.reader.position();
        let mut label_start_position = name_start_position;
        let mut name_builder = NameBuilder::new();

        while let Some(octet) = self.reader.read_field_octet() {
            let pushed = match octet {
                b'\\' => {
                    let escaped_octet = self.parse_escape()?;
                    name_builder.try_push(escaped_octet)
                }
                b'.' => {
                    let result = name_builder.next_label();
                    label_start_position = self.reader.position();
                    result
                }
                _ => name_builder.try_push(octet),
            };
            pushed.map_err(|e| {
                build_label_parse_error(e, name_start_position, label_start_position)
            })?;
        }

        let finished = if name_builder.is_fully_qualified() {
            name_builder.finish()
        } else if let Some(origin) = self.context.origin.as_ref() {
            name_builder.finish_with_suffix(origin)
        } else {
            return Err(Error::new(
                name_start_position,
                ErrorKind::PqdnWhenOriginNotSet,
            ));
        };
        finished.map_err(|e| Error::new(name_start_position, ErrorKind::InvalidName(e)))
    }
}

/// Generates a parse error from a [`name::Error`], pointing at the
/// current label for label-level problems and at the whole name
/// otherwise.
fn build_label_parse_error(
    error: name::Error,
    name_start_position: Position,
    label_start_position: Position,
) -> Error {
    if error == name::Error::LabelTooLong {
        Error::new(label_start_position, ErrorKind::InvalidLabel(error))
    } else {
        Error::new(name_start_position, ErrorKind::InvalidName(error))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::tests::make_parser;
    use super::*;

    fn name(text: &str) -> Name {
        text.parse().unwrap()
    }

    #[test]
    fn parsing_works() {
        assert_eq!(
            make_parser(b"example.test. extra data").parse_name().unwrap(),
            name("example.test."),
        );
    }

    #[test]
    fn escaping_works() {
        assert_eq!(
            make_parser(b"test\\.with.a.dot.").parse_name().unwrap(),
            name("test\\.with.a.dot."),
        );
        assert_eq!(
            make_parser(b"test\\000with.a.null.").parse_name().unwrap(),
            name("test\\000with.a.null."),
        );
    }

    #[test]
    fn parsing_pqdns_with_origin_set_works() {
        let mut parser = make_parser(b"www");
        parser.context.origin = Some(name("example.test."));
        assert_eq!(parser.parse_name().unwrap(), name("www.example.test."));
    }

    #[test]
    fn parser_rejects_pqdn_without_origin_set() {
        assert_eq!(
            make_parser(b"pqdn").parse_name().unwrap_err().kind,
            ErrorKind::PqdnWhenOriginNotSet,
        );
    }

    #[test]
    fn parsing_at_shorthand_with_origin_set_works() {
        let mut parser = make_parser(b"@ extra data");
        parser.context.origin = Some(name("example.test."));
        assert_eq!(parser.parse_name().unwrap(), name("example.test."));
    }

    #[test]
    fn parser_rejects_at_shorthand_without_origin_set() {
        assert_eq!(
            make_parser(b"@").parse_name().unwrap_err().kind,
            ErrorKind::AtWhenOriginNotSet,
        );
    }

    #[test]
    fn parsing_root_works() {
        assert_eq!(make_parser(b". extra data").parse_name().unwrap(), Name::root());
    }

    #[test]
    fn long_labels_are_reported_at_the_label() {
        let mut text = b"ok.".to_vec();
        text.extend_from_slice(&[b'x'; 64]);
        text.push(b'.');
        let error = make_parser(&text).parse_name().unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidLabel(name::Error::LabelTooLong));
        assert_eq!(error.column(), 4);
    }
}
