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

//! The [`Error`] type for names that could not be built.

use std::fmt;

/// Why a [`Name`](super::Name) could not be built from text or read
/// from a message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    // Limits from RFC 1035 § 2.3.4, which apply however a name is
    // built.
    LabelTooLong,
    NameTooLong,
    NonNullTerminal,
    NullNonTerminal,

    // Problems with text.
    InvalidEscape,
    StrEmpty,
    StrNotAscii,

    // Problems with (possibly compressed) wire data.
    InvalidPointer,
    UnexpectedEom,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            Self::LabelTooLong => "a label exceeds 63 octets",
            Self::NameTooLong => "the name exceeds 255 octets",
            Self::NonNullTerminal => "the name does not end with the root label",
            Self::NullNonTerminal => "an empty label appears before the end of the name",
            Self::InvalidEscape => "bad escape sequence",
            Self::StrEmpty => "the name is empty",
            Self::StrNotAscii => "the name contains non-ASCII characters",
            Self::InvalidPointer => "bad compression pointer",
            Self::UnexpectedEom => "the message ends inside the name",
        };
        f.write_str(text)
    }
}

impl std::error::Error for Error {}
