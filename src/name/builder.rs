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

//! Implementation of the [`NameBuilder`] structure.

use arrayvec::ArrayVec;

use super::{Error, Name, MAX_LABEL_LEN, MAX_WIRE_LEN};

/// A facility to build [`Name`]s one octet or label at a time.
///
/// The builder accumulates the on-the-wire representation in a
/// fixed-size buffer long enough for any valid name, so reading names
/// out of a zone file needs only one heap allocation per name.
///
/// A new `NameBuilder` starts with a single null label. If the build is
/// finished at this point, the name of the DNS root is constructed:
///
/// ```
/// use udns::name::{Name, NameBuilder};
/// assert_eq!(NameBuilder::new().finish().unwrap(), Name::root());
/// ```
///
/// Octets are added to the current label with
/// [`NameBuilder::try_push`] and [`NameBuilder::try_push_slice`]; a new
/// label is started with [`NameBuilder::next_label`]. Any call that
/// would produce an invalid domain name fails and leaves the builder
/// unchanged. The name is completed with [`NameBuilder::finish`], or
/// with [`NameBuilder::finish_with_suffix`] to make it a subdomain of
/// another name (such as the current origin of a zone file).
pub struct NameBuilder {
    wire_repr: ArrayVec<u8, MAX_WIRE_LEN>,
    label_start: usize,
    label_len: u8,
}

impl NameBuilder {
    /// Constructs a new `NameBuilder`, which initially contains a
    /// single null label.
    pub fn new() -> Self {
        let mut wire_repr = ArrayVec::new();
        wire_repr.push(0);
        Self {
            wire_repr,
            label_start: 0,
            label_len: 0,
        }
    }

    /// Determines whether the name currently stored in the
    /// `NameBuilder` ends with the null label.
    pub fn is_fully_qualified(&self) -> bool {
        self.label_len == 0
    }

    /// Tries to add the given octet to the current label.
    pub fn try_push(&mut self, octet: u8) -> Result<(), Error> {
        if self.label_len >= (MAX_LABEL_LEN as u8) {
            Err(Error::LabelTooLong)
        } else if self.wire_repr.try_push(octet).is_ok() {
            self.label_len += 1;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    /// Tries to add the given slice to the current label.
    pub fn try_push_slice(&mut self, octets: &[u8]) -> Result<(), Error> {
        if (self.label_len as usize) + octets.len() > MAX_LABEL_LEN {
            Err(Error::LabelTooLong)
        } else if self.wire_repr.try_extend_from_slice(octets).is_ok() {
            self.label_len += octets.len() as u8;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    fn update_label_len(&mut self) {
        self.wire_repr[self.label_start] = self.label_len;
    }

    /// Finishes the current label and starts a new one. Only the last
    /// label of a name may be null, so this fails if the current label
    /// is empty.
    pub fn next_label(&mut self) -> Result<(), Error> {
        if self.is_fully_qualified() {
            Err(Error::NullNonTerminal)
        } else if self.wire_repr.is_full() {
            Err(Error::NameTooLong)
        } else {
            self.update_label_len();
            self.label_start = self.wire_repr.len();
            self.label_len = 0;
            self.wire_repr.push(0);
            Ok(())
        }
    }

    /// Finishes the construction of the domain name. Since the last
    /// label of a domain name must be null, this fails if the current
    /// label is not empty.
    pub fn finish(self) -> Result<Name, Error> {
        if self.is_fully_qualified() {
            Ok(Name::from_valid_wire(&self.wire_repr))
        } else {
            Err(Error::NonNullTerminal)
        }
    }

    /// Finishes the current label and then appends the labels of
    /// `suffix`, making the result a subdomain of `suffix`.
    pub fn finish_with_suffix(mut self, suffix: &Name) -> Result<Name, Error> {
        if self.is_fully_qualified() {
            Err(Error::NullNonTerminal)
        } else {
            self.update_label_len();
            self.wire_repr
                .try_extend_from_slice(suffix.wire_repr())
                .or(Err(Error::NameTooLong))?;
            Ok(Name::from_valid_wire(&self.wire_repr))
        }
    }
}

impl Default for NameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namebuilder_works() {
        let mut builder = NameBuilder::new();
        builder.try_push_slice(b"exam").unwrap();
        for c in b"ple" {
            builder.try_push(*c).unwrap();
        }
        builder.next_label().unwrap();
        builder.try_push_slice(b"test").unwrap();
        builder.next_label().unwrap();
        assert_eq!(builder.finish().unwrap(), "example.test.".parse().unwrap());
    }

    #[test]
    fn namebuilder_works_with_suffix() {
        let mut builder = NameBuilder::new();
        let suffix: Name = "test.".parse().unwrap();
        builder.try_push_slice(b"example").unwrap();
        let name = builder.finish_with_suffix(&suffix).unwrap();
        assert_eq!(name, "example.test.".parse().unwrap());
    }

    #[test]
    fn finish_rejects_non_fqdn() {
        let mut builder = NameBuilder::new();
        builder.try_push(b'x').unwrap();
        assert_eq!(builder.finish(), Err(Error::NonNullTerminal));
    }

    #[test]
    fn finish_with_suffix_rejects_fqdn() {
        let mut builder = NameBuilder::new();
        builder.try_push(b'x').unwrap();
        builder.next_label().unwrap();
        assert_eq!(
            builder.finish_with_suffix(&Name::root()),
            Err(Error::NullNonTerminal)
        );
    }

    #[test]
    fn try_push_rejects_long_label() {
        let mut builder = NameBuilder::new();
        for _ in 0..MAX_LABEL_LEN {
            builder.try_push(b'x').unwrap();
        }
        assert_eq!(builder.try_push(b'x'), Err(Error::LabelTooLong));
    }

    #[test]
    fn try_push_slice_rejects_long_name() {
        let mut builder = NameBuilder::new();
        for _ in 0..MAX_WIRE_LEN / 4 {
            builder.try_push_slice(b"xxx").unwrap();
            builder.next_label().unwrap();
        }
        assert_eq!(builder.try_push_slice(b"xxx"), Err(Error::NameTooLong));
    }

    #[test]
    fn finish_with_suffix_rejects_long_name() {
        let suffix: Name = [
            "x".repeat(63),
            "x".repeat(63),
            "x".repeat(63),
            "x".repeat(60),
            String::new(),
        ]
        .join(".")
        .parse()
        .unwrap();
        let mut builder = NameBuilder::new();
        builder.try_push(b'x').unwrap();
        assert_eq!(builder.finish_with_suffix(&suffix), Err(Error::NameTooLong));
    }
}
