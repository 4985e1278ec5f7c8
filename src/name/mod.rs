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

//! Implementation of data structures related to domain names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::str::FromStr;

use arrayvec::ArrayVec;

mod builder;
mod error;
mod wire;
pub use builder::NameBuilder;
pub use error::Error;

/// The maximum number of labels in a domain name.
const MAX_N_LABELS: usize = 128;

/// The maximum length of the uncompressed on-the-wire representation of
/// a domain name.
const MAX_WIRE_LEN: usize = 255;

/// The maximum length of a label in a domain name (not including the
/// octet that provides the length).
const MAX_LABEL_LEN: usize = 63;

////////////////////////////////////////////////////////////////////////
// NAME STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// A fully qualified domain name.
///
/// A `Name` owns the uncompressed on-the-wire representation of the
/// name, as defined in [RFC 1035 § 3.1]. Every `Name` in existence is
/// valid: it ends with the null label, no label is longer than 63
/// octets, and the whole representation is at most 255 octets long.
///
/// `Name`s can be constructed
///
/// * through the [`FromStr`] implementation;
/// * through a [`NameBuilder`]; and
/// * from compressed on-the-wire names through
///   [`Name::try_from_compressed`].
///
/// Comparison and hashing are ASCII-case-insensitive, in accordance
/// with RFC 1034 § 3.1 (clarified by RFC 4343). This lets `Name`s
/// serve directly as keys for record lookups.
///
/// [RFC 1035 § 3.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.1
#[derive(Clone)]
pub struct Name {
    wire: Box<[u8]>,
}

#[allow(clippy::len_without_is_empty)] // A domain name is never empty!
impl Name {
    /// Wraps an on-the-wire representation that the caller has already
    /// validated.
    fn from_valid_wire(wire: &[u8]) -> Self {
        Self { wire: wire.into() }
    }

    /// Returns a `Name` representing the DNS root, `.`.
    pub fn root() -> Self {
        Self::from_valid_wire(&[0])
    }

    /// Returns whether the `Name` is the DNS root `.`.
    pub fn is_root(&self) -> bool {
        self.wire.len() == 1
    }

    /// Returns whether this `Name` is equal to or a subdomain of
    /// `other`.
    pub fn eq_or_subdomain_of(&self, other: &Name) -> bool {
        self.len() >= other.len()
            && self
                .labels()
                .rev()
                .zip(other.labels().rev())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Returns an iterator over the labels in this `Name`, including the
    /// terminal null label.
    pub fn labels(&self) -> Labels {
        Labels::new(self)
    }

    /// Returns the number of labels in this `Name`, including the
    /// terminal null label.
    pub fn len(&self) -> usize {
        self.labels().len()
    }

    /// Returns the superdomain obtained by skipping the first `skip`
    /// labels of the `Name`, or `None` if there aren't enough labels.
    pub fn superdomain(&self, skip: usize) -> Option<Name> {
        let mut offset = 0;
        for _ in 0..skip {
            let len = self.wire[offset] as usize;
            if len == 0 {
                return None;
            }
            offset += len + 1;
        }
        Some(Self::from_valid_wire(&self.wire[offset..]))
    }

    /// Tries to parse a compressed name present at index `start` of the
    /// provided buffer. Pointers are followed; indices given in
    /// pointers are treated as equivalent to indices in `octets` (so
    /// generally one will pass an entire DNS message in `octets`). On
    /// success, the new `Name` is returned along with the number of
    /// contiguous octets read at `start`.
    pub fn try_from_compressed(octets: &[u8], start: usize) -> Result<(Self, usize), Error> {
        wire::parse_compressed_name(octets, start)
    }

    /// Returns the (uncompressed) on-the-wire representation of the
    /// `Name`.
    pub fn wire_repr(&self) -> &[u8] {
        &self.wire
    }

    /// Returns an object that displays this `Name` relative to
    /// `origin`: as `@` if the two are equal, as the leading labels if
    /// this is a subdomain of `origin`, and in absolute form otherwise.
    pub fn relative_to<'a>(&'a self, origin: &'a Name) -> Relative<'a> {
        Relative { name: self, origin }
    }
}

/// Writes a single label, escaping octets in accordance with RFC 1035
/// § 5.1 and RFC 4343 § 2.1. Octets that are special in zone files are
/// escaped too, so the text always parses back to the same label.
fn fmt_label(octets: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    for octet in octets {
        if is_zone_file_special(*octet) {
            write!(f, "\\{}", *octet as char)?;
        } else if octet.is_ascii_graphic() {
            write!(f, "{}", *octet as char)?;
        } else {
            write!(f, "\\{:03}", *octet)?;
        }
    }
    Ok(())
}

fn is_zone_file_special(octet: u8) -> bool {
    matches!(
        octet,
        b'.' | b'\\' | b';' | b'(' | b')' | b'"' | b'@' | b'$'
    )
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for label in self.labels().filter(|l| !l.is_empty()) {
            fmt_label(label, f)?;
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.wire.eq_ignore_ascii_case(&other.wire)
    }
}

impl Eq for Name {}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The [`Ord`] implementation for `Name` employs DNSSEC's canonical
/// ordering of domain names. Per [RFC 4034 § 6.1], `Name`s are ordered
/// as strings of labels read from right to left.
///
/// [RFC 4034 § 6.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.1
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.labels()
            .rev()
            .zip(other.labels().rev())
            .find_map(|(a, b)| Some(cmp_labels(a, b)).filter(|ordering| ordering.is_ne()))
            .unwrap_or_else(|| self.len().cmp(&other.len()))
    }
}

fn cmp_labels(a: &[u8], b: &[u8]) -> Ordering {
    a.iter()
        .map(u8::to_ascii_lowercase)
        .cmp(b.iter().map(u8::to_ascii_lowercase))
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // This must be case-insensitive to match the Eq implementation.
        for octet in self.wire.iter() {
            state.write_u8(octet.to_ascii_lowercase());
        }
    }
}

/// A helper to display a [`Name`] relative to an origin. See
/// [`Name::relative_to`].
pub struct Relative<'a> {
    name: &'a Name,
    origin: &'a Name,
}

impl fmt::Display for Relative<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.name == self.origin {
            f.write_str("@")
        } else if self.name.eq_or_subdomain_of(self.origin) && !self.origin.is_root() {
            let n = self.name.len() - self.origin.len();
            for (i, label) in self.name.labels().take(n).enumerate() {
                if i > 0 {
                    f.write_str(".")?;
                }
                fmt_label(label, f)?;
            }
            Ok(())
        } else {
            fmt::Display::fmt(self.name, f)
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ITERATION OVER A NAME'S LABELS                                     //
////////////////////////////////////////////////////////////////////////

/// An iterator over the labels of a [`Name`], yielding the octets of
/// each label (without its length octet).
///
/// To use this iterator, construct one from a [`Name`] using
/// [`Name::labels`].
#[derive(Clone, Debug)]
pub struct Labels<'a> {
    name: &'a Name,
    offsets: ArrayVec<u8, MAX_N_LABELS>,
    front: usize,
    back: usize,
}

impl Labels<'_> {
    fn new(name: &Name) -> Labels {
        let mut offsets = ArrayVec::new();
        let mut offset = 0;
        loop {
            // A valid name has at most MAX_N_LABELS labels, so the push
            // cannot fail.
            offsets.push(offset as u8);
            let len = name.wire[offset] as usize;
            if len == 0 {
                break;
            }
            offset += len + 1;
        }
        let back = offsets.len();
        Labels {
            name,
            offsets,
            front: 0,
            back,
        }
    }
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            let start = self.offsets[self.front] as usize;
            self.front += 1;
            let len = self.name.wire[start] as usize;
            Some(&self.name.wire[start + 1..start + 1 + len])
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl DoubleEndedIterator for Labels<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.back > self.front {
            self.back -= 1;
            let start = self.offsets[self.back] as usize;
            let len = self.name.wire[start] as usize;
            Some(&self.name.wire[start + 1..start + 1 + len])
        } else {
            None
        }
    }
}

impl ExactSizeIterator for Labels<'_> {}

impl FusedIterator for Labels<'_> {}

////////////////////////////////////////////////////////////////////////
// PARSING OF NAMES FROM RUST STRINGS                                 //
////////////////////////////////////////////////////////////////////////

/// Allows for conversion of a Rust [`str`] into a [`Name`]. The passed
/// string must be strictly ASCII and fully qualified. Escape sequences
/// as defined by [RFC 4343 § 2.1] are supported.
///
/// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::StrEmpty);
        } else if s == "." {
            return Ok(Name::root());
        }

        let mut remaining_octets: &[u8] = s.as_ref();
        let mut builder = NameBuilder::new();
        while let Some(&octet) = remaining_octets.first() {
            if octet == b'\\' {
                let (value, consumed) = parse_escape(&remaining_octets[1..])?;
                builder.try_push(value)?;
                remaining_octets = &remaining_octets[consumed + 1..];
            } else if octet == b'.' {
                builder.next_label()?;
                remaining_octets = &remaining_octets[1..];
            } else if !octet.is_ascii() {
                return Err(Error::StrNotAscii);
            } else {
                builder.try_push(octet)?;
                remaining_octets = &remaining_octets[1..];
            }
        }
        builder.finish()
    }
}

/// Parses an escape sequence. We expect `remaining_octets` to start
/// with the octet immediately *after* the backslash.
fn parse_escape(remaining_octets: &[u8]) -> Result<(u8, usize), Error> {
    match remaining_octets {
        [] => Err(Error::InvalidEscape),
        [a, b, c, ..] if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit() => {
            let value = 100 * (a - b'0') as usize + 10 * (b - b'0') as usize + (c - b'0') as usize;
            u8::try_from(value)
                .map(|value| (value, 3))
                .or(Err(Error::InvalidEscape))
        }
        [a, ..] if a.is_ascii_digit() => Err(Error::InvalidEscape),
        [a, ..] => Ok((*a, 1)),
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
