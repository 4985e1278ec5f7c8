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

//! Loading of zone files into a [`RecordStore`].

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use log::warn;

use super::Parser;
use crate::name::{self, Name};
use crate::rr::Ttl;
use crate::zone::RecordStore;

////////////////////////////////////////////////////////////////////////
// LOADING                                                            //
////////////////////////////////////////////////////////////////////////

/// The result of [`load`].
#[derive(Clone, Debug)]
pub struct LoadedZone {
    /// The records that parsed successfully.
    pub store: RecordStore,

    /// The serial of the first SOA record in the file, if any.
    pub serial: Option<u32>,

    /// The value of the last `$TTL` directive in the file, if any.
    pub default_ttl: Option<Ttl>,

    /// The number of records skipped because of syntax errors.
    pub skipped: usize,
}

/// Reads a zone file from `stream` into a [`RecordStore`], starting
/// with `origin` as the current origin.
///
/// Malformed records are logged and skipped; only I/O errors fail the
/// load. A record owned by the root name `.` is stored under `origin`.
pub fn load(mut stream: impl Read, origin: &Name) -> io::Result<LoadedZone> {
    let mut input = Vec::new();
    stream.read_to_end(&mut input)?;

    let mut parser = Parser::with_origin(&input, origin.clone());
    let mut store = RecordStore::new();
    let mut serial = None;
    let mut skipped = 0;
    for result in &mut parser {
        match result {
            Ok(mut record) => {
                if record.owner.is_root() {
                    record.owner = origin.clone();
                }
                if serial.is_none() {
                    serial = record.soa_serial();
                }
                store.insert(record);
            }
            Err(e) => {
                warn!("Zone {origin}: skipping record: {e}");
                skipped += 1;
            }
        }
    }

    Ok(LoadedZone {
        store,
        serial,
        default_ttl: parser.default_ttl(),
        skipped,
    })
}

////////////////////////////////////////////////////////////////////////
// ORIGIN DISCOVERY                                                   //
////////////////////////////////////////////////////////////////////////

/// Finds the origin declared by a zone file: the second
/// whitespace-separated field of the first line that begins with
/// `$ORIGIN`. A name without a trailing dot is taken as absolute.
pub fn find_origin(path: &Path) -> Result<Name, OriginError> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.split(b'\n') {
        let line = line?;
        if !line.starts_with(b"$ORIGIN") {
            continue;
        }
        let text = String::from_utf8_lossy(&line);
        let field = text.split_whitespace().nth(1).ok_or(OriginError::NotFound)?;
        let parsed = if field.ends_with('.') {
            field.parse()
        } else {
            format!("{field}.").parse()
        };
        return parsed.map_err(OriginError::InvalidName);
    }
    Err(OriginError::NotFound)
}

/// An error signaling that the origin of a zone file could not be
/// determined.
#[derive(Debug)]
pub enum OriginError {
    Io(io::Error),
    NotFound,
    InvalidName(name::Error),
}

impl From<io::Error> for OriginError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl fmt::Display for OriginError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "could not read zone file: {err}"),
            Self::NotFound => f.write_str("no $ORIGIN directive found"),
            Self::InvalidName(err) => write!(f, "invalid $ORIGIN: {err}"),
        }
    }
}

impl std::error::Error for OriginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::NotFound => None,
            Self::InvalidName(err) => Some(err),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::rr::{Rdata, Type};

    const ZONE: &[u8] = b"$ORIGIN example.test.\n\
        $TTL 3600\n\
        @ IN SOA ns1 hostmaster 7 3600 900 86400 300\n\
        . IN NS ns1\n\
        ns1 IN A 192.0.2.1\n\
        ns1 IN A 192.0.2.2\n\
        broken IN A\n\
        @ IN SOA ns1 hostmaster 9 3600 900 86400 300\n";

    fn origin() -> Name {
        "example.test.".parse().unwrap()
    }

    #[test]
    fn load_builds_store_and_skips_bad_records() {
        let loaded = load(ZONE, &origin()).unwrap();
        assert_eq!(loaded.serial, Some(7));
        assert_eq!(loaded.default_ttl, Some(Ttl::from(3600)));
        assert_eq!(loaded.skipped, 1);
        assert_eq!(loaded.store.len(), 5);
        let ns1: Name = "ns1.example.test.".parse().unwrap();
        let addresses = loaded.store.get(Type::A, &ns1);
        assert_eq!(addresses[0].rdata, Rdata::A([192, 0, 2, 1].into()));
        assert_eq!(addresses[1].rdata, Rdata::A([192, 0, 2, 2].into()));
    }

    #[test]
    fn root_owner_becomes_origin() {
        let loaded = load(ZONE, &origin()).unwrap();
        assert_eq!(loaded.store.get(Type::NS, &origin()).len(), 1);
        assert!(loaded.store.get(Type::NS, &Name::root()).is_empty());
    }

    #[test]
    fn load_without_soa_has_no_serial() {
        let loaded = load(b"www 60 IN A 192.0.2.1\n".as_slice(), &origin()).unwrap();
        assert_eq!(loaded.serial, None);
        assert_eq!(loaded.store.len(), 1);
    }

    #[test]
    fn load_accepts_lower_case_mnemonics() {
        let zone = b"$origin example.test.\n\
            @ 3600 in soa ns1 hostmaster 7 3600 900 86400 300\n\
            www 60 in a 192.0.2.1\n\
            mail 60 IN mx 10 mx1\n";
        let loaded = load(zone.as_slice(), &origin()).unwrap();
        assert_eq!(loaded.serial, Some(7));
        assert_eq!(loaded.skipped, 0);
        assert_eq!(loaded.store.len(), 3);
        let mail: Name = "mail.example.test.".parse().unwrap();
        assert_eq!(loaded.store.get(Type::MX, &mail).len(), 1);
    }

    #[test]
    fn find_origin_reads_first_origin_line() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"; comment\n$TTL 60\n$ORIGIN example.test.\n$ORIGIN other.test.\n")
            .unwrap();
        assert_eq!(find_origin(file.path()).unwrap(), origin());
    }

    #[test]
    fn find_origin_accepts_names_without_trailing_dot() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"$ORIGIN example.test\n").unwrap();
        assert_eq!(find_origin(file.path()).unwrap(), origin());
    }

    #[test]
    fn find_origin_fails_without_origin() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"@ 60 IN A 192.0.2.1\n").unwrap();
        assert!(matches!(find_origin(file.path()), Err(OriginError::NotFound)));
        assert!(matches!(
            find_origin(Path::new("/nonexistent/zone")),
            Err(OriginError::Io(_))
        ));
    }
}
