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

//! Implementation of served DNS zones.
//!
//! A [`Zone`] holds the records of one zone file in memory, as an
//! immutable [`ZoneData`] snapshot. Queries and transfers read the
//! current snapshot; [`Zone::reload`] replaces it with a freshly parsed
//! one when the file's SOA serial has advanced.

use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::{debug, info};

use crate::message::Qtype;
use crate::name::Name;
use crate::rr::{Record, Ttl, Type};
use crate::zone_file::{self, OriginError};

mod store;
pub use store::RecordStore;

////////////////////////////////////////////////////////////////////////
// ZONES                                                              //
////////////////////////////////////////////////////////////////////////

/// A DNS zone backed by a zone file.
#[derive(Debug)]
pub struct Zone {
    origin: Name,
    path: PathBuf,
    data: RwLock<Arc<ZoneData>>,
}

/// One consistent view of a [`Zone`]'s contents.
#[derive(Debug)]
pub struct ZoneData {
    pub store: RecordStore,

    /// The serial of the first SOA record, if there was one.
    pub serial: Option<u32>,

    /// The file's `$TTL`, kept for writing the zone back out.
    pub default_ttl: Option<Ttl>,
}

impl Zone {
    /// Loads the zone file at `path`. The origin is taken from the
    /// file's first `$ORIGIN` line.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let path = path.into();
        let origin = zone_file::find_origin(&path)?;
        let data = read_data(&path, &origin)?;
        info!(
            "Loaded zone {} from {} ({} records, serial {}).",
            origin,
            path.display(),
            data.store.len(),
            DisplaySerial(data.serial),
        );
        Ok(Self {
            origin,
            path,
            data: RwLock::new(Arc::new(data)),
        })
    }

    pub fn origin(&self) -> &Name {
        &self.origin
    }

    /// Returns the path of the zone file backing this zone.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current snapshot of the zone's contents.
    pub fn snapshot(&self) -> Arc<ZoneData> {
        self.data.read().unwrap().clone()
    }

    pub fn serial(&self) -> Option<u32> {
        self.snapshot().serial
    }

    /// Returns the records of type `qtype` owned by `qname`. No
    /// distinction is made between a name that does not exist and a
    /// name without records of the type; both give no records.
    pub fn answer(&self, qtype: Qtype, qname: &Name) -> Vec<Record> {
        self.snapshot().store.get(Type::from(qtype), qname).to_vec()
    }

    /// Produces the records of a zone transfer for `qname`: first all
    /// records of the zone, then the SOA records of `qname`. Only AXFR
    /// and IXFR requests are accepted. IXFR is answered with a full
    /// transfer.
    pub fn transfer(&self, qtype: Qtype, qname: &Name) -> Result<Transfer, NotTransferRequest> {
        if !qtype.is_transfer() {
            return Err(NotTransferRequest(qtype));
        }
        let data = self.snapshot();
        Ok(Transfer {
            records: data.store.iter().cloned().collect(),
            soa: data.store.get(Type::SOA, qname).to_vec(),
        })
    }

    /// Reparses the zone file and adopts the result if its serial is
    /// greater than the current one. A file without an SOA record
    /// never replaces the current data. On error, the current data is
    /// kept.
    pub fn reload(&self) -> Result<ReloadOutcome, LoadError> {
        let candidate = read_data(&self.path, &self.origin)?;

        // Comparing under the write lock keeps the serial from going
        // backwards when reloads race.
        let mut data = self.data.write().unwrap();
        let previous = data.serial;
        if candidate.serial > previous {
            let serial = candidate.serial;
            *data = Arc::new(candidate);
            Ok(ReloadOutcome::Updated { previous, serial })
        } else {
            Ok(ReloadOutcome::Unchanged {
                serial: previous,
                candidate: candidate.serial,
            })
        }
    }

    /// Writes the zone to `<path>new`, where `<path>` is the backing
    /// zone file, with the SOA serial incremented. Returns the path
    /// written.
    pub fn write_zone_file(&self) -> io::Result<PathBuf> {
        let mut target = OsString::from(self.path.as_os_str());
        target.push("new");
        let target = PathBuf::from(target);

        let data = self.snapshot();
        let file = File::create(&target)?;
        zone_file::write_zone(
            BufWriter::new(file),
            &self.origin,
            &data.store,
            data.serial,
            data.default_ttl,
        )?;
        debug!("Wrote zone {} to {}.", self.origin, target.display());
        Ok(target)
    }
}

/// Parses the zone file at `path` into a [`ZoneData`].
fn read_data(path: &Path, origin: &Name) -> Result<ZoneData, LoadError> {
    let loaded = zone_file::load(File::open(path)?, origin)?;
    if loaded.skipped > 0 {
        info!(
            "Zone {}: skipped {} malformed records in {}.",
            origin,
            loaded.skipped,
            path.display()
        );
    }
    Ok(ZoneData {
        store: loaded.store,
        serial: loaded.serial,
        default_ttl: loaded.default_ttl,
    })
}

////////////////////////////////////////////////////////////////////////
// OPERATION RESULTS                                                  //
////////////////////////////////////////////////////////////////////////

/// The records of a zone transfer, in the two groups in which they are
/// sent.
#[derive(Clone, Debug)]
pub struct Transfer {
    pub records: Vec<Record>,
    pub soa: Vec<Record>,
}

/// The outcome of a successful [`Zone::reload`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReloadOutcome {
    Updated {
        previous: Option<u32>,
        serial: Option<u32>,
    },
    Unchanged {
        serial: Option<u32>,
        candidate: Option<u32>,
    },
}

impl fmt::Display for ReloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Updated { previous, serial } => write!(
                f,
                "updated from serial {} to {}",
                DisplaySerial(previous),
                DisplaySerial(serial)
            ),
            Self::Unchanged { serial, candidate } => write!(
                f,
                "unchanged at serial {} (file has {})",
                DisplaySerial(serial),
                DisplaySerial(candidate)
            ),
        }
    }
}

/// Displays an optional serial, with `none` for a missing one.
struct DisplaySerial(Option<u32>);

impl fmt::Display for DisplaySerial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Some(serial) => write!(f, "{serial}"),
            None => f.write_str("none"),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a zone file could not be loaded.
#[derive(Debug)]
pub enum LoadError {
    Origin(OriginError),
    Io(io::Error),
}

impl From<OriginError> for LoadError {
    fn from(err: OriginError) -> Self {
        Self::Origin(err)
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Origin(err) => write!(f, "could not determine origin: {err}"),
            Self::Io(err) => write!(f, "could not read zone file: {err}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Origin(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

/// An error signaling that [`Zone::transfer`] was called for a QTYPE
/// other than AXFR or IXFR.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NotTransferRequest(pub Qtype);

impl fmt::Display for NotTransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} is not a zone transfer request", self.0)
    }
}

impl std::error::Error for NotTransferRequest {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;
    use std::thread;

    use lazy_static::lazy_static;
    use tempfile::{NamedTempFile, TempDir};

    use super::*;
    use crate::rr::Rdata;

    lazy_static! {
        static ref ORIGIN: Name = "example.test.".parse().unwrap();
        static ref WWW: Name = "www.example.test.".parse().unwrap();
    }

    fn zone_text(serial: u32) -> String {
        format!(
            "$ORIGIN example.test.\n\
             $TTL 3600\n\
             @ IN SOA ns1 hostmaster {serial} 7200 900 1209600 300\n\
             @ IN NS ns1\n\
             ns1 IN A 192.0.2.1\n\
             www IN A 192.0.2.80\n\
             @ IN MX 10 mail\n"
        )
    }

    /// Replaces the contents of `path` atomically.
    fn replace_file(dir: &TempDir, path: &Path, contents: &str) {
        let mut file = NamedTempFile::new_in(dir.path()).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.persist(path).unwrap();
    }

    fn zone_with_serial(serial: u32) -> (TempDir, Zone) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("example.zone");
        fs::write(&path, zone_text(serial)).unwrap();
        let zone = Zone::load(&path).unwrap();
        (dir, zone)
    }

    #[test]
    fn load_finds_origin_and_serial() {
        let (_dir, zone) = zone_with_serial(7);
        assert_eq!(zone.origin(), &*ORIGIN);
        assert_eq!(zone.serial(), Some(7));
        assert_eq!(zone.snapshot().store.len(), 5);
    }

    #[test]
    fn load_fails_without_origin() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-origin.zone");
        fs::write(&path, "@ 60 IN A 192.0.2.1\n").unwrap();
        assert!(matches!(
            Zone::load(&path),
            Err(LoadError::Origin(OriginError::NotFound))
        ));
    }

    #[test]
    fn answer_returns_matching_records() {
        let (_dir, zone) = zone_with_serial(1);
        let answers = zone.answer(Type::A.into(), &WWW);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].rdata, Rdata::A([192, 0, 2, 80].into()));
        assert!(zone.answer(Type::AAAA.into(), &WWW).is_empty());
        assert!(zone
            .answer(Type::A.into(), &"nowhere.example.test.".parse().unwrap())
            .is_empty());
    }

    #[test]
    fn transfer_sends_everything_then_soa() {
        let (_dir, zone) = zone_with_serial(1);
        let transfer = zone.transfer(Qtype::AXFR, &ORIGIN).unwrap();
        assert_eq!(transfer.records.len(), 5);
        assert_eq!(transfer.records[0].rr_type, Type::SOA);
        assert_eq!(transfer.soa.len(), 1);
        assert_eq!(transfer.soa[0].soa_serial(), Some(1));
        assert!(zone.transfer(Qtype::IXFR, &ORIGIN).is_ok());
        assert_eq!(
            zone.transfer(Type::A.into(), &ORIGIN).unwrap_err(),
            NotTransferRequest(Type::A.into())
        );
    }

    #[test]
    fn reload_without_serial_change_is_a_no_op() {
        let (dir, zone) = zone_with_serial(5);
        let before = zone.snapshot();
        replace_file(&dir, zone.path(), &zone_text(5).replace("192.0.2.80", "192.0.2.81"));
        assert_eq!(
            zone.reload().unwrap(),
            ReloadOutcome::Unchanged {
                serial: Some(5),
                candidate: Some(5)
            }
        );
        assert!(Arc::ptr_eq(&before, &zone.snapshot()));
        assert_eq!(
            zone.answer(Type::A.into(), &WWW)[0].rdata,
            Rdata::A([192, 0, 2, 80].into())
        );
    }

    #[test]
    fn reload_adopts_only_greater_serials() {
        let (dir, zone) = zone_with_serial(5);
        replace_file(&dir, zone.path(), &zone_text(6));
        assert_eq!(
            zone.reload().unwrap(),
            ReloadOutcome::Updated {
                previous: Some(5),
                serial: Some(6)
            }
        );
        replace_file(&dir, zone.path(), &zone_text(4));
        assert!(matches!(
            zone.reload().unwrap(),
            ReloadOutcome::Unchanged { .. }
        ));
        replace_file(&dir, zone.path(), "$ORIGIN example.test.\nwww 60 IN A 192.0.2.1\n");
        assert!(matches!(
            zone.reload().unwrap(),
            ReloadOutcome::Unchanged { candidate: None, .. }
        ));
        assert_eq!(zone.serial(), Some(6));
    }

    #[test]
    fn failed_reload_keeps_data() {
        let (dir, zone) = zone_with_serial(5);
        fs::remove_file(zone.path()).unwrap();
        assert!(matches!(zone.reload(), Err(LoadError::Io(_))));
        assert_eq!(zone.serial(), Some(5));
        drop(dir);
    }

    #[test]
    fn concurrent_reloads_never_regress() {
        let (dir, zone) = zone_with_serial(1);
        let zone = Arc::new(zone);
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let zone = zone.clone();
                thread::spawn(move || {
                    let mut last = zone.serial();
                    for _ in 0..50 {
                        let _ = zone.reload();
                        let serial = zone.serial();
                        assert!(serial >= last);
                        last = serial;
                    }
                })
            })
            .collect();
        for serial in 2..=20 {
            replace_file(&dir, zone.path(), &zone_text(serial));
        }
        for reader in readers {
            reader.join().unwrap();
        }
        zone.reload().unwrap();
        assert_eq!(zone.serial(), Some(20));
    }

    #[test]
    fn written_zone_reloads_with_next_serial() {
        let (_dir, zone) = zone_with_serial(41);
        let written = zone.write_zone_file().unwrap();
        assert_eq!(
            written.file_name().unwrap().to_str().unwrap(),
            "example.zonenew"
        );
        let rewritten = Zone::load(&written).unwrap();
        assert_eq!(rewritten.origin(), &*ORIGIN);
        assert_eq!(rewritten.serial(), Some(42));

        let original = zone.snapshot();
        let reparsed = rewritten.snapshot();
        let without_soa = |data: &ZoneData| -> Vec<Record> {
            data.store
                .iter()
                .filter(|record| record.rr_type != Type::SOA)
                .cloned()
                .collect()
        };
        assert_eq!(without_soa(&original), without_soa(&reparsed));
        assert_eq!(reparsed.default_ttl, Some(Ttl::from(3600)));
    }
}
