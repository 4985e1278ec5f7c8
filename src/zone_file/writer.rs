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

//! Writing of zone files.

use std::io::{self, Write};

use crate::name::Name;
use crate::rr::{Record, Ttl, Type};
use crate::zone::RecordStore;

/// Writes the records of `store` as zone file text.
///
/// The layout is fixed: an optional `$TTL` line, the SOA record with
/// one labeled field per line, `$ORIGIN`, the NS records, and then the
/// remaining records in ascending type order (see
/// [`RecordStore::records_of_type`] for the order within a type). The
/// SOA serial written is `serial` plus one, wrapping around at 2³².
///
/// NS and MX records are written with absolute owners; other owners
/// are written relative to `origin`.
pub fn write_zone(
    mut out: impl Write,
    origin: &Name,
    store: &RecordStore,
    serial: Option<u32>,
    default_ttl: Option<Ttl>,
) -> io::Result<()> {
    if let Some(ttl) = default_ttl {
        writeln!(out, "$TTL {ttl}")?;
    }

    for record in store.records_of_type(Type::SOA) {
        if let Some(soa) = record.rdata.as_soa() {
            let next_serial = serial.unwrap_or(soa.serial).wrapping_add(1);
            writeln!(
                out,
                "@\t{}\t{}\tSOA\t{}\t{}\t(",
                record.ttl, record.class, soa.mname, soa.rname
            )?;
            writeln!(out, "\t{next_serial}\t;serial")?;
            writeln!(out, "\t{}\t;refresh", soa.refresh)?;
            writeln!(out, "\t{}\t;retry", soa.retry)?;
            writeln!(out, "\t{}\t;expire", soa.expire)?;
            writeln!(out, "\t{}\t;minimum", soa.minimum)?;
            writeln!(out, ")")?;
        }
    }

    writeln!(out, "$ORIGIN {origin}")?;
    writeln!(out, ";Nameservers")?;
    for record in store.records_of_type(Type::NS) {
        writeln!(out, "{record}")?;
    }

    for rr_type in store.types() {
        if rr_type == Type::SOA || rr_type == Type::NS {
            continue;
        }
        for record in store.records_of_type(rr_type) {
            if rr_type == Type::MX {
                writeln!(out, "{record}")?;
            } else {
                write_relative(&mut out, record, origin)?;
            }
        }
    }

    out.flush()
}

/// Writes `record` with its owner relative to `origin`.
fn write_relative(out: &mut impl Write, record: &Record, origin: &Name) -> io::Result<()> {
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}",
        record.owner.relative_to(origin),
        record.ttl,
        record.class,
        record.rr_type,
        record.rdata,
    )
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone_file::load;

    const ZONE: &[u8] = b"$ORIGIN example.test.\n\
        $TTL 3600\n\
        www IN A 192.0.2.1\n\
        @ IN SOA ns1 hostmaster 41 7200 900 1209600 300\n\
        @ IN MX 10 mail\n\
        @ IN NS ns1\n\
        txt IN TXT \"hello world\"\n\
        a IN A 192.0.2.2\n";

    const EXPECTED: &str = "$TTL 3600\n\
        @\t3600\tIN\tSOA\tns1.example.test.\thostmaster.example.test.\t(\n\
        \t42\t;serial\n\
        \t7200\t;refresh\n\
        \t900\t;retry\n\
        \t1209600\t;expire\n\
        \t300\t;minimum\n\
        )\n\
        $ORIGIN example.test.\n\
        ;Nameservers\n\
        example.test.\t3600\tIN\tNS\tns1.example.test.\n\
        a\t3600\tIN\tA\t192.0.2.2\n\
        www\t3600\tIN\tA\t192.0.2.1\n\
        example.test.\t3600\tIN\tMX\t10 mail.example.test.\n\
        txt\t3600\tIN\tTXT\t\"hello world\"\n";

    #[test]
    fn writes_fixed_layout() {
        let origin: Name = "example.test.".parse().unwrap();
        let loaded = load(ZONE, &origin).unwrap();
        let mut out = Vec::new();
        write_zone(&mut out, &origin, &loaded.store, loaded.serial, loaded.default_ttl).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), EXPECTED);
    }

    #[test]
    fn escaped_owners_survive_rewrite() {
        let origin: Name = "example.test.".parse().unwrap();
        let zone = b"$ORIGIN example.test.\n\
            @ 60 IN SOA ns1 hostmaster 1 1 1 1 1\n\
            semi\\;colon 60 IN A 192.0.2.10\n\
            \\(paren\\) 60 IN A 192.0.2.11\n\
            \\\"quote 60 IN TXT \"x\"\n\
            \\@ 60 IN CNAME www\n\
            \\$dollar 60 IN A 192.0.2.12\n\
            sp\\032ace 60 IN A 192.0.2.13\n";
        let loaded = load(zone.as_slice(), &origin).unwrap();
        assert_eq!(loaded.skipped, 0);
        assert_eq!(loaded.store.len(), 7);

        let mut out = Vec::new();
        write_zone(&mut out, &origin, &loaded.store, loaded.serial, None).unwrap();
        let reloaded = load(out.as_slice(), &origin).unwrap();
        assert_eq!(reloaded.skipped, 0);
        assert_eq!(reloaded.serial, Some(2));
        assert_eq!(reloaded.store.len(), loaded.store.len());
        for record in loaded.store.iter().filter(|r| r.rr_type != Type::SOA) {
            assert!(
                reloaded.store.get(record.rr_type, &record.owner).contains(record),
                "{record} was lost",
            );
        }
    }

    #[test]
    fn serial_wraps_around() {
        let origin: Name = "example.test.".parse().unwrap();
        let loaded = load(
            b"@ 60 IN SOA ns1 hostmaster 4294967295 1 1 1 1\n".as_slice(),
            &origin,
        )
        .unwrap();
        let mut out = Vec::new();
        write_zone(&mut out, &origin, &loaded.store, loaded.serial, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("@\t60\tIN\tSOA"));
        assert!(text.contains("\n\t0\t;serial\n"));
    }
}
