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

//! The [`RecordStore`], which holds the resource records of one zone.

use std::collections::HashMap;

use crate::name::Name;
use crate::rr::{Record, Type};

/// The in-memory resource records of a zone, keyed by RR type and
/// then by owner.
///
/// Records sharing a type and owner are kept in insertion order. Since
/// [`Name`] comparison is case-insensitive, so is the owner lookup.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    records: HashMap<Type, HashMap<Name, Vec<Record>>>,
    len: usize,
}

impl RecordStore {
    /// Creates an empty `RecordStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record` to the records of its type and owner.
    pub fn insert(&mut self, record: Record) {
        self.records
            .entry(record.rr_type)
            .or_default()
            .entry(record.owner.clone())
            .or_default()
            .push(record);
        self.len += 1;
    }

    /// Returns the records of type `rr_type` owned by `owner`, which
    /// is empty if there are none.
    pub fn get(&self, rr_type: Type, owner: &Name) -> &[Record] {
        self.records
            .get(&rr_type)
            .and_then(|by_owner| by_owner.get(owner))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the number of records in the store.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the RR types present in the store, in ascending order.
    pub fn types(&self) -> Vec<Type> {
        let mut types: Vec<Type> = self.records.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Returns the records of type `rr_type`, with owners in canonical
    /// order and records of the same owner in insertion order.
    pub fn records_of_type(&self, rr_type: Type) -> Vec<&Record> {
        let mut owners: Vec<(&Name, &Vec<Record>)> = self
            .records
            .get(&rr_type)
            .map(|by_owner| by_owner.iter().collect())
            .unwrap_or_default();
        owners.sort_by(|a, b| a.0.cmp(b.0));
        owners
            .into_iter()
            .flat_map(|(_, records)| records.iter())
            .collect()
    }

    /// Iterates over every record: SOA records first, then the other
    /// types in ascending order, each as in
    /// [`RecordStore::records_of_type`].
    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        let mut types = self.types();
        types.sort_by_key(|rr_type| (*rr_type != Type::SOA, *rr_type));
        types
            .into_iter()
            .flat_map(move |rr_type| self.records_of_type(rr_type))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::rr::{Rdata, Ttl};

    fn a_record(owner: &str, last_octet: u8) -> Record {
        Record {
            owner: owner.parse().unwrap(),
            rr_type: Type::A,
            class: Class::IN,
            ttl: Ttl::from(60),
            rdata: Rdata::A([192, 0, 2, last_octet].into()),
        }
    }

    fn ns_record(owner: &str) -> Record {
        Record {
            owner: owner.parse().unwrap(),
            rr_type: Type::NS,
            class: Class::IN,
            ttl: Ttl::from(60),
            rdata: Rdata::Ns("ns.example.test.".parse().unwrap()),
        }
    }

    #[test]
    fn get_preserves_insertion_order_and_ignores_case() {
        let mut store = RecordStore::new();
        store.insert(a_record("www.example.test.", 2));
        store.insert(a_record("WWW.example.test.", 1));
        let found = store.get(Type::A, &"www.EXAMPLE.test.".parse().unwrap());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].rdata, Rdata::A([192, 0, 2, 2].into()));
        assert_eq!(found[1].rdata, Rdata::A([192, 0, 2, 1].into()));
        assert!(store.get(Type::AAAA, &"www.example.test.".parse().unwrap()).is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn records_of_type_sorts_owners_canonically() {
        let mut store = RecordStore::new();
        store.insert(a_record("z.example.test.", 1));
        store.insert(a_record("example.test.", 2));
        store.insert(a_record("a.example.test.", 3));
        let owners: Vec<String> = store
            .records_of_type(Type::A)
            .iter()
            .map(|record| record.owner.to_string())
            .collect();
        assert_eq!(owners, ["example.test.", "a.example.test.", "z.example.test."]);
    }

    #[test]
    fn iteration_orders_by_type() {
        let mut store = RecordStore::new();
        store.insert(a_record("example.test.", 1));
        store.insert(ns_record("example.test."));
        let types: Vec<Type> = store.iter().map(|record| record.rr_type).collect();
        assert_eq!(types, [Type::A, Type::NS]);
        assert_eq!(store.types(), [Type::A, Type::NS]);
    }
}
