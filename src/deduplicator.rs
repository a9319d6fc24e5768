// Copyright  (C) 2020, Kisio Digital and/or its affiliates. All rights reserved.
//
// This file is part of Navitia,
// the software to build cool stuff with public transport.
//
// Hope you'll enjoy and contribute to this project,
// powered by Kisio Digital (www.kisio.com).
// Help us simplify mobility and open public transport:
// a non ending quest to the responsive locomotion way of traveling!
//
// This contribution is a part of the research and development work of the
// IVA Project which aims to enhance traveler information and is carried out
// under the leadership of the Technological Research Institute SystemX,
// with the partnership and support of the transport organization authority
// Ile-De-France Mobilités (IDFM), SNCF, and public funds
// under the scope of the French Program "Investissements d’Avenir".
//
// LICENCE: This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.
//
// Stay tuned using
// twitter @navitia
// channel `#navitia` on riot https://riot.im/app/#/room/#navitia:matrix.org
// https://groups.google.com/d/forum/navitia
// www.navitia.io

use std::{
    collections::HashSet,
    hash::Hash,
    sync::Arc,
};

use fixedbitset::FixedBitSet;
use tracing::debug;

use crate::models::{BookingInfo, PickDrop};

/// Interns arrays shared by many trip time vectors so that equal content
/// is stored once.
///
/// Trips following the same pattern usually share their stop sequence
/// numbers, boarding rules, and often their whole normalized time arrays.
/// Interning them brings the heap usage of a large dataset down by an
/// order of magnitude.
///
/// Used during the single threaded construction of the base model only;
/// not thread safe.
#[derive(Debug, Default)]
pub struct Deduplicator {
    int_arrays: InternPool<i32>,
    sequence_arrays: InternPool<u32>,
    string_arrays: InternPool<Option<String>>,
    pick_drop_arrays: InternPool<PickDrop>,
    booking_info_arrays: InternPool<Option<BookingInfo>>,
    bit_sets: BitSetPool,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_int_array(&mut self, values: Vec<i32>) -> Arc<[i32]> {
        self.int_arrays.intern(values)
    }

    pub fn intern_sequence_array(&mut self, values: Vec<u32>) -> Arc<[u32]> {
        self.sequence_arrays.intern(values)
    }

    pub fn intern_string_array(&mut self, values: Vec<Option<String>>) -> Arc<[Option<String>]> {
        self.string_arrays.intern(values)
    }

    pub fn intern_pick_drop_array(&mut self, values: Vec<PickDrop>) -> Arc<[PickDrop]> {
        self.pick_drop_arrays.intern(values)
    }

    pub fn intern_booking_info_array(
        &mut self,
        values: Vec<Option<BookingInfo>>,
    ) -> Arc<[Option<BookingInfo>]> {
        self.booking_info_arrays.intern(values)
    }

    pub fn intern_bit_set(&mut self, bits: FixedBitSet) -> Arc<FixedBitSet> {
        self.bit_sets.intern(bits)
    }

    /// Number of arrays that were answered from a pool instead of being
    /// stored anew, across all pools.
    pub fn nb_of_hits(&self) -> usize {
        self.int_arrays.hits
            + self.sequence_arrays.hits
            + self.string_arrays.hits
            + self.pick_drop_arrays.hits
            + self.booking_info_arrays.hits
            + self.bit_sets.hits
    }

    /// Number of distinct arrays kept, across all pools.
    pub fn nb_of_entries(&self) -> usize {
        self.int_arrays.entries.len()
            + self.sequence_arrays.entries.len()
            + self.string_arrays.entries.len()
            + self.pick_drop_arrays.entries.len()
            + self.booking_info_arrays.entries.len()
            + self.bit_sets.entries.len()
    }

    pub fn log_deduplication_results(&self) {
        debug!(
            "Deduplication kept {} distinct arrays and shared {} duplicates",
            self.nb_of_entries(),
            self.nb_of_hits()
        );
    }
}

/// One interning table, keyed by value equality of the whole array.
#[derive(Debug)]
struct InternPool<T> {
    entries: HashSet<Arc<[T]>>,
    hits: usize,
}

impl<T> Default for InternPool<T> {
    fn default() -> Self {
        Self {
            entries: HashSet::new(),
            hits: 0,
        }
    }
}

impl<T> InternPool<T>
where
    T: Eq + Hash,
{
    fn intern(&mut self, values: Vec<T>) -> Arc<[T]> {
        if let Some(interned) = self.entries.get(values.as_slice()) {
            self.hits += 1;
            return Arc::clone(interned);
        }
        let interned: Arc<[T]> = values.into();
        self.entries.insert(Arc::clone(&interned));
        interned
    }
}

#[derive(Debug, Default)]
struct BitSetPool {
    entries: HashSet<Arc<FixedBitSet>>,
    hits: usize,
}

impl BitSetPool {
    fn intern(&mut self, bits: FixedBitSet) -> Arc<FixedBitSet> {
        if let Some(interned) = self.entries.get(&bits) {
            self.hits += 1;
            return Arc::clone(interned);
        }
        let interned = Arc::new(bits);
        self.entries.insert(Arc::clone(&interned));
        interned
    }
}
