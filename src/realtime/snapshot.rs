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
    collections::{HashMap, HashSet},
    fmt::{Display, Formatter},
    sync::{Arc, Mutex, MutexGuard},
};

use arc_swap::ArcSwap;
use chrono::NaiveDate;

use crate::{
    models::{BaseModel, PatternIdx, TripId},
    timetables::{Timetable, TripPattern, TripTimes},
};

/// A layered view of the transit schedule: for each (pattern, service
/// date) touched by real time data, the timetable replacing the
/// scheduled one.
///
/// A snapshot is mutable while its builder holds it, and frozen forever
/// once committed. Readers resolve timetables against a frozen snapshot
/// without any lock; pattern-days without an overlay fall back to the
/// pattern's scheduled timetable, so an empty snapshot costs nothing.
#[derive(Debug, Clone)]
pub struct TimetableSnapshot {
    realtime_timetables: HashMap<(PatternIdx, NaiveDate), Arc<Timetable>>,

    // pattern of each run created or rerouted at runtime, by trip and
    // date; the pattern itself may be a base one or a synthesized one
    added_patterns: HashMap<(TripId, NaiveDate), Arc<TripPattern>>,

    // pattern-days deep copied by this generation, re-sorted at commit
    dirty: HashSet<(PatternIdx, NaiveDate)>,

    frozen: bool,
    version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotError {
    /// Mutation of a committed snapshot. This is a programming error:
    /// all writes must go through a builder.
    Frozen,
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Frozen => {
                write!(f, "Cannot modify a committed timetable snapshot.")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

impl TimetableSnapshot {
    fn empty_frozen() -> Self {
        Self {
            realtime_timetables: HashMap::new(),
            added_patterns: HashMap::new(),
            dirty: HashSet::new(),
            frozen: true,
            version: 0,
        }
    }

    /// A shallow, writable copy of `published`: overlays are shared
    /// until a pattern-day is touched.
    fn builder_copy(published: &TimetableSnapshot) -> Self {
        Self {
            realtime_timetables: published.realtime_timetables.clone(),
            added_patterns: published.added_patterns.clone(),
            dirty: HashSet::new(),
            frozen: false,
            version: published.version + 1,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Generation counter: a reader observing version v sees every
    /// change committed at v or earlier, and none committed later.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn nb_of_overlays(&self) -> usize {
        self.realtime_timetables.len()
    }

    /// The effective timetable of a pattern on a date: the real time
    /// overlay when one exists, the published schedule otherwise.
    pub fn resolve<'a>(&'a self, pattern: &'a TripPattern, date: NaiveDate) -> &'a Timetable {
        self.realtime_timetables
            .get(&(pattern.idx(), date))
            .map(Arc::as_ref)
            .unwrap_or_else(|| pattern.scheduled_timetable())
    }

    pub fn has_overlay(&self, pattern: &TripPattern, date: NaiveDate) -> bool {
        self.realtime_timetables
            .contains_key(&(pattern.idx(), date))
    }

    /// The pattern carrying an added or rerouted trip on a date, if
    /// any.
    pub fn added_pattern(&self, trip_id: &TripId, date: NaiveDate) -> Option<&Arc<TripPattern>> {
        self.added_patterns.get(&(trip_id.clone(), date))
    }

    /// The effective times of one trip on one date: its run created at
    /// runtime when there is one, its (possibly overlaid) scheduled run
    /// otherwise.
    pub fn trip_times<'a>(
        &'a self,
        base: &'a BaseModel,
        trip_id: &TripId,
        date: NaiveDate,
    ) -> Option<&'a Arc<TripTimes>> {
        let pattern = self
            .added_pattern(trip_id, date)
            .or_else(|| base.pattern_of_trip(trip_id))?;
        self.resolve(pattern, date).trip_times_for_trip(trip_id)
    }

    /// Stage new times for one trip of one pattern-day. The overlay
    /// timetable is deep copied the first time the pattern-day is
    /// touched in this generation; the copy starts from the published
    /// overlay, or from the scheduled timetable when there is none.
    pub fn update(
        &mut self,
        pattern: &Arc<TripPattern>,
        date: NaiveDate,
        trip_times: TripTimes,
    ) -> Result<(), SnapshotError> {
        if self.frozen {
            return Err(SnapshotError::Frozen);
        }
        let key = (pattern.idx(), date);
        let timetable = self
            .realtime_timetables
            .entry(key)
            .or_insert_with(|| Arc::new(pattern.scheduled_timetable().clone()));
        Arc::make_mut(timetable).replace_or_insert(Arc::new(trip_times));
        self.dirty.insert(key);
        Ok(())
    }

    pub fn set_added_pattern(
        &mut self,
        trip_id: TripId,
        date: NaiveDate,
        pattern: Arc<TripPattern>,
    ) -> Result<(), SnapshotError> {
        if self.frozen {
            return Err(SnapshotError::Frozen);
        }
        self.added_patterns.insert((trip_id, date), pattern);
        Ok(())
    }

    /// Freeze this snapshot. Timetables touched by this generation are
    /// re-sorted first, so readers always observe the first-arrival
    /// order.
    fn commit(mut self) -> Arc<TimetableSnapshot> {
        for key in &self.dirty {
            if let Some(timetable) = self.realtime_timetables.get_mut(key) {
                Arc::make_mut(timetable).sort_by_first_arrival();
            }
        }
        self.dirty.clear();
        self.frozen = true;
        Arc::new(self)
    }
}

/// The owner of the currently published snapshot.
///
/// Readers load the current snapshot without blocking and keep using
/// their `Arc` for as long as a query runs; a snapshot stays alive until
/// its last reader drops it. Writers take the single builder at a time,
/// stage a batch, and publish it atomically: readers never see half a
/// batch.
pub struct TimetableSnapshotSource {
    current: ArcSwap<TimetableSnapshot>,
    builder_lock: Mutex<()>,
}

impl Default for TimetableSnapshotSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimetableSnapshotSource {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(TimetableSnapshot::empty_frozen()),
            builder_lock: Mutex::new(()),
        }
    }

    /// The currently published snapshot. Lock free; the returned `Arc`
    /// pins the snapshot for the duration of the query.
    pub fn current(&self) -> Arc<TimetableSnapshot> {
        self.current.load_full()
    }

    /// Take the snapshot builder, blocking while another writer holds
    /// it. The builder starts from the currently published snapshot;
    /// dropping it without committing discards the whole batch.
    pub fn builder(&self) -> SnapshotBuilder<'_> {
        // a poisoned lock only means a previous batch panicked; the
        // builder restarts from the published snapshot anyway
        let lock = self
            .builder_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let snapshot = TimetableSnapshot::builder_copy(&self.current.load());
        SnapshotBuilder {
            source: self,
            snapshot,
            _lock: lock,
        }
    }
}

/// Exclusive write access to the next snapshot generation.
pub struct SnapshotBuilder<'a> {
    source: &'a TimetableSnapshotSource,
    snapshot: TimetableSnapshot,
    _lock: MutexGuard<'a, ()>,
}

impl SnapshotBuilder<'_> {
    /// Resolution against the staged state, so that successive records
    /// of one batch observe each other.
    pub fn resolve<'s>(&'s self, pattern: &'s TripPattern, date: NaiveDate) -> &'s Timetable {
        self.snapshot.resolve(pattern, date)
    }

    pub fn added_pattern(&self, trip_id: &TripId, date: NaiveDate) -> Option<&Arc<TripPattern>> {
        self.snapshot.added_pattern(trip_id, date)
    }

    pub fn update(&mut self, pattern: &Arc<TripPattern>, date: NaiveDate, trip_times: TripTimes) {
        match self.snapshot.update(pattern, date, trip_times) {
            Ok(()) => {}
            Err(SnapshotError::Frozen) => unreachable!("the builder snapshot is never frozen"),
        }
    }

    pub fn set_added_pattern(
        &mut self,
        trip_id: TripId,
        date: NaiveDate,
        pattern: Arc<TripPattern>,
    ) {
        match self.snapshot.set_added_pattern(trip_id, date, pattern) {
            Ok(()) => {}
            Err(SnapshotError::Frozen) => unreachable!("the builder snapshot is never frozen"),
        }
    }

    /// Whether this generation staged anything. The dirty set only
    /// tracks the current generation, not overlays inherited from the
    /// published snapshot.
    pub fn has_changes(&self) -> bool {
        !self.snapshot.dirty.is_empty()
    }

    /// Freeze the staged snapshot and publish it as the current one.
    /// Readers holding the previous snapshot keep it until they finish.
    pub fn commit(self) -> Arc<TimetableSnapshot> {
        let frozen = self.snapshot.commit();
        self.source.current.store(Arc::clone(&frozen));
        frozen
    }
}
