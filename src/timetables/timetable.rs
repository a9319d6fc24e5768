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

use std::sync::Arc;

use fixedbitset::FixedBitSet;

use crate::{models::TripId, time::SecondsSinceDayStart, timetables::TripTimes};

/// The trip time vectors of one pattern, ordered by first arrival.
///
/// The order is what an earliest-departure search walks, under the
/// assumption that no trip overtakes another on the same pattern (datasets
/// violating this are rejected upstream). Replacing a trip may leave the
/// order stale; the snapshot re-sorts touched timetables when it commits.
#[derive(Debug, Clone, Default)]
pub struct Timetable {
    trip_times: Vec<Arc<TripTimes>>,
}

impl Timetable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nb_of_trips(&self) -> usize {
        self.trip_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trip_times.is_empty()
    }

    /// Iterate in first-arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TripTimes>> {
        self.trip_times.iter()
    }

    /// Iterate over the trips whose service runs on the queried date,
    /// given the mask of running service codes. Trips without a service
    /// code (real time only trips of a per-date timetable) always run.
    pub fn trips_running_on<'a>(
        &'a self,
        running_services: &'a FixedBitSet,
    ) -> impl Iterator<Item = &'a Arc<TripTimes>> {
        self.trip_times.iter().filter(move |trip_times| {
            trip_times
                .service_code()
                .map_or(true, |service| running_services.contains(service.idx))
        })
    }

    pub fn trip_times_for_trip(&self, trip_id: &TripId) -> Option<&Arc<TripTimes>> {
        self.trip_times
            .iter()
            .find(|trip_times| &trip_times.trip().id == trip_id)
    }

    /// Insert keeping the first-arrival order. This is the common case:
    /// scheduled construction feeds trips roughly in order.
    pub fn insert(&mut self, trip_times: Arc<TripTimes>) {
        let sort_index = trip_times.sort_index();
        let position = self
            .trip_times
            .partition_point(|other| other.sort_index() <= sort_index);
        self.trip_times.insert(position, trip_times);
    }

    /// Replace the times of the trip already present, or insert them in
    /// order. Returns true when a replacement took place; the caller is
    /// then responsible for re-sorting before readers see the timetable.
    pub fn replace_or_insert(&mut self, trip_times: Arc<TripTimes>) -> bool {
        let trip_id = &trip_times.trip().id;
        if let Some(position) = self
            .trip_times
            .iter()
            .position(|other| &other.trip().id == trip_id)
        {
            self.trip_times[position] = trip_times;
            true
        } else {
            self.insert(trip_times);
            false
        }
    }

    /// Earliest trip that can be boarded at `stop_index` at or after
    /// `waiting_time`. Canceled runs and stops closed to boarding are
    /// skipped.
    pub fn earliest_boardable_trip(
        &self,
        stop_index: usize,
        waiting_time: SecondsSinceDayStart,
        running_services: Option<&FixedBitSet>,
    ) -> Option<&Arc<TripTimes>> {
        self.trip_times.iter().find(|trip_times| {
            if trip_times.is_canceled() {
                return false;
            }
            if !trip_times.pickup(stop_index).is_allowed() {
                return false;
            }
            if let Some(running) = running_services {
                let runs = trip_times
                    .service_code()
                    .map_or(true, |service| running.contains(service.idx));
                if !runs {
                    return false;
                }
            }
            trip_times.departure_time(stop_index) >= waiting_time
        })
    }

    /// Restore the first-arrival order after replacements. Stable, so
    /// simultaneous trips keep their insertion order.
    pub fn sort_by_first_arrival(&mut self) {
        self.trip_times
            .sort_by_key(|trip_times| trip_times.sort_index());
    }

    #[cfg(test)]
    fn is_sorted(&self) -> bool {
        self.trip_times
            .windows(2)
            .all(|pair| pair[0].sort_index() <= pair[1].sort_index())
    }
}
