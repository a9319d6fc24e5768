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

use crate::{
    deduplicator::Deduplicator,
    models::{PatternIdx, PickDrop, StopPointIdx, StopTime},
    timetables::Timetable,
};

/// The ordered stops visited by a set of trips, with the boarding rule
/// declared at each stop.
///
/// Two trips belong to the same pattern exactly when their stop
/// pattern compares equal, which is what lets thousands of runs share
/// one shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StopPattern {
    stops: Arc<[StopPointIdx]>,
    pickups: Arc<[PickDrop]>,
    dropoffs: Arc<[PickDrop]>,
}

impl StopPattern {
    pub fn from_stop_times(stop_times: &[StopTime], deduplicator: &mut Deduplicator) -> Self {
        let stops: Vec<StopPointIdx> = stop_times.iter().map(|stop_time| stop_time.stop).collect();
        let pickups: Vec<PickDrop> = stop_times.iter().map(|stop_time| stop_time.pickup).collect();
        let dropoffs: Vec<PickDrop> =
            stop_times.iter().map(|stop_time| stop_time.dropoff).collect();
        Self {
            stops: stops.into(),
            pickups: deduplicator.intern_pick_drop_array(pickups),
            dropoffs: deduplicator.intern_pick_drop_array(dropoffs),
        }
    }

    pub fn nb_of_stops(&self) -> usize {
        self.stops.len()
    }

    pub fn stop_at(&self, position: usize) -> StopPointIdx {
        self.stops[position]
    }

    pub fn stops(&self) -> impl Iterator<Item = StopPointIdx> + '_ {
        self.stops.iter().copied()
    }

    pub fn can_board(&self, position: usize) -> bool {
        self.pickups[position].is_allowed()
    }

    pub fn can_debark(&self, position: usize) -> bool {
        self.dropoffs[position].is_allowed()
    }
}

/// The static shape shared by many trips: a stop pattern on a route,
/// owning the timetable of the published schedule.
///
/// Never mutated at runtime; real time overlays live in the snapshot,
/// keyed by this pattern and a service date.
#[derive(Debug, Clone)]
pub struct TripPattern {
    idx: PatternIdx,
    route_name: String,
    stop_pattern: StopPattern,
    scheduled_timetable: Timetable,
}

impl TripPattern {
    pub fn new(idx: PatternIdx, route_name: String, stop_pattern: StopPattern) -> Self {
        Self {
            idx,
            route_name,
            stop_pattern,
            scheduled_timetable: Timetable::new(),
        }
    }

    pub fn idx(&self) -> PatternIdx {
        self.idx
    }

    pub fn route_name(&self) -> &str {
        &self.route_name
    }

    pub fn stop_pattern(&self) -> &StopPattern {
        &self.stop_pattern
    }

    pub fn nb_of_stops(&self) -> usize {
        self.stop_pattern.nb_of_stops()
    }

    /// The timetable of the published schedule, the fallback of every
    /// snapshot resolution.
    pub fn scheduled_timetable(&self) -> &Timetable {
        &self.scheduled_timetable
    }

    pub(crate) fn scheduled_timetable_mut(&mut self) -> &mut Timetable {
        &mut self.scheduled_timetable
    }
}
