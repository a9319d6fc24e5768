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
    collections::HashMap,
    fmt::{Display, Formatter},
    sync::Arc,
};

use chrono::NaiveDate;
use tracing::warn;

use crate::{
    deduplicator::Deduplicator,
    models::{
        calendar::{ServiceCalendar, ServiceCode},
        PatternIdx, StopPointIdx, StopTime, Trip, TripId,
    },
    timetables::{MalformedSchedule, StopPattern, TripPattern, TripTimes},
};

#[derive(Debug, Clone)]
pub struct StopData {
    pub id: String,
    pub name: String,
}

/// The published schedule: stops, patterns, trips and the service
/// calendar, immutable once built. Everything the snapshot machinery
/// falls back to when no real time overlay exists.
pub struct BaseModel {
    stops: Vec<StopData>,
    stop_id_to_idx: HashMap<String, StopPointIdx>,

    // indexed by PatternIdx::Base
    patterns: Vec<Arc<TripPattern>>,
    patterns_by_shape: HashMap<(String, StopPattern), usize>,
    trip_to_pattern: HashMap<TripId, usize>,

    calendar: ServiceCalendar,
}

impl BaseModel {
    pub fn builder() -> BaseModelBuilder {
        BaseModelBuilder::new()
    }

    pub fn nb_of_stops(&self) -> usize {
        self.stops.len()
    }

    pub fn stop_point_idx(&self, stop_id: &str) -> Option<StopPointIdx> {
        self.stop_id_to_idx.get(stop_id).copied()
    }

    pub fn stop_data(&self, stop: StopPointIdx) -> &StopData {
        &self.stops[stop.idx]
    }

    pub fn nb_of_patterns(&self) -> usize {
        self.patterns.len()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &Arc<TripPattern>> {
        self.patterns.iter()
    }

    pub fn pattern(&self, idx: PatternIdx) -> Option<&Arc<TripPattern>> {
        match idx {
            PatternIdx::Base(position) => self.patterns.get(position),
            PatternIdx::New(_) => None,
        }
    }

    pub fn pattern_of_trip(&self, trip_id: &TripId) -> Option<&Arc<TripPattern>> {
        self.trip_to_pattern
            .get(trip_id)
            .and_then(|&position| self.patterns.get(position))
    }

    /// The pattern whose shape and route match, if one was built.
    /// Added/modified trips try to reuse an existing pattern through
    /// this before synthesizing one.
    pub fn find_pattern(
        &self,
        route_name: &str,
        stop_pattern: &StopPattern,
    ) -> Option<&Arc<TripPattern>> {
        self.patterns_by_shape
            .get(&(route_name.to_string(), stop_pattern.clone()))
            .and_then(|&position| self.patterns.get(position))
    }

    /// The scheduled times of a trip, regardless of any real time
    /// overlay.
    pub fn trip_times(&self, trip_id: &TripId) -> Option<&Arc<TripTimes>> {
        self.pattern_of_trip(trip_id)
            .and_then(|pattern| pattern.scheduled_timetable().trip_times_for_trip(trip_id))
    }

    pub fn trip_runs_on(&self, trip_id: &TripId, date: NaiveDate) -> bool {
        self.trip_times(trip_id)
            .and_then(|trip_times| trip_times.service_code())
            .map_or(false, |service| self.calendar.is_running(service, date))
    }

    pub fn calendar(&self) -> &ServiceCalendar {
        &self.calendar
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTripError {
    DuplicateTrip(TripId),
    Malformed(TripId, MalformedSchedule),
}

impl Display for AddTripError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AddTripError::DuplicateTrip(trip_id) => {
                write!(f, "Trip {} is already present in the model.", trip_id)
            }
            AddTripError::Malformed(trip_id, cause) => {
                write!(f, "Cannot add trip {}. {}", trip_id, cause)
            }
        }
    }
}

impl std::error::Error for AddTripError {}

/// Single threaded assembly of a [`BaseModel`]: collects stops, services
/// and trips, groups trips into patterns by shape, and interns shared
/// arrays through one deduplicator.
pub struct BaseModelBuilder {
    stops: Vec<StopData>,
    stop_id_to_idx: HashMap<String, StopPointIdx>,

    patterns: Vec<TripPattern>,
    patterns_by_shape: HashMap<(String, StopPattern), usize>,
    trip_to_pattern: HashMap<TripId, usize>,

    calendar: ServiceCalendar,
    deduplicator: Deduplicator,
}

impl Default for BaseModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseModelBuilder {
    pub fn new() -> Self {
        Self {
            stops: Vec::new(),
            stop_id_to_idx: HashMap::new(),
            patterns: Vec::new(),
            patterns_by_shape: HashMap::new(),
            trip_to_pattern: HashMap::new(),
            calendar: ServiceCalendar::new(),
            deduplicator: Deduplicator::new(),
        }
    }

    pub fn add_stop(&mut self, stop_id: &str, name: &str) -> StopPointIdx {
        if let Some(idx) = self.stop_id_to_idx.get(stop_id) {
            return *idx;
        }
        let idx = StopPointIdx {
            idx: self.stops.len(),
        };
        self.stops.push(StopData {
            id: stop_id.to_string(),
            name: name.to_string(),
        });
        self.stop_id_to_idx.insert(stop_id.to_string(), idx);
        idx
    }

    pub fn add_service<Dates>(&mut self, dates: Dates) -> ServiceCode
    where
        Dates: IntoIterator<Item = NaiveDate>,
    {
        self.calendar.add_service(dates)
    }

    /// Register one run. Trips sharing a route and a stop pattern end up
    /// in the same pattern; a new pattern is created otherwise.
    pub fn add_trip(
        &mut self,
        trip: Trip,
        service: ServiceCode,
        stop_times: &[StopTime],
    ) -> Result<(), AddTripError> {
        if self.trip_to_pattern.contains_key(&trip.id) {
            return Err(AddTripError::DuplicateTrip(trip.id));
        }
        let trip_id = trip.id.clone();
        let route_name = trip.route_name.clone();
        let mut trip_times =
            TripTimes::new(Arc::new(trip), stop_times, &mut self.deduplicator)
                .map_err(|cause| {
                    warn!("Dropping malformed trip {}", trip_id);
                    AddTripError::Malformed(trip_id.clone(), cause)
                })?;
        trip_times.set_service_code(service);

        let stop_pattern = StopPattern::from_stop_times(stop_times, &mut self.deduplicator);
        let shape_key = (route_name.clone(), stop_pattern.clone());
        let position = match self.patterns_by_shape.get(&shape_key) {
            Some(&position) => position,
            None => {
                let position = self.patterns.len();
                self.patterns.push(TripPattern::new(
                    PatternIdx::Base(position),
                    route_name,
                    stop_pattern,
                ));
                self.patterns_by_shape.insert(shape_key, position);
                position
            }
        };
        self.patterns[position]
            .scheduled_timetable_mut()
            .insert(Arc::new(trip_times));
        self.trip_to_pattern.insert(trip_id, position);
        Ok(())
    }

    pub fn build(self) -> BaseModel {
        self.deduplicator.log_deduplication_results();
        BaseModel {
            stops: self.stops,
            stop_id_to_idx: self.stop_id_to_idx,
            patterns: self.patterns.into_iter().map(Arc::new).collect(),
            patterns_by_shape: self.patterns_by_shape,
            trip_to_pattern: self.trip_to_pattern,
            calendar: self.calendar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::Direction, time::SecondsSinceDayStart};

    fn trip(trip_id: &str, route: &str) -> Trip {
        Trip {
            id: TripId::new("f1", trip_id),
            route_name: route.to_string(),
            direction: Direction::Outbound,
            headsign: None,
        }
    }

    fn date(text: &str) -> NaiveDate {
        text.parse().unwrap()
    }

    #[test]
    fn trips_with_same_shape_share_a_pattern() {
        let mut builder = BaseModel::builder();
        let stop_a = builder.add_stop("A", "Alpha");
        let stop_b = builder.add_stop("B", "Bravo");
        let service = builder.add_service(vec![date("2020-01-01")]);

        for (trip_id, offset) in [("first", 0), ("second", 3600)] {
            let stop_times = vec![
                StopTime::simple(
                    stop_a,
                    SecondsSinceDayStart::from_seconds(36000 + offset),
                    SecondsSinceDayStart::from_seconds(36000 + offset),
                    1,
                ),
                StopTime::simple(
                    stop_b,
                    SecondsSinceDayStart::from_seconds(36600 + offset),
                    SecondsSinceDayStart::from_seconds(36600 + offset),
                    2,
                ),
            ];
            builder
                .add_trip(trip(trip_id, "route_1"), service, &stop_times)
                .unwrap();
        }
        let model = builder.build();

        assert_eq!(model.nb_of_patterns(), 1);
        let pattern = model.pattern_of_trip(&TripId::new("f1", "first")).unwrap();
        assert_eq!(pattern.scheduled_timetable().nb_of_trips(), 2);
        assert!(model.trip_runs_on(&TripId::new("f1", "first"), date("2020-01-01")));
        assert!(!model.trip_runs_on(&TripId::new("f1", "first"), date("2020-01-02")));
    }

    #[test]
    fn duplicate_trip_is_rejected() {
        let mut builder = BaseModel::builder();
        let stop_a = builder.add_stop("A", "Alpha");
        let stop_b = builder.add_stop("B", "Bravo");
        let service = builder.add_service(vec![date("2020-01-01")]);
        let stop_times = vec![
            StopTime::simple(
                stop_a,
                SecondsSinceDayStart::from_seconds(36000),
                SecondsSinceDayStart::from_seconds(36000),
                1,
            ),
            StopTime::simple(
                stop_b,
                SecondsSinceDayStart::from_seconds(36600),
                SecondsSinceDayStart::from_seconds(36600),
                2,
            ),
        ];
        builder
            .add_trip(trip("first", "route_1"), service, &stop_times)
            .unwrap();
        let result = builder.add_trip(trip("first", "route_1"), service, &stop_times);
        assert_eq!(
            result.unwrap_err(),
            AddTripError::DuplicateTrip(TripId::new("f1", "first"))
        );
    }

    #[test]
    fn stops_are_deduplicated_by_id() {
        let mut builder = BaseModel::builder();
        let first = builder.add_stop("A", "Alpha");
        let second = builder.add_stop("A", "Alpha again");
        assert_eq!(first, second);
        let model = builder.build();
        assert_eq!(model.nb_of_stops(), 1);
        assert_eq!(model.stop_data(first).name, "Alpha");
    }
}
