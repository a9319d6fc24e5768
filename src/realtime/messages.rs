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

use std::fmt::{Display, Formatter};

use chrono::NaiveDate;

use crate::{
    models::{Direction, PickDrop, TripId},
    time::SecondsSinceDayStart,
    timetables::MalformedSchedule,
};

/// How a real time producer designates a trip: by feed scoped trip id
/// and service date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TripRef {
    pub trip_id: TripId,
    pub date: NaiveDate,
}

impl TripRef {
    pub fn new(trip_id: TripId, date: NaiveDate) -> Self {
        Self { trip_id, date }
    }
}

impl Display for TripRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}", self.trip_id, self.date)
    }
}

/// Delay information for one stop of a trip update. Stops are designated
/// by their feed declared GTFS stop sequence, never by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTimeUpdate {
    pub stop_sequence: u32,
    pub arrival_delay: Option<i32>,
    pub departure_delay: Option<i32>,
}

/// A full stop time carried by an added or modified trip. Stops are
/// designated by id; the stop must exist in the base model.
#[derive(Debug, Clone)]
pub struct StopTime {
    pub stop_id: String,
    pub arrival_time: SecondsSinceDayStart,
    pub departure_time: SecondsSinceDayStart,
    pub stop_sequence: u32,
    pub pickup: PickDrop,
    pub dropoff: PickDrop,
}

/// One typed real time record.
#[derive(Debug, Clone)]
pub enum Update {
    /// Per stop delays relative to the schedule.
    Delay {
        trip: TripRef,
        stop_time_updates: Vec<StopTimeUpdate>,
    },
    /// The whole run is canceled.
    Cancel { trip: TripRef },
    /// The vehicle will not serve one stop.
    SkipStop { trip: TripRef, stop_sequence: u32 },
    /// A run absent from the schedule.
    Add {
        trip: TripRef,
        route_name: String,
        direction: Direction,
        headsign: Option<String>,
        stop_times: Vec<StopTime>,
    },
    /// A scheduled run replaced wholesale, possibly on another pattern.
    Modify {
        trip: TripRef,
        stop_times: Vec<StopTime>,
    },
    /// The prediction at one stop is known to be low quality.
    PredictionInaccurate { trip: TripRef, stop_sequence: u32 },
    /// The vehicle was observed at one stop: times become recordings.
    Observation {
        trip: TripRef,
        stop_sequence: u32,
        arrival_time: Option<SecondsSinceDayStart>,
        departure_time: Option<SecondsSinceDayStart>,
    },
}

impl Update {
    pub fn trip(&self) -> &TripRef {
        match self {
            Update::Delay { trip, .. }
            | Update::Cancel { trip }
            | Update::SkipStop { trip, .. }
            | Update::Add { trip, .. }
            | Update::Modify { trip, .. }
            | Update::PredictionInaccurate { trip, .. }
            | Update::Observation { trip, .. } => trip,
        }
    }
}

/// A sequence of records applied and published together.
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
    pub updates: Vec<Update>,
}

impl UpdateBatch {
    pub fn new(updates: Vec<Update>) -> Self {
        Self { updates }
    }
}

/// Why one record was rejected. A rejection never poisons its batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// The designated trip exists neither in the schedule nor among
    /// added trips.
    UnknownTrip(TripRef),
    /// The trip exists but its service does not run on the designated
    /// date.
    NotRunningOnDate(TripRef),
    /// No stop of the trip carries this GTFS stop sequence.
    UnknownStopSequence(TripRef, u32),
    /// An added/modified trip references a stop absent from the model.
    UnknownStop(TripRef, String),
    /// Applying the record would produce a negative dwell or running
    /// time; the trip keeps its previous state.
    InconsistentUpdate(TripRef),
    /// The trip fits no existing pattern and pattern synthesis is
    /// disabled.
    PatternStructureRequired(TripRef),
    /// An added trip already exists on this date.
    TripAlreadyExists(TripRef),
    /// The stop times of an added/modified trip are not monotonic.
    Malformed(TripRef, MalformedSchedule),
}

impl Display for UpdateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::UnknownTrip(trip) => {
                write!(f, "Trip {} is unknown.", trip)
            }
            UpdateError::NotRunningOnDate(trip) => {
                write!(f, "Trip {} does not run on this date.", trip.trip_id)
            }
            UpdateError::UnknownStopSequence(trip, stop_sequence) => {
                write!(
                    f,
                    "Trip {} has no stop with sequence number {}.",
                    trip, stop_sequence
                )
            }
            UpdateError::UnknownStop(trip, stop_id) => {
                write!(
                    f,
                    "Update for trip {} references unknown stop `{}`.",
                    trip, stop_id
                )
            }
            UpdateError::InconsistentUpdate(trip) => {
                write!(
                    f,
                    "Update for trip {} implies decreasing times and was rolled back.",
                    trip
                )
            }
            UpdateError::PatternStructureRequired(trip) => {
                write!(
                    f,
                    "Trip {} fits no existing pattern and pattern synthesis is disabled.",
                    trip
                )
            }
            UpdateError::TripAlreadyExists(trip) => {
                write!(f, "Trip {} already exists.", trip)
            }
            UpdateError::Malformed(trip, cause) => {
                write!(f, "Stop times of trip {} are unusable. {}", trip, cause)
            }
        }
    }
}

impl std::error::Error for UpdateError {}

/// The per record outcomes of one batch, in batch order.
#[derive(Debug, Default)]
pub struct UpdateResult {
    outcomes: Vec<Result<(), UpdateError>>,
}

impl UpdateResult {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, outcome: Result<(), UpdateError>) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[Result<(), UpdateError>] {
        &self.outcomes
    }

    pub fn nb_of_applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.is_ok())
            .count()
    }

    pub fn nb_of_rejected(&self) -> usize {
        self.outcomes.len() - self.nb_of_applied()
    }

    pub fn errors(&self) -> impl Iterator<Item = &UpdateError> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.as_ref().err())
    }

    pub fn is_fully_applied(&self) -> bool {
        self.nb_of_rejected() == 0
    }
}
