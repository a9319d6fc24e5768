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

use tracing::{debug, warn};

use crate::{
    config::{ApplierConfig, PatternSynthesis},
    deduplicator::Deduplicator,
    models::{self, BaseModel, PatternIdx, Trip},
    realtime::{
        messages::{self, TripRef, Update, UpdateBatch, UpdateError, UpdateResult},
        snapshot::{SnapshotBuilder, TimetableSnapshotSource},
    },
    timetables::{StopPattern, TripPattern, TripTimes},
};

/// Turns real time records into new trip time vectors and publishes
/// them.
///
/// One applier is the single writer of its snapshot source: records of a
/// batch are staged on the snapshot builder, validated one by one, and
/// committed together. A rejected record leaves its trip untouched and
/// never prevents the rest of the batch from applying. Feeds updated by
/// several producers must each get their own applier and coordinate
/// outside this crate.
pub struct UpdateApplier {
    config: ApplierConfig,
    deduplicator: Deduplicator,
    next_new_pattern: u64,
}

impl Default for UpdateApplier {
    fn default() -> Self {
        Self::new(ApplierConfig::default())
    }
}

impl UpdateApplier {
    pub fn new(config: ApplierConfig) -> Self {
        Self {
            config,
            deduplicator: Deduplicator::new(),
            next_new_pattern: 0,
        }
    }

    /// Apply a batch and publish the resulting snapshot. Returns the per
    /// record outcomes, in batch order. When every record is rejected,
    /// nothing is published and readers keep the previous snapshot.
    pub fn apply(
        &mut self,
        base: &BaseModel,
        source: &TimetableSnapshotSource,
        batch: &UpdateBatch,
    ) -> UpdateResult {
        let mut builder = source.builder();
        let mut result = UpdateResult::with_capacity(batch.updates.len());
        for update in &batch.updates {
            let outcome = self.apply_one(base, &mut builder, update);
            if let Err(err) = &outcome {
                warn!(
                    "Rejecting real time update for trip {}. {}",
                    update.trip(),
                    err
                );
            }
            result.push(outcome);
        }
        if builder.has_changes() {
            let snapshot = builder.commit();
            debug!(
                "Published timetable snapshot version {} holding {} pattern-day overlays",
                snapshot.version(),
                snapshot.nb_of_overlays()
            );
        }
        result
    }

    fn apply_one(
        &mut self,
        base: &BaseModel,
        builder: &mut SnapshotBuilder<'_>,
        update: &Update,
    ) -> Result<(), UpdateError> {
        match update {
            Update::Delay {
                trip,
                stop_time_updates,
            } => {
                let (pattern, mut trip_times) = locate_trip(base, builder, trip)?;
                for stop_time_update in stop_time_updates {
                    let stop_index = trip_times
                        .stop_index_of_sequence(stop_time_update.stop_sequence)
                        .ok_or_else(|| {
                            UpdateError::UnknownStopSequence(
                                trip.clone(),
                                stop_time_update.stop_sequence,
                            )
                        })?;
                    if let Some(delay) = stop_time_update.arrival_delay {
                        trip_times.update_arrival_delay(stop_index, delay);
                    }
                    if let Some(delay) = stop_time_update.departure_delay {
                        trip_times.update_departure_delay(stop_index, delay);
                    }
                }
                if !trip_times.times_increasing() {
                    return Err(UpdateError::InconsistentUpdate(trip.clone()));
                }
                builder.update(&pattern, trip.date, trip_times);
                Ok(())
            }
            Update::Cancel { trip } => {
                let (pattern, mut trip_times) = locate_trip(base, builder, trip)?;
                trip_times.cancel();
                builder.update(&pattern, trip.date, trip_times);
                Ok(())
            }
            Update::SkipStop {
                trip,
                stop_sequence,
            } => {
                let (pattern, mut trip_times) = locate_trip(base, builder, trip)?;
                let stop_index = trip_times
                    .stop_index_of_sequence(*stop_sequence)
                    .ok_or_else(|| {
                        UpdateError::UnknownStopSequence(trip.clone(), *stop_sequence)
                    })?;
                trip_times.cancel_stop(stop_index);
                builder.update(&pattern, trip.date, trip_times);
                Ok(())
            }
            Update::PredictionInaccurate {
                trip,
                stop_sequence,
            } => {
                let (pattern, mut trip_times) = locate_trip(base, builder, trip)?;
                let stop_index = trip_times
                    .stop_index_of_sequence(*stop_sequence)
                    .ok_or_else(|| {
                        UpdateError::UnknownStopSequence(trip.clone(), *stop_sequence)
                    })?;
                trip_times.set_prediction_inaccurate(stop_index, true);
                builder.update(&pattern, trip.date, trip_times);
                Ok(())
            }
            Update::Observation {
                trip,
                stop_sequence,
                arrival_time,
                departure_time,
            } => {
                let (pattern, mut trip_times) = locate_trip(base, builder, trip)?;
                let stop_index = trip_times
                    .stop_index_of_sequence(*stop_sequence)
                    .ok_or_else(|| {
                        UpdateError::UnknownStopSequence(trip.clone(), *stop_sequence)
                    })?;
                if let Some(time) = arrival_time {
                    trip_times.update_arrival_time(stop_index, *time);
                }
                if let Some(time) = departure_time {
                    trip_times.update_departure_time(stop_index, *time);
                }
                trip_times.set_recorded(stop_index, true);
                if !trip_times.times_increasing() {
                    return Err(UpdateError::InconsistentUpdate(trip.clone()));
                }
                builder.update(&pattern, trip.date, trip_times);
                Ok(())
            }
            Update::Add {
                trip,
                route_name,
                direction,
                headsign,
                stop_times,
            } => {
                if builder.added_pattern(&trip.trip_id, trip.date).is_some()
                    || base.trip_times(&trip.trip_id).is_some()
                {
                    return Err(UpdateError::TripAlreadyExists(trip.clone()));
                }
                let stop_times = resolve_stop_times(base, trip, stop_times)?;
                let trip_object = Arc::new(Trip {
                    id: trip.trip_id.clone(),
                    route_name: route_name.clone(),
                    direction: *direction,
                    headsign: headsign.clone(),
                });
                let mut trip_times =
                    TripTimes::new(trip_object, &stop_times, &mut self.deduplicator)
                        .map_err(|cause| UpdateError::Malformed(trip.clone(), cause))?;
                trip_times.mark_added();
                let stop_pattern =
                    StopPattern::from_stop_times(&stop_times, &mut self.deduplicator);
                let pattern =
                    self.find_or_synthesize_pattern(base, builder, trip, route_name, stop_pattern)?;
                builder.update(&pattern, trip.date, trip_times);
                Ok(())
            }
            Update::Modify { trip, stop_times } => {
                let (original_pattern, original_times) = locate_trip(base, builder, trip)?;
                let stop_times = resolve_stop_times(base, trip, stop_times)?;
                let mut new_times = TripTimes::new(
                    Arc::clone(original_times.trip()),
                    &stop_times,
                    &mut self.deduplicator,
                )
                .map_err(|cause| UpdateError::Malformed(trip.clone(), cause))?;
                new_times.mark_modified();
                let stop_pattern =
                    StopPattern::from_stop_times(&stop_times, &mut self.deduplicator);
                if *original_pattern.stop_pattern() == stop_pattern {
                    builder.update(&original_pattern, trip.date, new_times);
                } else {
                    let route_name = original_pattern.route_name().to_string();
                    let new_pattern = self.find_or_synthesize_pattern(
                        base,
                        builder,
                        trip,
                        &route_name,
                        stop_pattern,
                    )?;
                    // the run leaves its former pattern: cancel it there
                    // so readers cannot board a ghost
                    let mut canceled = original_times;
                    canceled.cancel();
                    builder.update(&original_pattern, trip.date, canceled);
                    builder.update(&new_pattern, trip.date, new_times);
                }
                Ok(())
            }
        }
    }

    /// Reuse the base pattern carrying the same route and shape when one
    /// exists; otherwise synthesize one, if the configuration allows.
    /// Either way the chosen pattern is registered for the trip, so that
    /// later records can find the run again.
    fn find_or_synthesize_pattern(
        &mut self,
        base: &BaseModel,
        builder: &mut SnapshotBuilder<'_>,
        trip: &TripRef,
        route_name: &str,
        stop_pattern: StopPattern,
    ) -> Result<Arc<TripPattern>, UpdateError> {
        let pattern = match base.find_pattern(route_name, &stop_pattern) {
            Some(pattern) => Arc::clone(pattern),
            None => match self.config.pattern_synthesis {
                PatternSynthesis::Reject => {
                    return Err(UpdateError::PatternStructureRequired(trip.clone()));
                }
                PatternSynthesis::Allow => {
                    let idx = PatternIdx::New(self.next_new_pattern);
                    self.next_new_pattern += 1;
                    Arc::new(TripPattern::new(idx, route_name.to_string(), stop_pattern))
                }
            },
        };
        builder.set_added_pattern(trip.trip_id.clone(), trip.date, Arc::clone(&pattern));
        Ok(pattern)
    }
}

/// Find the pattern and the current effective times of the designated
/// trip: among runs created at runtime first, in the schedule otherwise.
/// The returned times are an owned copy, free to mutate and stage.
fn locate_trip(
    base: &BaseModel,
    builder: &SnapshotBuilder<'_>,
    trip: &TripRef,
) -> Result<(Arc<TripPattern>, TripTimes), UpdateError> {
    let pattern = builder
        .added_pattern(&trip.trip_id, trip.date)
        .cloned()
        .or_else(|| base.pattern_of_trip(&trip.trip_id).cloned())
        .ok_or_else(|| UpdateError::UnknownTrip(trip.clone()))?;
    let trip_times = {
        let timetable = builder.resolve(&pattern, trip.date);
        let trip_times = timetable
            .trip_times_for_trip(&trip.trip_id)
            .ok_or_else(|| UpdateError::UnknownTrip(trip.clone()))?;
        // a still-scheduled run must actually run on the date; runs
        // already touched by real time are pinned to their timetable's
        // date
        if trip_times.is_scheduled() && !base.trip_runs_on(&trip.trip_id, trip.date) {
            return Err(UpdateError::NotRunningOnDate(trip.clone()));
        }
        (**trip_times).clone()
    };
    Ok((pattern, trip_times))
}

/// Resolve the stop ids of an added/modified trip against the base
/// model. The core never fabricates stops.
fn resolve_stop_times(
    base: &BaseModel,
    trip: &TripRef,
    records: &[messages::StopTime],
) -> Result<Vec<models::StopTime>, UpdateError> {
    records
        .iter()
        .map(|record| {
            let stop = base
                .stop_point_idx(&record.stop_id)
                .ok_or_else(|| UpdateError::UnknownStop(trip.clone(), record.stop_id.clone()))?;
            Ok(models::StopTime {
                stop,
                arrival_time: record.arrival_time,
                departure_time: record.departure_time,
                stop_sequence: record.stop_sequence,
                timepoint: false,
                pickup: record.pickup,
                dropoff: record.dropoff,
                stop_headsign: None,
                pickup_booking_info: None,
                dropoff_booking_info: None,
            })
        })
        .collect()
}
