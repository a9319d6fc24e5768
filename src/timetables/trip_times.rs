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
    fmt::{Display, Formatter},
    hash::Hasher,
    sync::Arc,
};

use fixedbitset::FixedBitSet;
use tracing::warn;

use crate::{
    deduplicator::Deduplicator,
    models::{BookingInfo, PickDrop, RealTimeState, ServiceCode, StopTime, Trip},
    time::SecondsSinceDayStart,
};

/// The arrival and departure times of a single trip, plus its per stop
/// metadata.
///
/// All times are seconds since midnight of the service day. The
/// scheduled arrays are normalized so that the first arrival is zero,
/// with the original value recoverable through `time_shift`; this lets
/// trips with the same relative schedule share the same arrays, and
/// lets frequency based services materialize as cheap shifted copies.
///
/// Real time updates live in a separate overlay holding absolute (not
/// shifted) times. A trip times with no overlay is scheduled; readers
/// on the scheduled path never touch the overlay and never allocate.
#[derive(Debug, Clone)]
pub struct TripTimes {
    trip: Arc<Trip>,
    service_code: Option<ServiceCode>,
    time_shift: i32,

    // normalized: scheduled_arrival_times[0] == 0
    scheduled_arrival_times: Arc<[i32]>,
    scheduled_departure_times: Arc<[i32]>,

    // absolute times; both present or both absent
    arrival_times: Option<Vec<i32>>,
    departure_times: Option<Vec<i32>>,

    // observation metadata, allocated together with the overlay.
    // Never consulted by time queries.
    recorded_stops: Option<Vec<bool>>,
    prediction_inaccurate: Option<Vec<bool>>,

    pickups: Arc<[PickDrop]>,
    dropoffs: Arc<[PickDrop]>,
    pickup_booking_infos: Arc<[Option<BookingInfo>]>,
    dropoff_booking_infos: Arc<[Option<BookingInfo>]>,

    // None means "use the trip headsign at every stop"
    headsigns: Option<Arc<[Option<String>]>>,

    /// Feed-declared GTFS stop sequence numbers. Real time messages
    /// reference stops with these, and two trips on the same pattern may
    /// number the same stops differently, so the mapping is kept per
    /// trip.
    stop_sequences: Arc<[u32]>,

    timepoints: Arc<FixedBitSet>,

    real_time_state: RealTimeState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionPair {
    pub upstream: usize,
    pub downstream: usize,
}

/// Construction-time rejection: the provided stop times do not form a
/// usable schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedSchedule {
    NoStops,
    /// departure_time < arrival_time at this position
    NegativeDwell { position: usize },
    /// arrival_time[downstream] < departure_time[upstream]
    NegativeRunningTime(PositionPair),
}

impl Display for MalformedSchedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedSchedule::NoStops => {
                write!(f, "A trip must serve at least one stop.")
            }
            MalformedSchedule::NegativeDwell { position } => {
                write!(
                    f,
                    "Departure before arrival at stop index {}.",
                    position
                )
            }
            MalformedSchedule::NegativeRunningTime(pair) => {
                write!(
                    f,
                    "Arrival at stop index {} before departure from stop index {}.",
                    pair.downstream, pair.upstream
                )
            }
        }
    }
}

impl std::error::Error for MalformedSchedule {}

impl TripTimes {
    /// Build the scheduled times of `trip` from its stop times.
    ///
    /// Times are normalized to the first arrival, every shared array goes
    /// through the deduplicator, and non monotonic input is rejected.
    pub fn new(
        trip: Arc<Trip>,
        stop_times: &[StopTime],
        deduplicator: &mut Deduplicator,
    ) -> Result<Self, MalformedSchedule> {
        if stop_times.is_empty() {
            return Err(MalformedSchedule::NoStops);
        }
        let nb_of_stops = stop_times.len();
        let time_shift = stop_times[0].arrival_time.total_seconds();

        let mut arrivals = Vec::with_capacity(nb_of_stops);
        let mut departures = Vec::with_capacity(nb_of_stops);
        let mut sequences = Vec::with_capacity(nb_of_stops);
        let mut pickups = Vec::with_capacity(nb_of_stops);
        let mut dropoffs = Vec::with_capacity(nb_of_stops);
        let mut pickup_bookings = Vec::with_capacity(nb_of_stops);
        let mut dropoff_bookings = Vec::with_capacity(nb_of_stops);
        let mut timepoints = FixedBitSet::with_capacity(nb_of_stops);

        let mut prev_departure: Option<i32> = None;
        for (position, stop_time) in stop_times.iter().enumerate() {
            let arrival = stop_time.arrival_time.total_seconds() - time_shift;
            let departure = stop_time.departure_time.total_seconds() - time_shift;
            if departure < arrival {
                warn!(
                    "Rejecting schedule of trip {}: departure before arrival at stop index {}",
                    trip.id, position
                );
                return Err(MalformedSchedule::NegativeDwell { position });
            }
            if let Some(prev) = prev_departure {
                if arrival < prev {
                    warn!(
                        "Rejecting schedule of trip {}: negative running time before stop index {}",
                        trip.id, position
                    );
                    return Err(MalformedSchedule::NegativeRunningTime(PositionPair {
                        upstream: position - 1,
                        downstream: position,
                    }));
                }
            }
            prev_departure = Some(departure);

            arrivals.push(arrival);
            departures.push(departure);
            sequences.push(stop_time.stop_sequence);
            pickups.push(stop_time.pickup);
            dropoffs.push(stop_time.dropoff);
            pickup_bookings.push(stop_time.pickup_booking_info.clone());
            dropoff_bookings.push(stop_time.dropoff_booking_info.clone());
            timepoints.set(position, stop_time.timepoint);
        }

        let headsigns = make_headsigns_array(&trip, stop_times)
            .map(|headsigns| deduplicator.intern_string_array(headsigns));

        Ok(Self {
            trip,
            service_code: None,
            time_shift,
            scheduled_arrival_times: deduplicator.intern_int_array(arrivals),
            scheduled_departure_times: deduplicator.intern_int_array(departures),
            arrival_times: None,
            departure_times: None,
            recorded_stops: None,
            prediction_inaccurate: None,
            pickups: deduplicator.intern_pick_drop_array(pickups),
            dropoffs: deduplicator.intern_pick_drop_array(dropoffs),
            pickup_booking_infos: deduplicator.intern_booking_info_array(pickup_bookings),
            dropoff_booking_infos: deduplicator.intern_booking_info_array(dropoff_bookings),
            headsigns,
            stop_sequences: deduplicator.intern_sequence_array(sequences),
            timepoints: deduplicator.intern_bit_set(timepoints),
            real_time_state: RealTimeState::Scheduled,
        })
    }

    pub fn trip(&self) -> &Arc<Trip> {
        &self.trip
    }

    pub fn nb_of_stops(&self) -> usize {
        self.scheduled_arrival_times.len()
    }

    pub fn service_code(&self) -> Option<ServiceCode> {
        self.service_code
    }

    /// Set while the base model is being assembled; real time only trips
    /// have no service code and are valid exactly on their timetable's
    /// date.
    pub fn set_service_code(&mut self, service_code: ServiceCode) {
        self.service_code = Some(service_code);
    }

    pub fn time_shift(&self) -> i32 {
        self.time_shift
    }

    pub fn real_time_state(&self) -> RealTimeState {
        self.real_time_state
    }

    /// True when no real time information is attached: every reader sees
    /// the published schedule.
    pub fn is_scheduled(&self) -> bool {
        self.arrival_times.is_none() && self.departure_times.is_none()
    }

    pub fn is_canceled(&self) -> bool {
        self.real_time_state == RealTimeState::Canceled
    }

    pub fn scheduled_arrival_time(&self, stop_index: usize) -> SecondsSinceDayStart {
        SecondsSinceDayStart::from_seconds(
            self.scheduled_arrival_times[stop_index] + self.time_shift,
        )
    }

    pub fn scheduled_departure_time(&self, stop_index: usize) -> SecondsSinceDayStart {
        SecondsSinceDayStart::from_seconds(
            self.scheduled_departure_times[stop_index] + self.time_shift,
        )
    }

    pub fn arrival_time(&self, stop_index: usize) -> SecondsSinceDayStart {
        match &self.arrival_times {
            // updated times are absolute, not shifted
            Some(arrivals) => SecondsSinceDayStart::from_seconds(arrivals[stop_index]),
            None => self.scheduled_arrival_time(stop_index),
        }
    }

    pub fn departure_time(&self, stop_index: usize) -> SecondsSinceDayStart {
        match &self.departure_times {
            Some(departures) => SecondsSinceDayStart::from_seconds(departures[stop_index]),
            None => self.scheduled_departure_time(stop_index),
        }
    }

    /// Seconds the vehicle waits at `stop_index`.
    pub fn dwell_time(&self, stop_index: usize) -> i32 {
        self.departure_time(stop_index)
            .seconds_since(&self.arrival_time(stop_index))
    }

    /// Seconds the vehicle takes to reach the next stop.
    pub fn running_time(&self, stop_index: usize) -> i32 {
        self.arrival_time(stop_index + 1)
            .seconds_since(&self.departure_time(stop_index))
    }

    pub fn arrival_delay(&self, stop_index: usize) -> i32 {
        self.arrival_time(stop_index)
            .seconds_since(&self.scheduled_arrival_time(stop_index))
    }

    pub fn departure_delay(&self, stop_index: usize) -> i32 {
        self.departure_time(stop_index)
            .seconds_since(&self.scheduled_departure_time(stop_index))
    }

    /// Key used to keep a timetable ordered. Trips on a pattern are
    /// assumed not to overtake each other, so the first arrival orders
    /// the whole run.
    pub fn sort_index(&self) -> SecondsSinceDayStart {
        self.arrival_time(0)
    }

    pub fn pickup(&self, stop_index: usize) -> PickDrop {
        self.pickups[stop_index]
    }

    pub fn dropoff(&self, stop_index: usize) -> PickDrop {
        self.dropoffs[stop_index]
    }

    pub fn pickup_booking_info(&self, stop_index: usize) -> Option<&BookingInfo> {
        self.pickup_booking_infos[stop_index].as_ref()
    }

    pub fn dropoff_booking_info(&self, stop_index: usize) -> Option<&BookingInfo> {
        self.dropoff_booking_infos[stop_index].as_ref()
    }

    pub fn headsign(&self, stop_index: usize) -> Option<&str> {
        self.headsigns
            .as_ref()
            .and_then(|headsigns| headsigns[stop_index].as_deref())
            .or(self.trip.headsign.as_deref())
    }

    pub fn stop_sequence(&self, stop_index: usize) -> u32 {
        self.stop_sequences[stop_index]
    }

    /// Map a feed-declared stop sequence number back to a stop index.
    /// Sequence numbers may be non contiguous, hence the scan.
    pub fn stop_index_of_sequence(&self, stop_sequence: u32) -> Option<usize> {
        self.stop_sequences
            .iter()
            .position(|&sequence| sequence == stop_sequence)
    }

    pub fn is_timepoint(&self, stop_index: usize) -> bool {
        self.timepoints.contains(stop_index)
    }

    pub fn is_recorded(&self, stop_index: usize) -> bool {
        self.recorded_stops
            .as_ref()
            .map_or(false, |recorded| recorded[stop_index])
    }

    pub fn is_prediction_inaccurate(&self, stop_index: usize) -> bool {
        self.prediction_inaccurate
            .as_ref()
            .map_or(false, |inaccurate| inaccurate[stop_index])
    }

    /// True when neither boarding nor alighting is possible anymore at
    /// this stop.
    pub fn is_canceled_stop(&self, stop_index: usize) -> bool {
        self.pickups[stop_index] == PickDrop::Cancelled
            && self.dropoffs[stop_index] == PickDrop::Cancelled
    }

    /// Sweep the current (post overlay) times and report whether they
    /// are usable for routing. A real time record implying a negative
    /// dwell or running time must be rejected by the caller.
    pub fn times_increasing(&self) -> bool {
        let mut prev_departure: Option<SecondsSinceDayStart> = None;
        for stop_index in 0..self.nb_of_stops() {
            let arrival = self.arrival_time(stop_index);
            let departure = self.departure_time(stop_index);
            if departure < arrival {
                warn!(
                    "Negative dwell time at stop index {} of trip {}",
                    stop_index, self.trip.id
                );
                return false;
            }
            if let Some(prev) = prev_departure {
                if arrival < prev {
                    warn!(
                        "Negative running time before stop index {} of trip {}",
                        stop_index, self.trip.id
                    );
                    return false;
                }
            }
            prev_departure = Some(departure);
        }
        true
    }

    /// Set the absolute arrival time at a stop.
    pub fn update_arrival_time(&mut self, stop_index: usize, time: SecondsSinceDayStart) {
        self.ensure_overlay();
        if let Some(arrivals) = &mut self.arrival_times {
            arrivals[stop_index] = time.total_seconds();
        }
    }

    /// Set the absolute departure time at a stop.
    pub fn update_departure_time(&mut self, stop_index: usize, time: SecondsSinceDayStart) {
        self.ensure_overlay();
        if let Some(departures) = &mut self.departure_times {
            departures[stop_index] = time.total_seconds();
        }
    }

    /// Set the arrival at a stop to its scheduled value plus `delay`
    /// seconds. The last write wins.
    pub fn update_arrival_delay(&mut self, stop_index: usize, delay: i32) {
        let time = self.scheduled_arrival_time(stop_index).shifted_by(delay);
        self.update_arrival_time(stop_index, time);
    }

    pub fn update_departure_delay(&mut self, stop_index: usize, delay: i32) {
        let time = self.scheduled_departure_time(stop_index).shifted_by(delay);
        self.update_departure_time(stop_index, time);
    }

    /// Cancel the whole run. Times are left untouched so that the
    /// canceled trip can still be displayed.
    pub fn cancel(&mut self) {
        self.ensure_overlay();
        self.real_time_state = RealTimeState::Canceled;
    }

    /// Cancel both boarding and alighting at a stop. Times are left
    /// untouched.
    pub fn cancel_stop(&mut self, stop_index: usize) {
        self.ensure_overlay();
        let mut pickups = self.pickups.to_vec();
        pickups[stop_index] = PickDrop::Cancelled;
        self.pickups = pickups.into();
        let mut dropoffs = self.dropoffs.to_vec();
        dropoffs[stop_index] = PickDrop::Cancelled;
        self.dropoffs = dropoffs.into();
    }

    pub fn mark_added(&mut self) {
        self.ensure_overlay();
        self.real_time_state = RealTimeState::Added;
    }

    pub fn mark_modified(&mut self) {
        self.ensure_overlay();
        self.real_time_state = RealTimeState::Modified;
    }

    /// Flag this stop as observed: the attached time is a recording, no
    /// longer an estimate.
    pub fn set_recorded(&mut self, stop_index: usize, recorded: bool) {
        self.ensure_overlay();
        if let Some(recorded_stops) = &mut self.recorded_stops {
            recorded_stops[stop_index] = recorded;
        }
    }

    /// Flag the prediction at this stop as known to be low quality.
    pub fn set_prediction_inaccurate(&mut self, stop_index: usize, inaccurate: bool) {
        self.ensure_overlay();
        if let Some(prediction_inaccurate) = &mut self.prediction_inaccurate {
            prediction_inaccurate[stop_index] = inaccurate;
        }
    }

    /// A copy whose time shift is adjusted so that the vehicle passes
    /// `stop_index` at `time` (departing when `depart` is true).
    ///
    /// Only the scheduled times can be shifted, so this returns `None`
    /// once a real time overlay exists. Frequency based services
    /// materialize their departures through this, sharing the scheduled
    /// arrays between all copies.
    pub fn time_shifted_copy(
        &self,
        stop_index: usize,
        time: SecondsSinceDayStart,
        depart: bool,
    ) -> Option<TripTimes> {
        if !self.is_scheduled() {
            return None;
        }
        let reference = if depart {
            self.departure_time(stop_index)
        } else {
            self.arrival_time(stop_index)
        };
        let mut shifted = self.clone();
        shifted.time_shift += time.seconds_since(&reference);
        Some(shifted)
    }

    /// Fingerprint of the scheduled hop times, stable across whole trip
    /// shifts: the first arrival and last departure do not participate,
    /// and times are hashed relative to the trip start. Used to match
    /// trips across dataset versions.
    pub fn semantic_hash<H>(&self) -> u64
    where
        H: Hasher + Default,
    {
        let mut hasher = H::default();
        let nb_of_stops = self.nb_of_stops();
        for hop in 0..nb_of_stops.saturating_sub(1) {
            hasher.write_i32(self.scheduled_departure_times[hop]);
            hasher.write_i32(self.scheduled_arrival_times[hop + 1]);
        }
        hasher.finish()
    }

    /// Create the overlay arrays as shifted copies of the scheduled
    /// times, together with the observation flags. A scheduled trip
    /// becomes updated; added/modified/canceled trips keep their state.
    fn ensure_overlay(&mut self) {
        if self.arrival_times.is_some() {
            return;
        }
        let nb_of_stops = self.nb_of_stops();
        let shift = self.time_shift;
        self.arrival_times = Some(
            self.scheduled_arrival_times
                .iter()
                .map(|&seconds| seconds + shift)
                .collect(),
        );
        self.departure_times = Some(
            self.scheduled_departure_times
                .iter()
                .map(|&seconds| seconds + shift)
                .collect(),
        );
        self.recorded_stops = Some(vec![false; nb_of_stops]);
        self.prediction_inaccurate = Some(vec![false; nb_of_stops]);
        if self.real_time_state == RealTimeState::Scheduled {
            self.real_time_state = RealTimeState::Updated;
        }
    }
}

/// Per the headsign fallback rule: when the trip has a headsign and every
/// stop either repeats it or declares none, no array is stored and
/// `headsign()` falls back to the trip headsign. An array of nothing but
/// `None` is dropped as well.
fn make_headsigns_array(trip: &Trip, stop_times: &[StopTime]) -> Option<Vec<Option<String>>> {
    if let Some(trip_headsign) = &trip.headsign {
        let all_follow_trip = stop_times.iter().all(|stop_time| {
            stop_time
                .stop_headsign
                .as_ref()
                .map_or(true, |headsign| headsign == trip_headsign)
        });
        if all_follow_trip {
            return None;
        }
    }
    if stop_times
        .iter()
        .all(|stop_time| stop_time.stop_headsign.is_none())
    {
        return None;
    }
    Some(
        stop_times
            .iter()
            .map(|stop_time| stop_time.stop_headsign.clone())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, StopPointIdx, TripId};
    use std::collections::hash_map::DefaultHasher;

    fn trip() -> Arc<Trip> {
        Arc::new(Trip {
            id: TripId::new("f1", "trip_1"),
            route_name: "route_1".to_string(),
            direction: Direction::Outbound,
            headsign: Some("Terminus".to_string()),
        })
    }

    fn stop_time(idx: usize, arrival: i32, departure: i32, sequence: u32) -> StopTime {
        StopTime::simple(
            StopPointIdx { idx },
            SecondsSinceDayStart::from_seconds(arrival),
            SecondsSinceDayStart::from_seconds(departure),
            sequence,
        )
    }

    fn three_stop_times() -> Vec<StopTime> {
        vec![
            stop_time(0, 100, 100, 1),
            stop_time(1, 160, 170, 3),
            stop_time(2, 230, 230, 5),
        ]
    }

    #[test]
    fn construct_and_query() {
        let mut deduplicator = Deduplicator::new();
        let trip_times = TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();

        assert_eq!(trip_times.time_shift(), 100);
        assert_eq!(trip_times.scheduled_arrival_times.as_ref(), &[0, 60, 130]);
        assert_eq!(
            trip_times.arrival_time(1),
            SecondsSinceDayStart::from_seconds(160)
        );
        assert_eq!(trip_times.dwell_time(1), 10);
        assert_eq!(trip_times.running_time(1), 60);
        assert!(trip_times.is_scheduled());
        assert_eq!(trip_times.real_time_state(), RealTimeState::Scheduled);
    }

    #[test]
    fn normalization_keeps_original_first_arrival() {
        let mut deduplicator = Deduplicator::new();
        let trip_times = TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();
        assert_eq!(
            trip_times.scheduled_arrival_times[0] + trip_times.time_shift(),
            100
        );
    }

    #[test]
    fn delay_propagation() {
        let mut deduplicator = Deduplicator::new();
        let mut trip_times =
            TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();

        trip_times.update_arrival_delay(2, 45);
        assert_eq!(
            trip_times.arrival_time(2),
            SecondsSinceDayStart::from_seconds(275)
        );
        assert_eq!(trip_times.arrival_delay(2), 45);
        assert!(!trip_times.is_scheduled());
        assert_eq!(trip_times.real_time_state(), RealTimeState::Updated);
        // other stops are untouched
        assert_eq!(trip_times.arrival_delay(1), 0);
    }

    #[test]
    fn last_delay_wins() {
        let mut deduplicator = Deduplicator::new();
        let mut trip_times =
            TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();

        trip_times.update_arrival_delay(2, 45);
        trip_times.update_arrival_delay(2, 10);
        assert_eq!(trip_times.arrival_delay(2), 10);
    }

    #[test]
    fn negative_dwell_detected() {
        let mut deduplicator = Deduplicator::new();
        let mut trip_times =
            TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();

        trip_times.update_departure_time(1, SecondsSinceDayStart::from_seconds(155));
        assert!(!trip_times.times_increasing());
    }

    #[test]
    fn cancellation_keeps_times_and_is_idempotent() {
        let mut deduplicator = Deduplicator::new();
        let mut trip_times =
            TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();

        trip_times.cancel();
        assert!(trip_times.is_canceled());
        assert_eq!(
            trip_times.arrival_time(0),
            SecondsSinceDayStart::from_seconds(100)
        );

        let before = trip_times.clone();
        trip_times.cancel();
        assert_eq!(trip_times.real_time_state(), before.real_time_state());
        assert_eq!(trip_times.arrival_time(2), before.arrival_time(2));
    }

    #[test]
    fn cancel_stop_marks_both_rules() {
        let mut deduplicator = Deduplicator::new();
        let mut trip_times =
            TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();

        let arrival_before = trip_times.arrival_time(1);
        trip_times.cancel_stop(1);
        assert!(trip_times.is_canceled_stop(1));
        assert!(!trip_times.is_canceled_stop(0));
        assert_eq!(trip_times.arrival_time(1), arrival_before);
    }

    #[test]
    fn construction_rejects_negative_dwell() {
        let mut deduplicator = Deduplicator::new();
        let stop_times = vec![stop_time(0, 100, 90, 1), stop_time(1, 160, 170, 2)];
        let result = TripTimes::new(trip(), &stop_times, &mut deduplicator);
        assert_eq!(
            result.unwrap_err(),
            MalformedSchedule::NegativeDwell { position: 0 }
        );
    }

    #[test]
    fn construction_rejects_negative_running_time() {
        let mut deduplicator = Deduplicator::new();
        let stop_times = vec![stop_time(0, 100, 110, 1), stop_time(1, 105, 120, 2)];
        let result = TripTimes::new(trip(), &stop_times, &mut deduplicator);
        assert_eq!(
            result.unwrap_err(),
            MalformedSchedule::NegativeRunningTime(PositionPair {
                upstream: 0,
                downstream: 1,
            })
        );
    }

    #[test]
    fn semantic_hash_is_shift_invariant() {
        let mut deduplicator = Deduplicator::new();
        let trip_times = TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();

        let shifted_stop_times: Vec<StopTime> = three_stop_times()
            .into_iter()
            .map(|mut stop_time| {
                stop_time.arrival_time = stop_time.arrival_time.shifted_by(3600);
                stop_time.departure_time = stop_time.departure_time.shifted_by(3600);
                stop_time
            })
            .collect();
        // a different deduplicator must not change the fingerprint
        let mut other_deduplicator = Deduplicator::new();
        let shifted =
            TripTimes::new(trip(), &shifted_stop_times, &mut other_deduplicator).unwrap();

        assert_eq!(
            trip_times.semantic_hash::<DefaultHasher>(),
            shifted.semantic_hash::<DefaultHasher>()
        );
    }

    #[test]
    fn semantic_hash_changes_with_hop_times() {
        let mut deduplicator = Deduplicator::new();
        let trip_times = TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();

        let mut other_stop_times = three_stop_times();
        other_stop_times[1].departure_time = SecondsSinceDayStart::from_seconds(180);
        let other = TripTimes::new(trip(), &other_stop_times, &mut deduplicator).unwrap();

        assert_ne!(
            trip_times.semantic_hash::<DefaultHasher>(),
            other.semantic_hash::<DefaultHasher>()
        );
    }

    #[test]
    fn time_shifted_copy_moves_the_whole_run() {
        let mut deduplicator = Deduplicator::new();
        let trip_times = TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();

        let shifted = trip_times
            .time_shifted_copy(0, SecondsSinceDayStart::from_seconds(700), true)
            .unwrap();
        assert_eq!(
            shifted.departure_time(0),
            SecondsSinceDayStart::from_seconds(700)
        );
        assert_eq!(
            shifted.arrival_time(2),
            SecondsSinceDayStart::from_seconds(830)
        );
        // the scheduled arrays are shared, not copied
        assert!(Arc::ptr_eq(
            &shifted.scheduled_arrival_times,
            &trip_times.scheduled_arrival_times
        ));
    }

    #[test]
    fn time_shifted_copy_refused_once_updated() {
        let mut deduplicator = Deduplicator::new();
        let mut trip_times =
            TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();
        trip_times.update_arrival_delay(1, 60);
        assert!(trip_times
            .time_shifted_copy(0, SecondsSinceDayStart::from_seconds(700), true)
            .is_none());
    }

    #[test]
    fn headsign_falls_back_to_trip() {
        let mut deduplicator = Deduplicator::new();
        let mut stop_times = three_stop_times();
        stop_times[1].stop_headsign = Some("Terminus".to_string());
        let trip_times = TripTimes::new(trip(), &stop_times, &mut deduplicator).unwrap();
        // all stop headsigns equal the trip headsign or are absent:
        // the array is omitted
        assert!(trip_times.headsigns.is_none());
        assert_eq!(trip_times.headsign(0), Some("Terminus"));
    }

    #[test]
    fn headsign_override_kept_per_stop() {
        let mut deduplicator = Deduplicator::new();
        let mut stop_times = three_stop_times();
        stop_times[1].stop_headsign = Some("Short turn".to_string());
        let trip_times = TripTimes::new(trip(), &stop_times, &mut deduplicator).unwrap();
        assert_eq!(trip_times.headsign(1), Some("Short turn"));
        assert_eq!(trip_times.headsign(0), Some("Terminus"));
    }

    #[test]
    fn observation_flags_do_not_touch_times() {
        let mut deduplicator = Deduplicator::new();
        let mut trip_times =
            TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();

        trip_times.set_recorded(1, true);
        trip_times.set_prediction_inaccurate(2, true);
        assert!(trip_times.is_recorded(1));
        assert!(!trip_times.is_recorded(0));
        assert!(trip_times.is_prediction_inaccurate(2));
        assert_eq!(
            trip_times.arrival_time(1),
            SecondsSinceDayStart::from_seconds(160)
        );
        assert_eq!(trip_times.real_time_state(), RealTimeState::Updated);
    }

    #[test]
    fn stop_sequence_mapping() {
        let mut deduplicator = Deduplicator::new();
        let trip_times = TripTimes::new(trip(), &three_stop_times(), &mut deduplicator).unwrap();
        assert_eq!(trip_times.stop_index_of_sequence(3), Some(1));
        assert_eq!(trip_times.stop_index_of_sequence(4), None);
    }
}
