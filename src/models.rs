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

pub mod base_model;
pub mod calendar;

pub use base_model::{BaseModel, BaseModelBuilder};
pub use calendar::{ServiceCalendar, ServiceCode};

use std::fmt::{Display, Formatter};

use crate::time::SecondsSinceDayStart;

/// Identifies a trip across feeds: real time producers reference trips
/// by feed id and trip id.
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct TripId {
    pub feed_id: String,
    pub trip_id: String,
}

impl TripId {
    pub fn new(feed_id: &str, trip_id: &str) -> Self {
        Self {
            feed_id: feed_id.to_string(),
            trip_id: trip_id.to_string(),
        }
    }
}

impl Display for TripId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.feed_id, self.trip_id)
    }
}

/// Position of a stop point in the base model.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct StopPointIdx {
    pub(crate) idx: usize,
}

/// Identifies a trip pattern, either built with the base model or
/// synthesized at runtime for an added trip.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub enum PatternIdx {
    Base(usize),
    New(u64),
}

/// Boarding/alighting rule at one stop of one trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickDrop {
    Regular,
    NotAvailable,
    ArrangeByPhone,
    CoordinateWithDriver,
    Cancelled,
}

impl PickDrop {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, PickDrop::NotAvailable | PickDrop::Cancelled)
    }
}

/// Booking metadata attached to a stop of a trip, carried as-is for
/// on-demand services. The core never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookingInfo {
    pub contact_phone: Option<String>,
    pub contact_url: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Outbound,
    Inbound,
}

/// The real time status of a trip time vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealTimeState {
    /// Times come from the published schedule, untouched.
    Scheduled,
    /// At least one time or per-stop flag was modified by a real time
    /// update.
    Updated,
    /// The whole run is canceled. Times are kept as they were.
    Canceled,
    /// The run did not exist in the schedule and was created by a real
    /// time producer.
    Added,
    /// The run replaces a scheduled one, possibly on another pattern.
    Modified,
}

/// One scheduled run of one vehicle. Carries the descriptive fields
/// needed to answer per-stop queries; routing-level attributes live in
/// the owning application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub id: TripId,
    pub route_name: String,
    pub direction: Direction,
    pub headsign: Option<String>,
}

/// One row of a trip schedule, as handed over by a parser. Assumed
/// pre-validated except for time monotonicity, which is checked at
/// trip times construction.
#[derive(Debug, Clone)]
pub struct StopTime {
    pub stop: StopPointIdx,
    pub arrival_time: SecondsSinceDayStart,
    pub departure_time: SecondsSinceDayStart,
    pub stop_sequence: u32,
    pub timepoint: bool,
    pub pickup: PickDrop,
    pub dropoff: PickDrop,
    pub stop_headsign: Option<String>,
    pub pickup_booking_info: Option<BookingInfo>,
    pub dropoff_booking_info: Option<BookingInfo>,
}

impl StopTime {
    /// A plain stop time: board and debark allowed, no headsign override,
    /// no booking metadata.
    pub fn simple(
        stop: StopPointIdx,
        arrival_time: SecondsSinceDayStart,
        departure_time: SecondsSinceDayStart,
        stop_sequence: u32,
    ) -> Self {
        Self {
            stop,
            arrival_time,
            departure_time,
            stop_sequence,
            timepoint: false,
            pickup: PickDrop::Regular,
            dropoff: PickDrop::Regular,
            stop_headsign: None,
            pickup_booking_info: None,
            dropoff_booking_info: None,
        }
    }
}
