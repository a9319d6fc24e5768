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
    sync::Arc,
};

use crate::{time::SecondsSinceDayStart, timetables::TripTimes};

/// A frequency based service: one template run repeated every headway
/// between a start and an end time.
///
/// Departures materialize as time shifted copies of the template, all
/// sharing the template's scheduled arrays. Copying the times per
/// departure instead would multiply the memory of a large dataset by the
/// number of headway slots.
#[derive(Debug, Clone)]
pub struct FrequencyEntry {
    start_time: SecondsSinceDayStart,
    end_time: SecondsSinceDayStart,
    headway_seconds: i32,
    template: Arc<TripTimes>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrequencyError {
    /// The template carries a real time overlay; only scheduled times
    /// can be shifted.
    TemplateNotScheduled,
    EmptyPeriod,
    NonPositiveHeadway,
}

impl Display for FrequencyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FrequencyError::TemplateNotScheduled => {
                write!(f, "A frequency template must be a scheduled trip.")
            }
            FrequencyError::EmptyPeriod => {
                write!(f, "A frequency period must end after it starts.")
            }
            FrequencyError::NonPositiveHeadway => {
                write!(f, "A frequency headway must be positive.")
            }
        }
    }
}

impl std::error::Error for FrequencyError {}

impl FrequencyEntry {
    pub fn new(
        start_time: SecondsSinceDayStart,
        end_time: SecondsSinceDayStart,
        headway_seconds: i32,
        template: Arc<TripTimes>,
    ) -> Result<Self, FrequencyError> {
        if !template.is_scheduled() {
            return Err(FrequencyError::TemplateNotScheduled);
        }
        if end_time <= start_time {
            return Err(FrequencyError::EmptyPeriod);
        }
        if headway_seconds <= 0 {
            return Err(FrequencyError::NonPositiveHeadway);
        }
        Ok(Self {
            start_time,
            end_time,
            headway_seconds,
            template,
        })
    }

    pub fn headway_seconds(&self) -> i32 {
        self.headway_seconds
    }

    pub fn nb_of_departures(&self) -> usize {
        let period = self.end_time.seconds_since(&self.start_time);
        // departures strictly before end_time, one every headway
        ((period + self.headway_seconds - 1) / self.headway_seconds) as usize
    }

    /// Materialize every departure of the period, in departure order.
    pub fn departures(&self) -> impl Iterator<Item = TripTimes> + '_ {
        (0..self.nb_of_departures()).map(move |slot| {
            let departure = self
                .start_time
                .shifted_by(slot as i32 * self.headway_seconds);
            match self.template.time_shifted_copy(0, departure, true) {
                Some(trip_times) => trip_times,
                // checked at construction, and a template behind an Arc
                // cannot gain an overlay afterwards
                None => unreachable!("the template is scheduled"),
            }
        })
    }

    /// The first departure leaving the first stop at or after `time`,
    /// if the period still covers it.
    pub fn next_departure_at(&self, time: SecondsSinceDayStart) -> Option<TripTimes> {
        let wait = time.seconds_since(&self.start_time);
        let slot = if wait <= 0 {
            0
        } else {
            ((wait + self.headway_seconds - 1) / self.headway_seconds) as usize
        };
        if slot >= self.nb_of_departures() {
            return None;
        }
        let departure = self
            .start_time
            .shifted_by(slot as i32 * self.headway_seconds);
        self.template.time_shifted_copy(0, departure, true)
    }
}
