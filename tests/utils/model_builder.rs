// Copyright  (C) 2021, Kisio Digital and/or its affiliates. All rights reserved.
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

use std::str::FromStr;

use skuld::{
    models::{Direction, ServiceCode, StopTime, Trip, TripId},
    BaseModel, BaseModelBuilder, NaiveDate, SecondsSinceDayStart,
};

pub const DEFAULT_FEED_ID: &str = "default_feed";
pub const DEFAULT_ROUTE_ID: &str = "default_route";

/// Builder used to easily create a `BaseModel` in tests.
///
/// Note: if not explicitly set, all trips are attached to a default
/// service covering every day of the validity period.
pub struct ModelBuilder {
    base: BaseModelBuilder,
    default_service: ServiceCode,
}

/// Builder used to describe one trip of the model.
pub struct TripBuilder<'a> {
    base: &'a mut BaseModelBuilder,
    route: String,
    headsign: Option<String>,
    dates: Vec<NaiveDate>,
    stop_times: Vec<StopTime>,
    next_sequence: u32,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        let date = "2020-01-01";
        Self::new(date, date)
    }
}

impl ModelBuilder {
    pub fn new(start_validity: impl AsDate, end_validity: impl AsDate) -> Self {
        let start_date = start_validity.as_date();
        let end_date = end_validity.as_date();
        assert!(start_date <= end_date);
        let dates: Vec<NaiveDate> = start_date
            .iter_days()
            .take_while(|date| *date <= end_date)
            .collect();
        let mut base = BaseModel::builder();
        let default_service = base.add_service(dates);
        Self {
            base,
            default_service,
        }
    }

    /// Add a new trip to the model:
    ///
    /// ```ignore
    /// let model = ModelBuilder::default()
    ///     .trip("toto", |t| {
    ///         t.st("A", "10:00:00").st("B", "11:00:00");
    ///     })
    ///     .build();
    /// ```
    pub fn trip<F>(mut self, name: &str, init: F) -> Self
    where
        F: FnOnce(&mut TripBuilder),
    {
        let TripBuilder {
            route,
            headsign,
            dates,
            stop_times,
            ..
        } = {
            let mut trip_builder = TripBuilder {
                base: &mut self.base,
                route: DEFAULT_ROUTE_ID.to_string(),
                headsign: None,
                dates: Vec::new(),
                stop_times: Vec::new(),
                next_sequence: 0,
            };
            init(&mut trip_builder);
            trip_builder
        };
        let service = if dates.is_empty() {
            self.default_service
        } else {
            self.base.add_service(dates)
        };
        let trip = Trip {
            id: TripId::new(DEFAULT_FEED_ID, name),
            route_name: route,
            direction: Direction::Outbound,
            headsign,
        };
        self.base
            .add_trip(trip, service, &stop_times)
            .unwrap_or_else(|err| panic!("Cannot add trip {} to the model. {}", name, err));
        self
    }

    pub fn build(self) -> BaseModel {
        self.base.build()
    }
}

impl TripBuilder<'_> {
    /// Add a stop time with equal arrival and departure.
    pub fn st(&mut self, stop_id: &str, time: &str) -> &mut Self {
        self.st_arr_dep(stop_id, time, time)
    }

    pub fn st_arr_dep(&mut self, stop_id: &str, arrival: &str, departure: &str) -> &mut Self {
        let stop = self.base.add_stop(stop_id, stop_id);
        let stop_time = StopTime::simple(
            stop,
            as_time(arrival),
            as_time(departure),
            self.next_sequence,
        );
        self.next_sequence += 1;
        self.stop_times.push(stop_time);
        self
    }

    pub fn route(&mut self, name: &str) -> &mut Self {
        self.route = name.to_string();
        self
    }

    pub fn headsign(&mut self, name: &str) -> &mut Self {
        self.headsign = Some(name.to_string());
        self
    }

    /// Restrict the trip to these dates instead of the default service.
    pub fn dates(&mut self, dates: &[&str]) -> &mut Self {
        self.dates = dates.iter().map(|date| date.as_date()).collect();
        self
    }
}

pub fn as_time(text: &str) -> SecondsSinceDayStart {
    SecondsSinceDayStart::from_str(text)
        .unwrap_or_else(|err| panic!("Bad time in test model. {}", err))
}

pub trait AsDate {
    fn as_date(&self) -> NaiveDate;
}

impl AsDate for &str {
    fn as_date(&self) -> NaiveDate {
        self.parse()
            .unwrap_or_else(|err| panic!("Bad date in test model. {}", err))
    }
}

impl AsDate for NaiveDate {
    fn as_date(&self) -> NaiveDate {
        *self
    }
}
