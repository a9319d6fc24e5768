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

use std::collections::BTreeSet;

use chrono::NaiveDate;
use fixedbitset::FixedBitSet;

/// Position of a service (a set of active dates) in the calendar.
///
/// Trip time vectors carry their service code so that a scheduled
/// timetable, which contains the trips of every day of the dataset, can
/// be filtered down to the trips actually running on a given date.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct ServiceCode {
    pub(crate) idx: usize,
}

/// The dates on which each service runs.
#[derive(Debug, Default)]
pub struct ServiceCalendar {
    // indexed by ServiceCode.idx
    services: Vec<BTreeSet<NaiveDate>>,
}

impl ServiceCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_service<Dates>(&mut self, dates: Dates) -> ServiceCode
    where
        Dates: IntoIterator<Item = NaiveDate>,
    {
        let code = ServiceCode {
            idx: self.services.len(),
        };
        self.services.push(dates.into_iter().collect());
        code
    }

    pub fn nb_of_services(&self) -> usize {
        self.services.len()
    }

    pub fn is_running(&self, service: ServiceCode, date: NaiveDate) -> bool {
        self.services
            .get(service.idx)
            .map_or(false, |dates| dates.contains(&date))
    }

    /// One bit per service code, set when the service runs on `date`.
    pub fn running_services_on(&self, date: NaiveDate) -> FixedBitSet {
        let mut running = FixedBitSet::with_capacity(self.services.len());
        for (idx, dates) in self.services.iter().enumerate() {
            if dates.contains(&date) {
                running.insert(idx);
            }
        }
        running
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.services
            .iter()
            .filter_map(|dates| dates.iter().next())
            .min()
            .copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.services
            .iter()
            .filter_map(|dates| dates.iter().next_back())
            .max()
            .copied()
    }
}
