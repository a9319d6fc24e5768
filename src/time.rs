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

/// A time expressed in seconds since midnight of a service day.
///
/// The service day is the reference frame of every time handled by this
/// crate. Values may exceed 24h for vehicles running past midnight, and
/// may be negative for delays propagated before the day start.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct SecondsSinceDayStart {
    pub(crate) seconds: i32,
}

impl SecondsSinceDayStart {
    pub fn zero() -> Self {
        Self { seconds: 0 }
    }

    pub const fn from_seconds(seconds: i32) -> Self {
        Self { seconds }
    }

    pub const fn from_hms(hours: i32, minutes: i32, seconds: i32) -> Self {
        Self {
            seconds: seconds + 60 * minutes + 60 * 60 * hours,
        }
    }

    pub fn total_seconds(&self) -> i32 {
        self.seconds
    }

    pub fn seconds_since(&self, earlier: &SecondsSinceDayStart) -> i32 {
        self.seconds - earlier.seconds
    }

    /// Shift this time by `seconds`, which may be negative.
    pub fn shifted_by(&self, seconds: i32) -> Self {
        Self {
            seconds: self.seconds + seconds,
        }
    }
}

impl Display for SecondsSinceDayStart {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.seconds < 0 { "-" } else { "" };
        let seconds = self.seconds.unsigned_abs();
        write!(
            f,
            "{}{:02}:{:02}:{:02}",
            sign,
            seconds / 60 / 60,
            seconds / 60 % 60,
            seconds % 60
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeParseError {
    text: String,
}

impl Display for TimeParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unable to parse `{}` as a time. Expected format is `hh:mm:ss`.",
            self.text
        )
    }
}

impl std::error::Error for TimeParseError {}

impl std::str::FromStr for SecondsSinceDayStart {
    type Err = TimeParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mk_err = || TimeParseError {
            text: text.to_string(),
        };
        let mut fields = text.split(':');
        let hours: i32 = fields
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(mk_err)?;
        let minutes: i32 = fields
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(mk_err)?;
        let seconds: i32 = fields
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(mk_err)?;
        if fields.next().is_some() || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
            return Err(mk_err());
        }
        Ok(SecondsSinceDayStart::from_hms(hours, minutes, seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn display_rolls_past_midnight() {
        let time = SecondsSinceDayStart::from_hms(25, 4, 2);
        assert_eq!(format!("{}", time), "25:04:02");
    }

    #[test]
    fn parse_round_trip() {
        let time = SecondsSinceDayStart::from_str("10:05:00").unwrap();
        assert_eq!(time, SecondsSinceDayStart::from_hms(10, 5, 0));
        assert_eq!(format!("{}", time), "10:05:00");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(SecondsSinceDayStart::from_str("10h05").is_err());
        assert!(SecondsSinceDayStart::from_str("10:65:00").is_err());
        assert!(SecondsSinceDayStart::from_str("10:05:00:00").is_err());
    }
}
