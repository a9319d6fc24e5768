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

use serde::Deserialize;

/// Whether the applier may create a pattern for an added or rerouted
/// trip whose shape matches no existing pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSynthesis {
    Allow,
    Reject,
}

impl std::str::FromStr for PatternSynthesis {
    type Err = PatternSynthesisConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let synthesis = match s {
            "allow" => PatternSynthesis::Allow,
            "reject" => PatternSynthesis::Reject,
            _ => {
                return Err(PatternSynthesisConfigError {
                    name: s.to_string(),
                })
            }
        };
        Ok(synthesis)
    }
}

impl std::fmt::Display for PatternSynthesis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternSynthesis::Allow => write!(f, "allow"),
            PatternSynthesis::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug)]
pub struct PatternSynthesisConfigError {
    name: String,
}

impl std::fmt::Display for PatternSynthesisConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bad pattern synthesis configuration given : `{}`",
            self.name
        )
    }
}

impl std::error::Error for PatternSynthesisConfigError {}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplierConfig {
    #[serde(default = "default_pattern_synthesis")]
    pub pattern_synthesis: PatternSynthesis,
}

impl Default for ApplierConfig {
    fn default() -> Self {
        Self {
            pattern_synthesis: default_pattern_synthesis(),
        }
    }
}

fn default_pattern_synthesis() -> PatternSynthesis {
    PatternSynthesis::Allow
}
