// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Joe Pearson
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;

mod constants {
    pub const METER_IN_FEET: f32 = 3.28084;
}

/// A vertical limit of an airspace as published.
///
/// The store keeps plain feet. Use [`to_feet`] to resolve a limit before it
/// is stored as floor or ceiling of an airspace.
///
/// [`to_feet`]: Self::to_feet
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AltitudeLimit {
    /// Ground level.
    Gnd,

    /// Height above ground level in feet.
    Agl(u32),

    /// True altitude above mean sea level in feet.
    Msl(u32),

    /// Flight level in hundreds of feet.
    Fl(u16),

    /// No upper limit.
    Unlimited,
}

impl AltitudeLimit {
    /// Resolves the limit to feet.
    ///
    /// | Variant     | Resolved as     |
    /// |-------------|-----------------|
    /// | `Gnd`       | `0 ft`          |
    /// | `Agl(n)`    | `n ft`          |
    /// | `Msl(n)`    | `n ft`          |
    /// | `Fl(n)`     | `n × 100 ft`    |
    /// | `Unlimited` | `None`          |
    ///
    /// Terrain is not known to the store, so heights above ground are taken
    /// as if the ground was at mean sea level.
    pub fn to_feet(&self) -> Option<i32> {
        match self {
            Self::Gnd => Some(0),
            Self::Agl(n) | Self::Msl(n) => i32::try_from(*n).ok(),
            Self::Fl(n) => Some(*n as i32 * 100),
            Self::Unlimited => None,
        }
    }
}

impl FromStr for AltitudeLimit {
    type Err = Error;

    /// Parses a string `s` to return an altitude limit.
    ///
    /// Accepted are the ICAO Doc. 4444 level formats
    /// - Flight level, expressed as F followed by 3 figures e.g. `F085`
    /// - Altitude in hundreds of feet, expressed as A followed by 3 figures
    ///   e.g. `A045`
    /// - Altitude in tens of metres, expressed as M followed by 4 figures e.g.
    ///   `M0840`
    ///
    /// and the notation common in airspace publications, i.e. `GND`, `SFC`,
    /// `UNL`, `FL85`, `1500MSL`, `1500FT` or `1000AGL`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidFeature(format!("invalid altitude limit: {s}"));

        macro_rules! value {
            ($s:expr) => {
                $s.parse::<u32>().map_err(|_| invalid())
            };
        }

        let s = s.trim().to_ascii_uppercase();
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        match compact.as_str() {
            "GND" | "SFC" => return Ok(Self::Gnd),
            "UNL" | "UNLTD" | "UNLIMITED" => return Ok(Self::Unlimited),
            _ => (),
        }

        if let Some(fl) = compact.strip_prefix("FL") {
            return Ok(Self::Fl(fl.parse().map_err(|_| invalid())?));
        }

        if let Some(agl) = compact.strip_suffix("AGL") {
            return Ok(Self::Agl(value!(agl.trim_end_matches("FT"))?));
        }

        if let Some(msl) = compact.strip_suffix("MSL").or(compact.strip_suffix("FT")) {
            return Ok(Self::Msl(value!(msl.trim_end_matches("FT"))?));
        }

        match (compact.get(0..1), compact.get(1..)) {
            (Some("F"), Some(v)) if v.len() == 3 => Ok(Self::Fl(v.parse().map_err(|_| invalid())?)),
            // value in hundreds of feet
            (Some("A"), Some(v)) if v.len() == 3 => Ok(Self::Msl(value!(v)? * 100)),
            // value in tens of meter
            (Some("M"), Some(v)) if v.len() == 4 => Ok(Self::Msl(
                (value!(v)? as f32 * 10.0 * constants::METER_IN_FEET).round() as u32,
            )),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for AltitudeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gnd => write!(f, "GND"),
            Self::Agl(value) => write!(f, "{value} AGL"),
            Self::Msl(value) => write!(f, "{value} MSL"),
            Self::Fl(value) => write!(f, "FL{value}"),
            Self::Unlimited => write!(f, "unlimited"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_from_icao_str() {
        assert_eq!("F085".parse::<AltitudeLimit>(), Ok(AltitudeLimit::Fl(85)));
        assert_eq!("A025".parse::<AltitudeLimit>(), Ok(AltitudeLimit::Msl(2500)));
        assert_eq!("M0762".parse::<AltitudeLimit>(), Ok(AltitudeLimit::Msl(25000)));
        assert!("F08".parse::<AltitudeLimit>().is_err());
    }

    #[test]
    fn limit_from_publication_str() {
        assert_eq!("GND".parse::<AltitudeLimit>(), Ok(AltitudeLimit::Gnd));
        assert_eq!("sfc".parse::<AltitudeLimit>(), Ok(AltitudeLimit::Gnd));
        assert_eq!("UNL".parse::<AltitudeLimit>(), Ok(AltitudeLimit::Unlimited));
        assert_eq!("FL 65".parse::<AltitudeLimit>(), Ok(AltitudeLimit::Fl(65)));
        assert_eq!("1500 MSL".parse::<AltitudeLimit>(), Ok(AltitudeLimit::Msl(1500)));
        assert_eq!("2500ft".parse::<AltitudeLimit>(), Ok(AltitudeLimit::Msl(2500)));
        assert_eq!("1000 FT AGL".parse::<AltitudeLimit>(), Ok(AltitudeLimit::Agl(1000)));
        assert!("somewhere up".parse::<AltitudeLimit>().is_err());
    }

    #[test]
    fn limit_to_feet() {
        assert_eq!(AltitudeLimit::Gnd.to_feet(), Some(0));
        assert_eq!(AltitudeLimit::Agl(1000).to_feet(), Some(1000));
        assert_eq!(AltitudeLimit::Msl(4500).to_feet(), Some(4500));
        assert_eq!(AltitudeLimit::Fl(65).to_feet(), Some(6500));
        assert_eq!(AltitudeLimit::Unlimited.to_feet(), None);
    }

    #[test]
    fn limit_display() {
        assert_eq!(AltitudeLimit::Fl(95).to_string(), "FL95");
        assert_eq!(AltitudeLimit::Msl(1500).to_string(), "1500 MSL");
        assert_eq!(AltitudeLimit::Gnd.to_string(), "GND");
    }
}
