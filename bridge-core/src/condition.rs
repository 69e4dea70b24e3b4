//! Maps Open-Meteo (WMO) weather codes onto the watch's six icons.

use serde::{Serialize, Serializer};

/// Icon shown on the watch face.
///
/// The discriminant is the value sent as `CONDITIONS`. The watch firmware
/// indexes its icon table with it, so these values must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IconCategory {
    Clear = 0,
    Clouds = 1,
    Fog = 2,
    Rain = 3,
    Snow = 4,
    Storm = 5,
}

const CLEAR: &[i32] = &[0, 1];
const CLOUDS: &[i32] = &[2, 3];
const FOG: &[i32] = &[45, 48];
const RAIN: &[i32] = &[51, 53, 55, 56, 57, 61, 63, 65, 66, 67, 80, 81, 82];
const SNOW: &[i32] = &[71, 73, 75, 77, 85, 86];
const STORM: &[i32] = &[95, 96, 99];

impl IconCategory {
    /// Wire order.
    pub const ALL: [IconCategory; 6] = [
        IconCategory::Clear,
        IconCategory::Clouds,
        IconCategory::Fog,
        IconCategory::Rain,
        IconCategory::Snow,
        IconCategory::Storm,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IconCategory::Clear => "clear",
            IconCategory::Clouds => "clouds",
            IconCategory::Fog => "fog",
            IconCategory::Rain => "rain",
            IconCategory::Snow => "snow",
            IconCategory::Storm => "storm",
        }
    }

    fn codes(self) -> &'static [i32] {
        match self {
            IconCategory::Clear => CLEAR,
            IconCategory::Clouds => CLOUDS,
            IconCategory::Fog => FOG,
            IconCategory::Rain => RAIN,
            IconCategory::Snow => SNOW,
            IconCategory::Storm => STORM,
        }
    }
}

impl std::fmt::Display for IconCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IconCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ordinal())
    }
}

/// Classify a weather code. Codes outside the known sets yield `None`; the
/// watch keeps a default icon for those.
pub fn classify(code: i32) -> Option<IconCategory> {
    IconCategory::ALL
        .into_iter()
        .find(|category| category.codes().contains(&code))
}
