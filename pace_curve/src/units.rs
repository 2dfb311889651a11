use serde::{Deserialize, Serialize};

pub const METERS_PER_MILE: f64 = 1609.344;
pub const METERS_PER_KILOMETER: f64 = 1000.0;

pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// Unit that paces are expressed against (minutes per unit).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn meters_per_unit(self) -> f64 {
        match self {
            DistanceUnit::Miles => METERS_PER_MILE,
            DistanceUnit::Kilometers => METERS_PER_KILOMETER,
        }
    }

    pub fn from_meters(self, meters: f64) -> f64 {
        meters / self.meters_per_unit()
    }

    pub fn to_meters(self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }

    pub fn label(self) -> &'static str {
        match self {
            DistanceUnit::Miles => "mi",
            DistanceUnit::Kilometers => "km",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mile_round_trip() {
        assert!((miles_to_meters(1.0) - 1609.344).abs() < 1e-9);
        assert!((meters_to_miles(42_195.0) - 26.2188).abs() < 1e-4);
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(DistanceUnit::Kilometers.from_meters(5000.0), 5.0);
        assert!((DistanceUnit::Miles.to_meters(3.0) - 4828.032).abs() < 1e-9);
        assert_eq!(DistanceUnit::default().label(), "mi");
    }
}
