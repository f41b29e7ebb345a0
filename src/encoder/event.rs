//! Geolocated download events as delivered by the upstream lookup stage

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Resolved coordinates in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// GeoIP databases report (0, 0) when they know nothing about an address
    pub fn is_unknown(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// One download, after the GeoIP lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEvent {
    /// Client address
    pub ip: IpAddr,
    /// Distribution identifier (project short name)
    pub distro: String,
    /// `None` if the lookup failed
    #[serde(default)]
    pub location: Option<Location>,
}

impl GeoEvent {
    pub fn new(ip: IpAddr, distro: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            ip,
            distro: distro.into(),
            location,
        }
    }

    pub fn located(ip: IpAddr, distro: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self::new(ip, distro, Some(Location::new(latitude, longitude)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_json_line() {
        let json = r#"{"ip":"192.0.2.7","distro":"ubuntu","location":{"latitude":43.2,"longitude":-75.4}}"#;
        let event: GeoEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.ip, "192.0.2.7".parse::<IpAddr>().unwrap());
        assert_eq!(event.distro, "ubuntu");
        assert_eq!(event.location, Some(Location::new(43.2, -75.4)));
    }

    #[test]
    fn test_missing_location_is_unresolved() {
        let json = r#"{"ip":"2001:db8::1","distro":"debian"}"#;
        let event: GeoEvent = serde_json::from_str(json).unwrap();
        assert!(event.location.is_none());
    }

    #[test]
    fn test_unknown_location() {
        assert!(Location::new(0.0, 0.0).is_unknown());
        assert!(!Location::new(0.0, 12.5).is_unknown());
        assert!(!Location::new(-3.0, 0.0).is_unknown());
    }
}
