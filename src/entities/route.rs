use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;

/// Decoded route between pickup and drop. A new one is built for every quote
/// request, it is never patched in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub polyline: Vec<Coordinates>,
    pub duration_seconds: Option<u64>,
    pub distance_meters: Option<u64>,
}

impl RouteInfo {
    pub fn new(
        polyline: Vec<Coordinates>,
        duration_seconds: Option<u64>,
        distance_meters: Option<u64>,
    ) -> Self {
        Self {
            polyline,
            duration_seconds,
            distance_meters,
        }
    }

    pub fn duration_minutes(&self) -> Option<u64> {
        self.duration_seconds.map(|seconds| (seconds + 59) / 60)
    }

    pub fn distance_km(&self) -> Option<f64> {
        self.distance_meters.map(|meters| meters as f64 / 1000.0)
    }
}

#[test]
fn route_display_units() {
    let route = RouteInfo::new(vec![], Some(61), Some(4500));

    assert_eq!(route.duration_minutes(), Some(2));
    assert_eq!(route.distance_km(), Some(4.5));

    let legless = RouteInfo::new(vec![], None, None);
    assert_eq!(legless.duration_minutes(), None);
    assert_eq!(legless.distance_km(), None);
}
