//! Facility lookup and magnetic variation sources.
//!
//! The navigation database itself lives outside this crate; calculators only
//! see it through [`FacilityCache`]. [`FacilityStore`] is a concurrent
//! in-memory implementation for callers that preload their facilities.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    Waypoint,
    Vor,
    Ndb,
    Airport,
    Runway,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub ident: String,
    pub kind: FacilityKind,
    pub location: GeoPoint,
    /// Declared magnetic variation in degrees, east positive.
    #[serde(default)]
    pub mag_var: Option<f64>,
}

impl Facility {
    pub fn new(ident: impl Into<String>, kind: FacilityKind, location: GeoPoint) -> Self {
        Self {
            ident: ident.into(),
            kind,
            location,
            mag_var: None,
        }
    }

    pub fn with_mag_var(mut self, mag_var: f64) -> Self {
        self.mag_var = Some(mag_var);
        self
    }
}

/// Read access to facilities by identifier.
pub trait FacilityCache: Send + Sync {
    fn get(&self, ident: &str) -> Option<Facility>;
}

/// Concurrent in-memory facility cache.
#[derive(Debug, Default)]
pub struct FacilityStore {
    facilities: DashMap<String, Facility>,
}

impl FacilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, facility: Facility) {
        self.facilities.insert(facility.ident.clone(), facility);
    }

    pub fn remove(&self, ident: &str) -> Option<Facility> {
        self.facilities.remove(ident).map(|(_, facility)| facility)
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}

impl FromIterator<Facility> for FacilityStore {
    fn from_iter<I: IntoIterator<Item = Facility>>(iter: I) -> Self {
        let store = FacilityStore::new();
        for facility in iter {
            store.insert(facility);
        }
        store
    }
}

impl FacilityCache for FacilityStore {
    fn get(&self, ident: &str) -> Option<Facility> {
        self.facilities.get(ident).map(|entry| entry.value().clone())
    }
}

/// Ambient magnetic variation at a point, degrees east positive.
pub trait MagVarSource: Send + Sync {
    fn mag_var(&self, point: &GeoPoint) -> f64;
}

/// Treats magnetic and true north as identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMagVar;

impl MagVarSource for NoMagVar {
    fn mag_var(&self, _point: &GeoPoint) -> f64 {
        0.0
    }
}

/// The same variation everywhere.
#[derive(Debug, Clone, Copy)]
pub struct ConstantMagVar(pub f64);

impl MagVarSource for ConstantMagVar {
    fn mag_var(&self, _point: &GeoPoint) -> f64 {
        self.0
    }
}

/// Magnetic variation for a course flown near `facility`: the facility's own
/// declared value wins over the ambient source.
pub fn course_mag_var(facility: Option<&Facility>, at: &GeoPoint, source: &dyn MagVarSource) -> f64 {
    facility
        .and_then(|f| f.mag_var)
        .unwrap_or_else(|| source.mag_var(at))
}
