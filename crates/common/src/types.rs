//! Entity records as delivered by the backend REST API.
//!
//! The backend schema is loose: any field may be missing or `null`. Every
//! field falls back to its type default, and fields this crate does not
//! model are kept in `extra`.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::Error;

/// Deserialize `null` as the type default.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Entity kinds ──────────────────────────────────────────────────────

/// The six entity types served by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Countries,
    Engines,
    LaunchVehicles,
    Missions,
    Satellites,
    LaunchSites,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Countries,
        EntityKind::Engines,
        EntityKind::LaunchVehicles,
        EntityKind::Missions,
        EntityKind::Satellites,
        EntityKind::LaunchSites,
    ];

    /// REST path relative to the API base URL.
    pub fn endpoint(self) -> &'static str {
        match self {
            EntityKind::Countries => "/countries",
            EntityKind::Engines => "/engines",
            EntityKind::LaunchVehicles => "/launch-vehicles",
            EntityKind::Missions => "/missions",
            EntityKind::Satellites => "/satellites",
            EntityKind::LaunchSites => "/launch-sites",
        }
    }

    pub fn as_str(self) -> &'static str {
        &self.endpoint()[1..]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "countries" | "country" => Ok(EntityKind::Countries),
            "engines" | "engine" => Ok(EntityKind::Engines),
            "launch-vehicles" | "launch-vehicle" | "vehicles" => Ok(EntityKind::LaunchVehicles),
            "missions" | "mission" => Ok(EntityKind::Missions),
            "satellites" | "satellite" => Ok(EntityKind::Satellites),
            "launch-sites" | "launch-site" | "sites" => Ok(EntityKind::LaunchSites),
            _ => Err(Error::Other(format!("unknown entity type: {s}"))),
        }
    }
}

/// A backend record that belongs to one [`EntityKind`].
pub trait Record: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> i64;

    fn name(&self) -> &str;

    /// Owning country for country-scoped records.
    fn country_id(&self) -> Option<i64> {
        None
    }
}

// ── Country ───────────────────────────────────────────────────────────

/// A national space program, scored by the Space Capability Index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Country {
    #[serde(deserialize_with = "null_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    /// ISO 3166-1 alpha-3 code, the secondary key.
    #[serde(deserialize_with = "null_default")]
    pub iso_code: String,
    #[serde(deserialize_with = "null_default")]
    pub region: String,
    #[serde(deserialize_with = "null_default")]
    pub space_agency: String,
    /// Overall Space Capability Index, 0–100.
    #[serde(deserialize_with = "null_default")]
    pub overall_capability_score: f64,
    #[serde(deserialize_with = "null_default")]
    pub annual_budget_usd: f64,

    #[serde(deserialize_with = "null_default")]
    pub human_spaceflight_capable: bool,
    #[serde(deserialize_with = "null_default")]
    pub independent_launch_capable: bool,
    #[serde(deserialize_with = "null_default")]
    pub reusable_rocket_capable: bool,
    #[serde(deserialize_with = "null_default")]
    pub deep_space_capable: bool,
    #[serde(deserialize_with = "null_default")]
    pub space_station_capable: bool,
    #[serde(deserialize_with = "null_default")]
    pub lunar_landing_capable: bool,
    #[serde(deserialize_with = "null_default")]
    pub mars_landing_capable: bool,

    #[serde(deserialize_with = "null_default")]
    pub active_astronauts: u32,
    #[serde(deserialize_with = "null_default")]
    pub total_launches: u32,
    #[serde(deserialize_with = "null_default")]
    pub successful_launches: u32,
    /// Launch success rate in percent, when the backend supplies one.
    #[serde(deserialize_with = "null_default")]
    pub launch_success_rate: f64,
    #[serde(deserialize_with = "null_default")]
    pub active_satellites: u32,
    #[serde(deserialize_with = "null_default")]
    pub launch_site_count: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Country {
    /// Launch success rate in percent, derived from launch counts when the
    /// backend leaves the rate empty.
    pub fn success_rate(&self) -> f64 {
        if self.launch_success_rate > 0.0 {
            self.launch_success_rate
        } else if self.total_launches > 0 {
            f64::from(self.successful_launches) / f64::from(self.total_launches) * 100.0
        } else {
            0.0
        }
    }

    /// Match by ISO code (case-insensitive) or by numeric id.
    pub fn matches_code(&self, code: &str) -> bool {
        let code = code.trim();
        if !self.iso_code.is_empty() && self.iso_code.eq_ignore_ascii_case(code) {
            return true;
        }
        code.parse::<i64>().map(|id| id == self.id).unwrap_or(false)
    }

    /// Short label for messages: ISO code, falling back to name.
    pub fn label(&self) -> &str {
        if self.iso_code.is_empty() {
            &self.name
        } else {
            &self.iso_code
        }
    }
}

impl Record for Country {
    const KIND: EntityKind = EntityKind::Countries;

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ── Country-scoped records ────────────────────────────────────────────

/// A rocket engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Engine {
    #[serde(deserialize_with = "null_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    pub country_id: Option<i64>,
    #[serde(deserialize_with = "null_default")]
    pub manufacturer: String,
    #[serde(deserialize_with = "null_default")]
    pub propellant: String,
    #[serde(deserialize_with = "null_default")]
    pub thrust_kn: f64,
    #[serde(deserialize_with = "null_default")]
    pub isp_seconds: f64,
    #[serde(deserialize_with = "null_default")]
    pub reusable: bool,
    #[serde(deserialize_with = "null_default")]
    pub status: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A launch vehicle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchVehicle {
    #[serde(deserialize_with = "null_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    pub country_id: Option<i64>,
    #[serde(deserialize_with = "null_default")]
    pub manufacturer: String,
    #[serde(deserialize_with = "null_default")]
    pub status: String,
    #[serde(deserialize_with = "null_default")]
    pub reusable: bool,
    #[serde(deserialize_with = "null_default")]
    pub payload_to_leo_kg: f64,
    #[serde(deserialize_with = "null_default")]
    pub total_launches: u32,
    #[serde(deserialize_with = "null_default")]
    pub success_rate: f64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A space mission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Mission {
    #[serde(deserialize_with = "null_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    pub country_id: Option<i64>,
    #[serde(deserialize_with = "null_default")]
    pub mission_type: String,
    #[serde(deserialize_with = "null_default")]
    pub status: String,
    #[serde(deserialize_with = "null_default")]
    pub destination: String,
    /// ISO date string as sent by the backend.
    #[serde(deserialize_with = "null_default")]
    pub launch_date: String,
    #[serde(deserialize_with = "null_default")]
    pub crewed: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An artificial satellite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Satellite {
    #[serde(deserialize_with = "null_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    pub country_id: Option<i64>,
    #[serde(deserialize_with = "null_default")]
    pub satellite_type: String,
    #[serde(deserialize_with = "null_default")]
    pub orbit_type: String,
    #[serde(deserialize_with = "null_default")]
    pub status: String,
    #[serde(deserialize_with = "null_default")]
    pub launch_date: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A launch site or spaceport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchSite {
    #[serde(deserialize_with = "null_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    pub country_id: Option<i64>,
    #[serde(deserialize_with = "null_default")]
    pub latitude: f64,
    #[serde(deserialize_with = "null_default")]
    pub longitude: f64,
    #[serde(deserialize_with = "null_default")]
    pub status: String,
    #[serde(deserialize_with = "null_default")]
    pub total_launches: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

macro_rules! country_scoped_record {
    ($ty:ty, $kind:expr) => {
        impl Record for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> i64 {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn country_id(&self) -> Option<i64> {
                self.country_id
            }
        }
    };
}

country_scoped_record!(Engine, EntityKind::Engines);
country_scoped_record!(LaunchVehicle, EntityKind::LaunchVehicles);
country_scoped_record!(Mission, EntityKind::Missions);
country_scoped_record!(Satellite, EntityKind::Satellites);
country_scoped_record!(LaunchSite, EntityKind::LaunchSites);

/// Records owned by the given country.
pub fn owned_by<T: Record>(records: &[T], country_id: i64) -> Vec<&T> {
    records
        .iter()
        .filter(|r| r.country_id() == Some(country_id))
        .collect()
}
