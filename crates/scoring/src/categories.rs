//! Capability categories and the deterministic category score estimate.
//!
//! The backend only guarantees an overall capability score, so each
//! category is estimated by blending that score with the country's
//! capability flags and counts. Every formula is clamped to `[0, 100]`.

use std::fmt;

use common::Country;
use serde::{Deserialize, Serialize};

/// The seven capability categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    LaunchCapability,
    PropulsionTechnology,
    HumanSpaceflight,
    DeepSpaceExploration,
    SatelliteInfrastructure,
    GroundInfrastructure,
    TechnologicalIndependence,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::LaunchCapability,
        Category::PropulsionTechnology,
        Category::HumanSpaceflight,
        Category::DeepSpaceExploration,
        Category::SatelliteInfrastructure,
        Category::GroundInfrastructure,
        Category::TechnologicalIndependence,
    ];

    /// camelCase key as used in JSON.
    pub fn key(self) -> &'static str {
        match self {
            Category::LaunchCapability => "launchCapability",
            Category::PropulsionTechnology => "propulsionTechnology",
            Category::HumanSpaceflight => "humanSpaceflight",
            Category::DeepSpaceExploration => "deepSpaceExploration",
            Category::SatelliteInfrastructure => "satelliteInfrastructure",
            Category::GroundInfrastructure => "groundInfrastructure",
            Category::TechnologicalIndependence => "technologicalIndependence",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::LaunchCapability => "Launch Capability",
            Category::PropulsionTechnology => "Propulsion Technology",
            Category::HumanSpaceflight => "Human Spaceflight",
            Category::DeepSpaceExploration => "Deep Space Exploration",
            Category::SatelliteInfrastructure => "Satellite Infrastructure",
            Category::GroundInfrastructure => "Ground Infrastructure",
            Category::TechnologicalIndependence => "Technological Independence",
        }
    }

    /// Parse a camelCase key, snake_case key, or label, ignoring case.
    pub fn parse(raw: &str) -> Option<Category> {
        let wanted: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.key().to_ascii_lowercase() == wanted)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One score per category, each within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    pub launch_capability: f64,
    pub propulsion_technology: f64,
    pub human_spaceflight: f64,
    pub deep_space_exploration: f64,
    pub satellite_infrastructure: f64,
    pub ground_infrastructure: f64,
    pub technological_independence: f64,
}

impl CategoryScores {
    pub fn from_fn(mut f: impl FnMut(Category) -> f64) -> Self {
        Self {
            launch_capability: f(Category::LaunchCapability),
            propulsion_technology: f(Category::PropulsionTechnology),
            human_spaceflight: f(Category::HumanSpaceflight),
            deep_space_exploration: f(Category::DeepSpaceExploration),
            satellite_infrastructure: f(Category::SatelliteInfrastructure),
            ground_infrastructure: f(Category::GroundInfrastructure),
            technological_independence: f(Category::TechnologicalIndependence),
        }
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::LaunchCapability => self.launch_capability,
            Category::PropulsionTechnology => self.propulsion_technology,
            Category::HumanSpaceflight => self.human_spaceflight,
            Category::DeepSpaceExploration => self.deep_space_exploration,
            Category::SatelliteInfrastructure => self.satellite_infrastructure,
            Category::GroundInfrastructure => self.ground_infrastructure,
            Category::TechnologicalIndependence => self.technological_independence,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    pub fn mean(&self) -> f64 {
        self.iter().map(|(_, s)| s).sum::<f64>() / Category::ALL.len() as f64
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

fn bonus(flag: bool, points: f64) -> f64 {
    if flag {
        points
    } else {
        0.0
    }
}

/// Estimate the seven category scores of a country. Deterministic.
pub fn score_categories(country: &Country) -> CategoryScores {
    let base = clamp_score(country.overall_capability_score);
    let c = country;

    let launch_capability = base * 0.6
        + bonus(c.independent_launch_capable, 20.0)
        + (f64::from(c.total_launches) / 20.0).min(10.0)
        + clamp_score(c.success_rate()) * 0.1;

    let propulsion_technology = base * 0.6
        + bonus(c.reusable_rocket_capable, 25.0)
        + bonus(c.independent_launch_capable, 10.0)
        + bonus(c.deep_space_capable, 5.0);

    let human_spaceflight = if c.human_spaceflight_capable {
        base * 0.5
            + 25.0
            + bonus(c.space_station_capable, 15.0)
            + f64::from(c.active_astronauts).min(10.0)
    } else {
        base * 0.25
    };

    let deep_space_exploration = base * 0.45
        + bonus(c.deep_space_capable, 20.0)
        + bonus(c.lunar_landing_capable, 15.0)
        + bonus(c.mars_landing_capable, 20.0);

    let satellite_infrastructure = base * 0.7 + (f64::from(c.active_satellites) / 25.0).min(30.0);

    let ground_infrastructure = base * 0.7
        + (f64::from(c.launch_site_count) * 6.0).min(18.0)
        + bonus(c.independent_launch_capable, 12.0);

    let technological_independence = base * 0.5
        + bonus(c.independent_launch_capable, 25.0)
        + bonus(c.human_spaceflight_capable, 10.0)
        + bonus(c.reusable_rocket_capable, 10.0)
        + bonus(c.deep_space_capable, 5.0);

    CategoryScores {
        launch_capability: clamp_score(launch_capability),
        propulsion_technology: clamp_score(propulsion_technology),
        human_spaceflight: clamp_score(human_spaceflight),
        deep_space_exploration: clamp_score(deep_space_exploration),
        satellite_infrastructure: clamp_score(satellite_infrastructure),
        ground_infrastructure: clamp_score(ground_infrastructure),
        technological_independence: clamp_score(technological_independence),
    }
}

/// Binary capabilities compared head to head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    HumanSpaceflight,
    IndependentLaunch,
    ReusableRockets,
    DeepSpace,
    SpaceStation,
    LunarLanding,
    MarsLanding,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::HumanSpaceflight,
        Capability::IndependentLaunch,
        Capability::ReusableRockets,
        Capability::DeepSpace,
        Capability::SpaceStation,
        Capability::LunarLanding,
        Capability::MarsLanding,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Capability::HumanSpaceflight => "Human Spaceflight",
            Capability::IndependentLaunch => "Independent Launch",
            Capability::ReusableRockets => "Reusable Rockets",
            Capability::DeepSpace => "Deep Space",
            Capability::SpaceStation => "Space Station",
            Capability::LunarLanding => "Lunar Landing",
            Capability::MarsLanding => "Mars Landing",
        }
    }

    pub fn held_by(self, country: &Country) -> bool {
        match self {
            Capability::HumanSpaceflight => country.human_spaceflight_capable,
            Capability::IndependentLaunch => country.independent_launch_capable,
            Capability::ReusableRockets => country.reusable_rocket_capable,
            Capability::DeepSpace => country.deep_space_capable,
            Capability::SpaceStation => country.space_station_capable,
            Capability::LunarLanding => country.lunar_landing_capable,
            Capability::MarsLanding => country.mars_landing_capable,
        }
    }
}
