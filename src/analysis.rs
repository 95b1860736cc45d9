//! Country-level analyses backed by the entity cache.
//!
//! Resolves country codes against cached records and turns inputs the
//! scoring engine cannot handle (unknown codes, comparing a country with
//! itself) into errors the CLI can show.

use std::sync::Arc;

use api_client::{ApiClient, EntitySource};
use common::{
    owned_by, Country, Engine, Error, LaunchSite, LaunchVehicle, Mission, Result, Satellite,
};
use entity_cache::EntityCache;
use scoring::{
    gap_analysis, percentile, rank_countries, score_categories, swot, Category, CategoryScores,
    ChartEstimator, GapAnalysis, RankedCountry, SwotResult,
};
use serde::Serialize;
use tracing::debug;

/// A country with its derived scores and how many records it owns.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryProfile {
    pub country: Country,
    pub scores: CategoryScores,
    pub global_rank: usize,
    pub percentile: f64,
    pub engines: usize,
    pub launch_vehicles: usize,
    pub missions: usize,
    pub satellites: usize,
    pub launch_sites: usize,
}

pub struct CapabilityAnalyzer<S = ApiClient> {
    cache: EntityCache<S>,
}

impl<S: EntitySource> CapabilityAnalyzer<S> {
    pub fn new(cache: EntityCache<S>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &EntityCache<S> {
        &self.cache
    }

    pub async fn countries(&self) -> Result<Arc<Vec<Country>>> {
        self.cache.fetch::<Country>().await
    }

    fn resolve<'a>(countries: &'a [Country], code: &str) -> Result<&'a Country> {
        countries
            .iter()
            .find(|c| c.matches_code(code))
            .ok_or_else(|| Error::CountryNotFound(code.trim().to_string()))
    }

    pub async fn find_country(&self, code: &str) -> Result<Country> {
        let countries = self.countries().await?;
        Self::resolve(&countries, code).cloned()
    }

    pub async fn compare(&self, code_a: &str, code_b: &str) -> Result<GapAnalysis> {
        let countries = self.countries().await?;
        let a = Self::resolve(&countries, code_a)?;
        let b = Self::resolve(&countries, code_b)?;
        if a.id == b.id && a.iso_code == b.iso_code {
            return Err(Error::SelfComparison(a.label().to_string()));
        }
        debug!("comparing {} with {}", a.label(), b.label());
        gap_analysis(Some(a), Some(b))
            .ok_or_else(|| Error::Other("gap analysis needs two countries".into()))
    }

    pub async fn swot(&self, code: &str) -> Result<SwotResult> {
        let countries = self.countries().await?;
        let subject = Self::resolve(&countries, code)?;
        swot(subject, &countries)
            .ok_or_else(|| Error::Other("no countries to compare against".into()))
    }

    pub async fn rankings(&self, category: Option<Category>) -> Result<Vec<RankedCountry>> {
        let countries = self.countries().await?;
        Ok(rank_countries(&countries, category))
    }

    pub async fn chart(&self, code: &str, seed: Option<u64>) -> Result<CategoryScores> {
        let country = self.find_country(code).await?;
        let mut estimator = match seed {
            Some(seed) => ChartEstimator::seeded(seed),
            None => ChartEstimator::new(),
        };
        Ok(estimator.estimate(&country))
    }

    pub async fn profile(&self, code: &str) -> Result<CountryProfile> {
        let countries = self.countries().await?;
        let country = Self::resolve(&countries, code)?.clone();

        let (engines, vehicles, missions, satellites, sites) = tokio::try_join!(
            self.cache.fetch::<Engine>(),
            self.cache.fetch::<LaunchVehicle>(),
            self.cache.fetch::<Mission>(),
            self.cache.fetch::<Satellite>(),
            self.cache.fetch::<LaunchSite>(),
        )?;

        let overall: Vec<f64> = countries.iter().map(|c| c.overall_capability_score).collect();
        let score = country.overall_capability_score;

        Ok(CountryProfile {
            scores: score_categories(&country),
            global_rank: 1 + overall.iter().filter(|&&s| s > score).count(),
            percentile: percentile(score, &overall),
            engines: owned_by(&engines, country.id).len(),
            launch_vehicles: owned_by(&vehicles, country.id).len(),
            missions: owned_by(&missions, country.id).len(),
            satellites: owned_by(&satellites, country.id).len(),
            launch_sites: owned_by(&sites, country.id).len(),
            country,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::{ApiConfig, CacheConfig};
    use scoring::GapSummary;

    fn usa() -> Country {
        Country {
            id: 1,
            name: "United States".into(),
            iso_code: "USA".into(),
            overall_capability_score: 95.0,
            human_spaceflight_capable: true,
            independent_launch_capable: true,
            reusable_rocket_capable: true,
            deep_space_capable: true,
            space_station_capable: true,
            lunar_landing_capable: true,
            mars_landing_capable: true,
            ..Default::default()
        }
    }

    fn china() -> Country {
        Country {
            id: 2,
            name: "China".into(),
            iso_code: "CHN".into(),
            overall_capability_score: 85.0,
            reusable_rocket_capable: false,
            ..usa()
        }
    }

    /// Analyzer over a cache seeded with USA and China. The client points
    /// at an unroutable address, so any unexpected fetch fails loudly.
    fn seeded_analyzer() -> CapabilityAnalyzer {
        let client = ApiClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:9/api".into(),
            timeout_secs: 1,
            ..ApiConfig::default()
        })
        .unwrap();
        let cache = EntityCache::new(client, &CacheConfig::default());
        cache.seed(vec![usa(), china()]);
        CapabilityAnalyzer::new(cache)
    }

    #[tokio::test]
    async fn test_usa_china_end_to_end() {
        let analyzer = seeded_analyzer();
        let result = analyzer.compare("USA", "chn").await.unwrap();
        assert_eq!(result.overall_gap, 10.0);
        assert_eq!(result.gap_summary, GapSummary::MinorGap);
        assert_eq!(result.country1_capabilities, 1);
        assert_eq!(result.shared_capabilities, 6);
    }

    #[tokio::test]
    async fn test_compare_with_itself_is_an_error() {
        let analyzer = seeded_analyzer();
        let err = analyzer.compare("USA", "1").await.unwrap_err();
        assert_eq!(err, Error::SelfComparison("USA".into()));
    }

    #[tokio::test]
    async fn test_unknown_country() {
        let analyzer = seeded_analyzer();
        let err = analyzer.compare("USA", "XYZ").await.unwrap_err();
        assert_eq!(err, Error::CountryNotFound("XYZ".into()));
        assert!(matches!(
            analyzer.swot("ATL").await,
            Err(Error::CountryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_swot_and_rankings_use_cached_population() {
        let analyzer = seeded_analyzer();

        let result = analyzer.swot("CHN").await.unwrap();
        assert_eq!(result.population_size, 2);
        assert_eq!(result.global_rank, 2);

        let ranked = analyzer.rankings(None).await.unwrap();
        assert_eq!(ranked[0].iso_code, "USA");
        assert_eq!(ranked[1].rank, 2);

        let by_propulsion = analyzer
            .rankings(Some(Category::PropulsionTechnology))
            .await
            .unwrap();
        assert_eq!(by_propulsion[0].iso_code, "USA");
    }

    #[tokio::test]
    async fn test_seeded_chart_is_reproducible() {
        let analyzer = seeded_analyzer();
        let a = analyzer.chart("USA", Some(11)).await.unwrap();
        let b = analyzer.chart("USA", Some(11)).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_profile_counts_owned_records() {
        let analyzer = seeded_analyzer();
        let cache = analyzer.cache();
        cache.seed(vec![
            Engine {
                id: 1,
                country_id: Some(1),
                ..Default::default()
            },
            Engine {
                id: 2,
                country_id: Some(2),
                ..Default::default()
            },
        ]);
        cache.seed(vec![LaunchVehicle {
            id: 1,
            country_id: Some(1),
            ..Default::default()
        }]);
        cache.seed(Vec::<Mission>::new());
        cache.seed(vec![
            Satellite {
                id: 1,
                country_id: Some(1),
                ..Default::default()
            },
            Satellite {
                id: 2,
                country_id: Some(1),
                ..Default::default()
            },
        ]);
        cache.seed(Vec::<LaunchSite>::new());

        let profile = analyzer.profile("usa").await.unwrap();
        assert_eq!(profile.country.iso_code, "USA");
        assert_eq!(profile.global_rank, 1);
        assert_eq!(profile.percentile, 50.0);
        assert_eq!(profile.engines, 1);
        assert_eq!(profile.launch_vehicles, 1);
        assert_eq!(profile.missions, 0);
        assert_eq!(profile.satellites, 2);
        assert_eq!(profile.launch_sites, 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates_as_network_error() {
        let analyzer = seeded_analyzer();
        // Engines were never seeded, so the profile has to hit the network.
        let err = analyzer.profile("USA").await.unwrap_err();
        assert!(err.is_network(), "unexpected error: {err:?}");
    }
}
