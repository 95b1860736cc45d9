//! Percentile ranks, population averages and ranking tables.

use common::Country;
use serde::Serialize;

use crate::categories::{score_categories, Category, CategoryScores};

/// Share of the population strictly below `value`, in percent.
///
/// Ties get no partial credit, so equal members share the same (lower)
/// percentile. An empty population yields 0.
pub fn percentile(value: f64, population: &[f64]) -> f64 {
    if population.is_empty() {
        return 0.0;
    }
    let below = population.iter().filter(|&&v| v < value).count();
    below as f64 / population.len() as f64 * 100.0
}

/// Scores of `category` for every member of the population.
pub fn category_column(population: &[Country], category: Category) -> Vec<f64> {
    population
        .iter()
        .map(|c| score_categories(c).get(category))
        .collect()
}

/// Mean category scores over the population. `None` when it is empty.
pub fn category_averages(population: &[Country]) -> Option<CategoryScores> {
    if population.is_empty() {
        return None;
    }
    let all: Vec<CategoryScores> = population.iter().map(score_categories).collect();
    let n = all.len() as f64;
    Some(CategoryScores::from_fn(|category| {
        all.iter().map(|s| s.get(category)).sum::<f64>() / n
    }))
}

/// One row of a ranking table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCountry {
    pub rank: usize,
    pub id: i64,
    pub iso_code: String,
    pub name: String,
    pub score: f64,
    pub percentile: f64,
}

/// Rank countries by overall score, or by one category when given.
///
/// Highest score first; equal scores share a rank and the next rank skips
/// accordingly (1, 2, 2, 4).
pub fn rank_countries(population: &[Country], category: Option<Category>) -> Vec<RankedCountry> {
    let score_of = |c: &Country| match category {
        Some(category) => score_categories(c).get(category),
        None => c.overall_capability_score,
    };

    let mut scored: Vec<(&Country, f64)> = population.iter().map(|c| (c, score_of(c))).collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    let column: Vec<f64> = scored.iter().map(|(_, s)| *s).collect();

    scored
        .iter()
        .map(|(country, score)| RankedCountry {
            rank: 1 + column.iter().filter(|&&other| other > *score).count(),
            id: country.id,
            iso_code: country.iso_code.clone(),
            name: country.name.clone(),
            score: *score,
            percentile: percentile(*score, &column),
        })
        .collect()
}
