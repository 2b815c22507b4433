//! Population HRV benchmarks
//!
//! RMSSD percentiles (ms) by age bracket and gender. The `other` column
//! is the mean of the male and female values for the same bracket and is
//! stored precomputed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Gender;

/// Immutable p25/p50/p75 triple in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

impl Benchmark {
    const fn new(p25: f64, p50: f64, p75: f64) -> Self {
        Self { p25, p50, p75 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBracket {
    #[serde(rename = "18-25")]
    Age18To25,
    #[serde(rename = "26-35")]
    Age26To35,
    #[serde(rename = "36-45")]
    Age36To45,
    #[serde(rename = "46-55")]
    Age46To55,
    #[serde(rename = "56-65")]
    Age56To65,
    #[serde(rename = "65+")]
    Age65Plus,
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 6] = [
        AgeBracket::Age18To25,
        AgeBracket::Age26To35,
        AgeBracket::Age36To45,
        AgeBracket::Age46To55,
        AgeBracket::Age56To65,
        AgeBracket::Age65Plus,
    ];

    /// Bracket for an age in years. Ages under 18 use the youngest bracket.
    pub fn from_age(age: u32) -> Self {
        match age {
            a if a < 26 => AgeBracket::Age18To25,
            a if a < 36 => AgeBracket::Age26To35,
            a if a < 46 => AgeBracket::Age36To45,
            a if a < 56 => AgeBracket::Age46To55,
            a if a < 66 => AgeBracket::Age56To65,
            _ => AgeBracket::Age65Plus,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBracket::Age18To25 => "18-25",
            AgeBracket::Age26To35 => "26-35",
            AgeBracket::Age36To45 => "36-45",
            AgeBracket::Age46To55 => "46-55",
            AgeBracket::Age56To65 => "56-65",
            AgeBracket::Age65Plus => "65+",
        }
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

struct BracketRow {
    male: Benchmark,
    female: Benchmark,
    other: Benchmark,
}

// Indexed in AgeBracket::ALL order
const BENCHMARK_TABLE: [BracketRow; 6] = [
    BracketRow {
        male: Benchmark::new(45.0, 62.0, 82.0),
        female: Benchmark::new(42.0, 58.0, 78.0),
        other: Benchmark::new(43.5, 60.0, 80.0),
    },
    BracketRow {
        male: Benchmark::new(38.0, 53.0, 72.0),
        female: Benchmark::new(36.0, 50.0, 68.0),
        other: Benchmark::new(37.0, 51.5, 70.0),
    },
    BracketRow {
        male: Benchmark::new(30.0, 43.0, 60.0),
        female: Benchmark::new(29.0, 41.0, 57.0),
        other: Benchmark::new(29.5, 42.0, 58.5),
    },
    BracketRow {
        male: Benchmark::new(24.0, 35.0, 49.0),
        female: Benchmark::new(23.0, 33.0, 47.0),
        other: Benchmark::new(23.5, 34.0, 48.0),
    },
    BracketRow {
        male: Benchmark::new(20.0, 29.0, 41.0),
        female: Benchmark::new(19.0, 28.0, 39.0),
        other: Benchmark::new(19.5, 28.5, 40.0),
    },
    BracketRow {
        male: Benchmark::new(16.0, 24.0, 35.0),
        female: Benchmark::new(16.0, 23.0, 33.0),
        other: Benchmark::new(16.0, 23.5, 34.0),
    },
];

/// Benchmark cell for a bracket and gender
pub fn benchmark_for(bracket: AgeBracket, gender: Gender) -> Benchmark {
    let row = &BENCHMARK_TABLE[bracket as usize];
    match gender {
        Gender::Male => row.male,
        Gender::Female => row.female,
        Gender::Other => row.other,
    }
}

/// Benchmark cell for an age in years and gender
pub fn benchmark_for_age(age: u32, gender: Gender) -> (AgeBracket, Benchmark) {
    let bracket = AgeBracket::from_age(age);
    (bracket, benchmark_for(bracket, gender))
}
