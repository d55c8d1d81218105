//! Solver configuration.
//!
//! Every knob is optional. Missing fields take their defaults, so an empty
//! JSON object is a valid configuration.
//!
//! ```
//! use u_timetable::config::SolverConfig;
//!
//! let config = SolverConfig::from_json_str(r#"{"seed": 7, "genetic": {"populationSize": 30}}"#)
//!     .unwrap();
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.genetic.population_size, 30);
//! assert_eq!(config.genetic.max_generations, 50);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TimetableError;
use crate::models::EmploymentCategory;

/// Top-level solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    /// Cooperative time budget for the whole solve.
    pub time_limit_seconds: f64,
    /// Seed for every random stream.
    pub seed: u64,
    /// Whether the genetic refiner may run.
    pub enable_genetic: bool,
    pub genetic: GeneticConfig,
    pub load_ceilings: LoadCeilings,
    pub room_distribution: RoomDistribution,
    pub priority_weights: PriorityWeights,
    /// Rooms sampled from when the distribution picks a category.
    pub room_top_k: usize,
    pub success: SuccessThresholds,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_seconds: 30.0,
            seed: 42,
            enable_genetic: true,
            genetic: GeneticConfig::default(),
            load_ceilings: LoadCeilings::default(),
            room_distribution: RoomDistribution::default(),
            priority_weights: PriorityWeights::default(),
            room_top_k: 3,
            success: SuccessThresholds::default(),
        }
    }
}

impl SolverConfig {
    /// Parses a JSON configuration and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, TimetableError> {
        let config: SolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects out-of-range values.
    pub fn validate(&self) -> Result<(), TimetableError> {
        let invalid = |msg: String| Err(TimetableError::InvalidConfig(msg));

        if !self.time_limit_seconds.is_finite() || self.time_limit_seconds < 0.0 {
            return invalid(format!(
                "timeLimitSeconds must be >= 0, got {}",
                self.time_limit_seconds
            ));
        }
        if self.room_top_k == 0 {
            return invalid("roomTopK must be >= 1".into());
        }
        self.genetic.validate()?;
        for (dept, targets) in &self.room_distribution.departments {
            for t in targets {
                if !(0.0..=100.0).contains(&t.percent) {
                    return invalid(format!(
                        "room distribution {dept}/{}: percent {} outside [0, 100]",
                        t.category, t.percent
                    ));
                }
            }
        }
        if !(0.0..=1.0).contains(&self.success.min_rate) {
            return invalid(format!(
                "success.minRate must be in [0, 1], got {}",
                self.success.min_rate
            ));
        }
        Ok(())
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the time budget.
    pub fn with_time_limit_seconds(mut self, seconds: f64) -> Self {
        self.time_limit_seconds = seconds;
        self
    }

    /// Enables or disables the genetic refiner.
    pub fn with_genetic(mut self, enabled: bool) -> Self {
        self.enable_genetic = enabled;
        self
    }

    /// Replaces the genetic settings.
    pub fn with_genetic_config(mut self, genetic: GeneticConfig) -> Self {
        self.genetic = genetic;
        self
    }

    /// Replaces the load ceilings.
    pub fn with_load_ceilings(mut self, ceilings: LoadCeilings) -> Self {
        self.load_ceilings = ceilings;
        self
    }

    /// Replaces the room distribution tables.
    pub fn with_room_distribution(mut self, distribution: RoomDistribution) -> Self {
        self.room_distribution = distribution;
        self
    }

    /// Replaces the priority weights.
    pub fn with_priority_weights(mut self, weights: PriorityWeights) -> Self {
        self.priority_weights = weights;
        self
    }

    /// Sets the room sampling width.
    pub fn with_room_top_k(mut self, k: usize) -> Self {
        self.room_top_k = k;
        self
    }
}

/// Genetic refiner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub max_generations: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    /// Placement draws tried per mutation.
    pub mutation_attempts: usize,
    /// Evaluate the population in parallel.
    pub parallel: bool,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            max_generations: 50,
            mutation_rate: 0.1,
            crossover_rate: 0.8,
            mutation_attempts: 5,
            parallel: false,
        }
    }
}

impl GeneticConfig {
    /// Rejects out-of-range values.
    pub fn validate(&self) -> Result<(), TimetableError> {
        let rate_ok = |r: f64| (0.0..=1.0).contains(&r);
        if self.population_size == 0 {
            return Err(TimetableError::InvalidConfig(
                "genetic.populationSize must be >= 1".into(),
            ));
        }
        if !rate_ok(self.mutation_rate) || !rate_ok(self.crossover_rate) {
            return Err(TimetableError::InvalidConfig(format!(
                "genetic rates must be in [0, 1], got mutation {} crossover {}",
                self.mutation_rate, self.crossover_rate
            )));
        }
        Ok(())
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Sets the generation cap.
    pub fn with_max_generations(mut self, generations: usize) -> Self {
        self.max_generations = generations;
        self
    }

    /// Enables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Per-category instructor load limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadCeilings {
    /// Unit ceiling for full-time instructors.
    pub full_time_units: u32,
    /// Unit ceiling for part-time instructors.
    pub part_time_units: u32,
    /// Overage (units) a critical pair may keep its instructor above the
    /// ceiling before it is considered for a move.
    pub critical_pair_tolerance: u32,
}

impl Default for LoadCeilings {
    fn default() -> Self {
        Self {
            full_time_units: 24,
            part_time_units: 12,
            critical_pair_tolerance: 1,
        }
    }
}

impl LoadCeilings {
    /// Ceiling for a category.
    pub fn for_category(&self, category: EmploymentCategory) -> u32 {
        match category {
            EmploymentCategory::FullTime => self.full_time_units,
            EmploymentCategory::PartTime => self.part_time_units,
        }
    }
}

/// Target share of one building category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTarget {
    pub category: String,
    pub percent: f64,
}

impl CategoryTarget {
    pub fn new(category: impl Into<String>, percent: f64) -> Self {
        Self {
            category: category.into(),
            percent,
        }
    }
}

/// Department → ordered category targets. Declaration order is the
/// tie-break priority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomDistribution {
    pub departments: HashMap<String, Vec<CategoryTarget>>,
}

impl RoomDistribution {
    /// Adds a department table.
    pub fn with_department(
        mut self,
        department: impl Into<String>,
        targets: Vec<CategoryTarget>,
    ) -> Self {
        self.departments.insert(department.into(), targets);
        self
    }

    /// Targets for a department, if declared.
    pub fn targets(&self, department: &str) -> Option<&[CategoryTarget]> {
        self.departments.get(department).map(Vec::as_slice)
    }
}

/// Weights of the priority-ordering signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriorityWeights {
    pub part_time: f64,
    pub gap_filler: f64,
    pub infeasible_instructor: f64,
    pub lab: f64,
    pub multi_session: f64,
    pub instructor_sections: f64,
    pub instructor_courses: f64,
    pub instructor_units: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            part_time: 1000.0,
            gap_filler: 500.0,
            infeasible_instructor: 300.0,
            lab: 200.0,
            multi_session: 100.0,
            instructor_sections: 10.0,
            instructor_courses: 5.0,
            instructor_units: 2.0,
        }
    }
}

/// When an outcome counts as successful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuccessThresholds {
    /// Minimum fraction of fully placed courses.
    pub min_rate: f64,
    /// Conflict count at or above which the outcome fails.
    pub max_conflicts: usize,
}

impl Default for SuccessThresholds {
    fn default() -> Self {
        Self {
            min_rate: 0.6,
            max_conflicts: 50,
        }
    }
}
