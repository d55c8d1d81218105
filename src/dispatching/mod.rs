//! Priority ordering for joint units.
//!
//! Units are placed most-constrained first (minimum remaining values). Each
//! constraint signal is a [`PriorityRule`]; the [`RuleEngine`] combines them
//! into one ordering.
//!
//! # Usage
//!
//! ```
//! use u_timetable::config::PriorityWeights;
//! use u_timetable::dispatching::{PriorityContext, RuleEngine};
//!
//! let engine = RuleEngine::mrv(&PriorityWeights::default());
//! let context = PriorityContext::from_units(&[]);
//! assert!(engine.sort_indices(&[], &context).is_empty());
//! ```
//!
//! # Reference
//! Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach",
//! Ch. 6.3 (minimum-remaining-values heuristic)

mod context;
mod engine;
pub mod rules;

pub use context::{InstructorStats, PriorityContext};
pub use engine::RuleEngine;

use crate::models::JointUnit;
use std::fmt::Debug;

/// Score returned by a priority rule.
///
/// Lower scores = higher priority (placed first).
pub type RuleScore = f64;

/// A signal that ranks how constrained a joint unit is.
///
/// # Score Convention
/// **Lower score = higher priority.** Rules return negative values for
/// units that should be placed early.
pub trait PriorityRule: Send + Sync + Debug {
    /// Rule name.
    fn name(&self) -> &'static str;

    /// Evaluates a unit given instructor-level context.
    fn evaluate(&self, unit: &JointUnit, context: &PriorityContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
