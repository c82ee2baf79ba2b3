pub mod heuristic;
pub mod rubric;
pub mod types;
pub mod validate;

pub use heuristic::score;
pub use types::{Dimension, Dimensions, GradingInput, GradingResult, MAX_DIFFERENTIATOR_CHARS};
pub use validate::{validate, ValidationError};
