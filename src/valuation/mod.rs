pub mod engine;
pub mod reason;
pub mod restrictions;

pub use engine::evaluate_population;
