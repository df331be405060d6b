pub mod csv;
pub mod deadline;
pub mod market;
pub mod weights;

pub use market::MarketSource;
pub use weights::WeightSource;
