pub mod valuation_cache;

pub use valuation_cache::ValuationCache;
