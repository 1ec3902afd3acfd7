//! Flagstone Metrics - operation counters for the membership engine
//!
//! Counters vanish in production builds via the `metrics` feature flag.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use flagstone_metrics::Counter;
//!
//! let mut counter = Counter::new();
//! counter.increment("attach", 1);
//! println!("attaches: {}", counter.get("attach"));
//! ```
//!
//! Without the `metrics` feature `Counter` is a zero-sized stub and every
//! call compiles to nothing.

#[cfg(feature = "metrics")]
mod counter;

#[cfg(feature = "metrics")]
pub use counter::Counter;

/// Whether counters actually record anything in this build.
pub const ENABLED: bool = cfg!(feature = "metrics");

// ============================================================================
// No-op stub when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default, Clone)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &str, _value: usize) {}
    pub fn set(&mut self, _name: &str, _value: usize) {}
    pub fn get(&self, _name: &str) -> usize { 0 }
    pub fn reset(&mut self, _name: &str) {}
    pub fn reset_all(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&String, &usize)> { std::iter::empty() }
}
