//! Crash Atlas - Vehicle Collision Dataset Analysis
//!
//! Loads a vehicle-collision CSV into a typed, immutable dataset and answers
//! the dashboard queries over it: injury and hour filters, per-minute
//! histograms, dangerous-street rankings and hexagon density bins.

pub mod charts;
pub mod config;
pub mod data;
pub mod report;
pub mod stats;
