//! Stats module - spatial aggregation and injury summaries

mod calculator;

pub use calculator::{
    HexBin, HexLayer, InjurySummary, LocalProjection, StatsCalculator, ViewState,
    DEFAULT_HEX_RADIUS_M, DEFAULT_PITCH, DEFAULT_ZOOM,
};
