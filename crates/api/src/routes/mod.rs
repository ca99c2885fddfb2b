//! Dashboard Routes

pub mod alerts;
pub mod chart;
pub mod execute;
pub mod readings;
