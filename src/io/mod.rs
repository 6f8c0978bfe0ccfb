pub mod demand;
pub mod distributions;
pub mod reporting;
