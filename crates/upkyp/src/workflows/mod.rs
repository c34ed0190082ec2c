pub mod billing;
pub mod meter_readings;
