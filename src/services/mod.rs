pub mod calendar_yaml;
pub mod cpm_scheduler;
pub mod duration_sampler;
pub mod histogram;
pub mod monte_carlo;
pub mod percentiles;
pub mod progress;
pub mod project_yaml;
pub mod risk_applier;
pub mod simulation_types;
pub mod simulation_worker;
pub mod statistics;
