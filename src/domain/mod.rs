pub mod activity;
pub mod calendar;
pub mod distribution;
pub mod project;
pub mod risk;
