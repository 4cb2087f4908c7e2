// src/app/mod.rs
//
// iced front-ends, one per telemetry variant.

pub mod chart;
pub mod frequency;
pub mod servo;
pub mod temperature;
