//! HTTP handlers

pub mod health;
pub mod calculate;
pub mod formulas;
