//! Request and response models

pub mod calculate;
pub mod formula;

pub use calculate::*;
pub use formula::*;
