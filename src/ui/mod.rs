//! egui views over a `Session`.

pub mod email;
pub mod panels;
pub mod plot;
pub mod tables;
