pub mod controller;
pub mod insights;
pub mod lifecycle;

#[cfg(test)]
mod controller_tests;

pub use controller::*;
pub use insights::*;
pub use lifecycle::*;
