pub mod admittance;
pub mod physics;
