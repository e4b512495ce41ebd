pub mod constant;
pub mod interface_traps;
pub mod semiconductor;
pub mod surface_potential;
pub mod traits;
