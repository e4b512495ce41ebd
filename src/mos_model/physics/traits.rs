/// `e` = E - Ei [eV]
pub trait EnergyProfile {
    fn value(&self, e: f64) -> f64;
}

pub trait Tunable {
    fn params(&self) -> Vec<f64>;
    fn set_params(&mut self, params: &[f64]);
    fn sensitivity(&self) -> Vec<f64>;
    /// Clamp a candidate back into the physical domain.
    fn constrain(&mut self) {}
}
