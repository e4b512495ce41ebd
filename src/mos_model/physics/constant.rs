pub const Q: f64 = 1.602176634e-19; // 素電荷[C]
pub const K: f64 = 1.380649e-23; // ボルツマン定数[J/K]
pub const E0: f64 = 8.8541878128e-14; // 真空の誘電率[F/cm]
pub const M0: f64 = 9.1093837015e-31; // 電子の静止質量[kg]
pub const HBAR: f64 = 1.054571817e-34; // ディラック定数[J s]
pub const ZERO_CELSIUS: f64 = 273.15; // [K]

pub const ESI: f64 = 11.7 * E0; // シリコンの誘電率[F/cm]
pub const EOX: f64 = 3.9 * E0; // シリコン酸化膜の誘電率[F/cm]

// 300Kでの有効状態密度[個/cm^3]
pub const NC_300: f64 = 2.8e19;
pub const NV_300: f64 = 1.04e19;

// Varshni: Eg(T) = EG_0 - ALPHA * T^2 / (T + BETA) [eV]
pub const EG_0: f64 = 1.17;
pub const EG_ALPHA: f64 = 4.73e-4;
pub const EG_BETA: f64 = 636.0;

pub const M_THERMAL: f64 = 0.26 * M0; // 熱速度用の電子有効質量[kg]

// Si/SiO2 トンネル
pub const BARRIER_OX: f64 = 3.1; // 伝導帯障壁[eV]
pub const M_OX: f64 = 0.5 * M0; // 酸化膜中の電子有効質量[kg]
