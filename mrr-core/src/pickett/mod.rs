//! Pickett (SPCAT/SPFIT) file formats and the fitting-engine boundary

pub mod cat;
pub mod fit;
pub mod lin;

pub use cat::{dequantize, quantize, simulate, Cat, CatError, CatFilter, QuantumNumbers, Transition};
pub use fit::{
    parse_parenthetical, write_par, Constant, FitError, FitRunner, FittedConstant, PiReport,
    WorstLine,
};
pub use lin::{Assignment, LinError, LinFile};
