pub mod coord;
pub mod range;
