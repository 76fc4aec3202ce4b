pub mod classification;
pub mod descriptive;

pub use classification::*;
pub use descriptive::*;
