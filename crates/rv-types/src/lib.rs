pub mod errors;
pub mod market;

pub use errors::*;
pub use market::*;
