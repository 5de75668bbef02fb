pub mod error;
pub mod strategy;
pub mod traits;
pub mod types;

pub use error::*;
pub use strategy::*;
pub use traits::*;
pub use types::*;
