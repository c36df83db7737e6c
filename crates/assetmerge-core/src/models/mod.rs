pub mod asset;
pub mod dependents;

pub use asset::*;
pub use dependents::*;
