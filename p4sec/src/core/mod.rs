pub mod error;
pub use error::*;

pub mod fields;
pub use fields::*;

pub mod host;
pub use host::*;

pub mod keys;
