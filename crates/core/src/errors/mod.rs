pub mod core;

pub use self::core::{Advisory, CoreError};
