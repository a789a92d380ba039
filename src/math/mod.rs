pub mod brent;
pub mod powell;
pub mod stats;

pub use brent::{RootError, brent_root};
pub use powell::{PowellResult, powell};
