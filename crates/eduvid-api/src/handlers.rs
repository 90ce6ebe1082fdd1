//! Request handlers.

pub mod download;
pub mod generate;
pub mod health;
pub mod status;

pub use download::*;
pub use generate::*;
pub use health::*;
pub use status::*;
