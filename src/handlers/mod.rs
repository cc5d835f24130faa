pub mod analyze;
pub mod config;
pub mod home;

pub use analyze::*;
pub use config::*;
pub use home::*;
