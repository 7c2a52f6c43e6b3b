//! Request handlers.

pub mod admin;
pub mod background;
pub mod health;
pub mod live;
pub mod tryon;
pub mod uploads;

pub use admin::*;
pub use background::*;
pub use health::*;
pub use live::*;
pub use tryon::*;
pub use uploads::*;
