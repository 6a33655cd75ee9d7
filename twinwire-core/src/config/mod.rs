//! Configuration types
//!
//! Board-agnostic descriptions of controller buses, peripheral targets
//! and attached devices, plus the fixed limits the engines enforce.
//! Loading these from storage is left to the application; firmware
//! normally builds them as `const` values.

pub mod hardware;
pub mod limits;

pub use hardware::*;
pub use limits::*;
