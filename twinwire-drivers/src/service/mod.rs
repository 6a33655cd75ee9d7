//! Peripheral-role components
//!
//! Each component owns one or two keys of the local register table and
//! keeps them in step with local state.

pub mod sensor;
pub mod switch;

pub use sensor::SensorMirror;
pub use switch::ToggleSwitch;
