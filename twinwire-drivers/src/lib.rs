//! Polling collaborators
//!
//! This crate provides the application components that sit on top of
//! the twinwire-core engines:
//!
//! - Client side (controller role): a remote sensor that reads a value
//!   out of a peer's register table
//! - Service side (peripheral role): a sensor mirror and a toggle switch
//!   that publish local state into this node's register table

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

mod fmt;

pub mod client;
pub mod service;
