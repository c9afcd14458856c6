//! Vendor driver realizations of the [`crate::thermostat`] traits.
//!
//! Vendor wire protocols are treated as external collaborators — these
//! modules implement only the contract the core consumes: a small JSON
//! shape over HTTP for cloud/LAN families ([`rest`]), a local
//! aggregate-statistics endpoint for the environment sensor family
//! ([`sht31`]), and a fully in-process fake for tests and dry runs
//! ([`emulator`]).

pub mod emulator;
pub mod rest;
pub mod sht31;
