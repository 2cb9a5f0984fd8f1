//! Barber Assist: booking assignment and confirmation core.
//!
//! Assigns bookings to barbers from their declared weekly availability, then
//! drives each assignment through a time-bounded confirmation protocol with
//! automatic reassignment on decline, timeout, or delivery failure.

pub mod channels;
pub mod config;
pub mod directory;
pub mod error;
pub mod resolver;
pub mod store;
pub mod workflow;
