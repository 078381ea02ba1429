//! Flow Logger - durable buffered logging for flow-sensor appliances.
//!
//! Records are buffered in memory and flushed to a removable medium with
//! at-least-once delivery. A persisted state machine and recovery point let
//! the logger resume its previous file after an uncontrolled restart.
//!
//! The crate is layered the usual way:
//!   - `domain`: pure types, policies and errors
//!   - `infrastructure`: storage backends, state store, clock, config files
//!   - `application`: state machine, storage manager, log engine, supervisor

pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_utils;
