//! Bot components

pub mod tickets;
