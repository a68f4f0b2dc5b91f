//! This module contains logging and environment config
//! used by the cppkg library

pub mod env;
pub mod log;
