//! A recipe runner for C and C++ libraries.
//!
//! A recipe (a TOML file) says where a project's sources live, how to patch
//! them, and which of the built files make up the package. cppkg runs the
//! four lifecycle stages for it: source, build, package and info.
//!

/// Contains code to configure and compile fetched sources
pub mod builder;
/// Contains the lifecycle commands and the work folder layout
pub mod commands;
/// Contains the error type shared by all stages
pub mod error;
/// Generates the build info file included by patched projects
pub mod generator;
/// Contains hashing related functions
pub mod hasher;
/// Contains the declared package info
pub mod info;
/// Contains copy rules and the package stage
pub mod packages;
/// Contains recipe parsing
pub mod parser;
/// Runs external commands
pub mod process;
/// Options, settings and package ids
pub mod settings;
/// Fetches and patches sources
pub mod source;
/// Contains logger and environment config
pub mod utils;
