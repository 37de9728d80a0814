//! nether-anim-cli library
//!
//! Command implementations for the `nether-anim` binary, exposed so they can be
//! driven from tests and other tools.

pub mod build;
pub mod clip;
pub mod compress;
pub mod gen_test;
pub mod inspect;
pub mod manifest;
pub mod sample;
