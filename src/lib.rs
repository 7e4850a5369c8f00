//! Spectrum Scale `-Y` output decoding and polling.

#![deny(clippy::all, missing_docs)]
#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]

pub mod aggregate;
pub mod beat;
pub mod config;
pub mod df;
pub mod error;
pub mod exec;
pub mod fileset;
pub mod fs;
pub mod parse;
pub mod publish;
pub mod quota;
pub mod record;
pub mod util;
