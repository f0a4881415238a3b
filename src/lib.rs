#[macro_use]
extern crate lazy_static;

#[macro_use]
pub mod log;
pub mod error;
pub mod common;
pub mod arch;
pub mod place;
pub mod netlist;
pub mod blif;
pub mod route;
pub mod fabric;
pub mod bitstream;
pub mod loader;
pub mod artifact;
pub mod exporter;
