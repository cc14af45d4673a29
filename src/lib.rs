#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod access;
pub mod cli;
pub mod document;
pub mod entities;
pub mod error;
pub mod plan;
pub mod session;
pub mod sources;
pub mod wizard;

mod render;
mod utils;
