//! Transport layer for the terminal and HTTP front-ends

pub mod cli;
pub mod http;
