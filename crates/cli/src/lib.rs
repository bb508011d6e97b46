//! `smith`: run SmithSNMP scenarios and query agents from the command line.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod styles;
pub mod value;
