pub mod cli;
pub mod commands;
pub mod render;
pub mod session;

pub use agenthub_core::{api, catalog, config, panes, utils, workspace};
