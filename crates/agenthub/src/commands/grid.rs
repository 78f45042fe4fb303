use agenthub_core::panes::{LayoutMode, grid_shape};
use async_trait::async_trait;
use eyre::Result;
use std::io::Write;

use super::Command;
use crate::render;

pub struct GridCommand {
    pub count: usize,
    pub mode: LayoutMode,
    pub maximized: bool,
}

#[async_trait]
impl Command for GridCommand {
    async fn execute(&self) -> Result<()> {
        let shape = grid_shape(self.count, self.mode, self.maximized);
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{}", render::grid_label(shape))?;
        Ok(())
    }
}
