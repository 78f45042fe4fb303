use agenthub_core::catalog::{ALL_GROUPS, AgentCatalog};
use async_trait::async_trait;
use comfy_table::{Cell, Color, Table};
use eyre::Result;
use std::io::Write;

use super::Command;
use crate::render;
use crate::session::HubOptions;

pub struct AgentsCommand {
    pub options: HubOptions,
    pub group: Option<String>,
}

#[async_trait]
impl Command for AgentsCommand {
    async fn execute(&self) -> Result<()> {
        let client = self.options.connect().await?;
        let catalog = AgentCatalog::new(client.list_agents().await?);
        let group = self.group.as_deref().unwrap_or(ALL_GROUPS);

        let mut stdout = std::io::stdout();
        if group != ALL_GROUPS && !catalog.groups().iter().any(|g| g == group) {
            writeln!(
                stdout,
                "No group named {group:?}. Groups: {}",
                catalog.groups().join(", ")
            )?;
            return Ok(());
        }

        let mut table = Table::new();
        table.set_header(vec![
            Cell::new("Id").fg(Color::Green),
            Cell::new("Name").fg(Color::Green),
            Cell::new("Group").fg(Color::Green),
            Cell::new("Model").fg(Color::Green),
            Cell::new("Status").fg(Color::Green),
        ]);
        for agent in catalog.filtered(group) {
            table.add_row(vec![
                Cell::new(agent.id.as_str()),
                Cell::new(&agent.display_name),
                Cell::new(&agent.group),
                Cell::new(&agent.model),
                render::status_cell(agent.status),
            ]);
        }

        writeln!(stdout, "{table}")?;
        writeln!(stdout, "{}", render::status_summary(&catalog))?;
        Ok(())
    }
}
