//! Terminal rendering helpers shared by the commands.

use agenthub_core::catalog::{AgentCatalog, AgentStatus};
use agenthub_core::panes::{GridShape, PaneLayout};
use colored::{ColoredString, Colorize};
use comfy_table::{Cell, Color};

pub fn status_color(status: AgentStatus) -> Color {
    match status {
        AgentStatus::Active => Color::Green,
        AgentStatus::Computing => Color::Cyan,
        AgentStatus::Idle => Color::Grey,
        AgentStatus::Blocked => Color::Red,
        AgentStatus::Waiting => Color::Yellow,
    }
}

/// Pulsing statuses get a filled dot.
fn status_glyph(status: AgentStatus) -> &'static str {
    if status.is_pulsing() { "●" } else { "○" }
}

pub fn status_cell(status: AgentStatus) -> Cell {
    Cell::new(format!("{} {}", status_glyph(status), status.label())).fg(status_color(status))
}

pub fn status_text(status: AgentStatus) -> ColoredString {
    let text = format!("{} {}", status_glyph(status), status.label());
    match status {
        AgentStatus::Active => text.green(),
        AgentStatus::Computing => text.cyan(),
        AgentStatus::Idle => text.dimmed(),
        AgentStatus::Blocked => text.red(),
        AgentStatus::Waiting => text.yellow(),
    }
}

/// e.g. `5 agents, 2 live: 1 active, 1 computing, 3 idle`
pub fn status_summary(catalog: &AgentCatalog) -> String {
    let counts = catalog
        .status_counts()
        .into_iter()
        .map(|(status, count)| format!("{count} {status}"))
        .collect::<Vec<_>>()
        .join(", ");
    let noun = if catalog.len() == 1 {
        "agent"
    } else {
        "agents"
    };
    if counts.is_empty() {
        return format!("0 {noun}");
    }
    format!(
        "{} {noun}, {} live: {counts}",
        catalog.len(),
        catalog.live_count()
    )
}

pub fn grid_label(shape: GridShape) -> String {
    format!("{}×{}", shape.columns, shape.rows)
}

/// One text row per grid row, panes in visible order.
pub fn pane_rows(layout: &PaneLayout) -> Vec<String> {
    let visible = layout.visible_panes();
    if visible.is_empty() {
        return vec!["(no panes open)".to_string()];
    }
    let shape = layout.grid();
    let width = visible
        .iter()
        .map(|id| id.as_str().len())
        .max()
        .unwrap_or(0);
    visible
        .chunks(shape.columns.max(1))
        .map(|row| {
            row.iter()
                .map(|id| format!("[ {:<width$} ]", id.as_str()))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

pub fn layout_header(layout: &PaneLayout) -> String {
    format!(
        "{} ({}, {} open)",
        layout.view_label(),
        grid_label(layout.grid()),
        layout.open_order().len()
    )
}
