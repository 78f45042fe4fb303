//! Pane membership, maximization and grid arrangement.
//!
//! Everything here is pure state: no rendering, no I/O. The only invariant
//! worth stating is that a maximized agent is always one of the open panes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::catalog::AgentId;
use crate::error::{Error, Result};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LayoutMode {
    #[default]
    Grid,
    Columns,
    Rows,
}

impl LayoutMode {
    pub fn title(self) -> &'static str {
        match self {
            LayoutMode::Grid => "Grid",
            LayoutMode::Columns => "Columns",
            LayoutMode::Rows => "Rows",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub columns: usize,
    pub rows: usize,
}

impl GridShape {
    pub const SINGLE: GridShape = GridShape {
        columns: 1,
        rows: 1,
    };

    pub fn cells(self) -> usize {
        self.columns * self.rows
    }
}

/// Maps visible pane count and layout mode to a grid. First matching rule
/// wins.
pub fn grid_shape(count: usize, mode: LayoutMode, maximized: bool) -> GridShape {
    if maximized || count <= 1 {
        return GridShape::SINGLE;
    }
    let (columns, rows) = match mode {
        LayoutMode::Columns => (count.min(4), 1),
        LayoutMode::Rows => (1, count),
        LayoutMode::Grid => match count {
            2 => (2, 1),
            3..=4 => (2, 2),
            5..=6 => (3, 2),
            _ => (4, count.div_ceil(4)),
        },
    };
    GridShape { columns, rows }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneLayout {
    open_order: Vec<AgentId>,
    maximized: Option<AgentId>,
    mode: LayoutMode,
}

impl PaneLayout {
    pub fn new(mode: LayoutMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn open_order(&self) -> &[AgentId] {
        &self.open_order
    }

    pub fn maximized(&self) -> Option<&AgentId> {
        self.maximized.as_ref()
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn is_open(&self, agent_id: &AgentId) -> bool {
        self.open_order.contains(agent_id)
    }

    /// Returns `true` if the pane was not open before.
    pub fn open(&mut self, agent_id: &AgentId) -> bool {
        if self.is_open(agent_id) {
            return false;
        }
        self.open_order.push(agent_id.clone());
        true
    }

    /// Returns `true` if the pane was open.
    pub fn close(&mut self, agent_id: &AgentId) -> bool {
        let before = self.open_order.len();
        self.open_order.retain(|id| id != agent_id);
        if self.maximized.as_ref() == Some(agent_id) {
            self.maximized = None;
        }
        self.open_order.len() != before
    }

    /// Returns whether the pane is open afterwards.
    pub fn toggle(&mut self, agent_id: &AgentId) -> bool {
        if self.is_open(agent_id) {
            self.close(agent_id);
            false
        } else {
            self.open(agent_id);
            true
        }
    }

    pub fn maximize(&mut self, agent_id: &AgentId) -> Result<()> {
        if !self.is_open(agent_id) {
            return Err(Error::InvalidState(format!(
                "cannot maximize {agent_id}: pane is not open"
            )));
        }
        self.maximized = Some(agent_id.clone());
        Ok(())
    }

    pub fn restore(&mut self) {
        self.maximized = None;
    }

    pub fn toggle_maximize(&mut self, agent_id: &AgentId) -> Result<()> {
        if self.maximized.as_ref() == Some(agent_id) {
            self.restore();
            Ok(())
        } else {
            self.maximize(agent_id)
        }
    }

    /// Replaces the open panes with `ids` in the given order.
    pub fn open_all(&mut self, ids: impl IntoIterator<Item = AgentId>) {
        self.open_order.clear();
        for id in ids {
            self.open(&id);
        }
        if let Some(max) = &self.maximized
            && !self.open_order.contains(max)
        {
            self.maximized = None;
        }
    }

    pub fn close_all(&mut self) {
        self.open_order.clear();
        self.maximized = None;
    }

    /// Keeps only panes for which `keep` holds; returns the removed ids.
    pub fn retain<F>(&mut self, mut keep: F) -> Vec<AgentId>
    where
        F: FnMut(&AgentId) -> bool,
    {
        let (kept, removed): (Vec<_>, Vec<_>) =
            self.open_order.drain(..).partition(|id| keep(id));
        self.open_order = kept;
        if let Some(max) = &self.maximized
            && removed.contains(max)
        {
            self.maximized = None;
        }
        removed
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        self.mode = mode;
    }

    pub fn visible_panes(&self) -> &[AgentId] {
        match &self.maximized {
            Some(id) => std::slice::from_ref(id),
            None => &self.open_order,
        }
    }

    pub fn grid(&self) -> GridShape {
        grid_shape(
            self.visible_panes().len(),
            self.mode,
            self.maximized.is_some(),
        )
    }

    pub fn view_label(&self) -> String {
        if self.maximized.is_some() {
            "Focused view".to_string()
        } else {
            format!("{} layout", self.mode.title())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn ids(names: &[&str]) -> Vec<AgentId> {
        names.iter().map(|n| AgentId::from(*n)).collect()
    }

    fn layout_with(names: &[&str]) -> PaneLayout {
        let mut layout = PaneLayout::default();
        for id in ids(names) {
            layout.open(&id);
        }
        layout
    }

    #[rstest]
    #[case(0, LayoutMode::Grid, false, 1, 1)]
    #[case(1, LayoutMode::Rows, false, 1, 1)]
    #[case(5, LayoutMode::Grid, true, 1, 1)]
    #[case(2, LayoutMode::Columns, false, 2, 1)]
    #[case(6, LayoutMode::Columns, false, 4, 1)]
    #[case(3, LayoutMode::Rows, false, 1, 3)]
    #[case(8, LayoutMode::Rows, false, 1, 8)]
    #[case(2, LayoutMode::Grid, false, 2, 1)]
    #[case(3, LayoutMode::Grid, false, 2, 2)]
    #[case(4, LayoutMode::Grid, false, 2, 2)]
    #[case(5, LayoutMode::Grid, false, 3, 2)]
    #[case(6, LayoutMode::Grid, false, 3, 2)]
    #[case(7, LayoutMode::Grid, false, 4, 2)]
    #[case(8, LayoutMode::Grid, false, 4, 2)]
    #[case(9, LayoutMode::Grid, false, 4, 3)]
    fn grid_table(
        #[case] count: usize,
        #[case] mode: LayoutMode,
        #[case] maximized: bool,
        #[case] columns: usize,
        #[case] rows: usize,
    ) {
        assert_eq!(
            grid_shape(count, mode, maximized),
            GridShape { columns, rows }
        );
    }

    #[test]
    fn five_panes_in_grid_is_three_by_two() {
        let layout = layout_with(&["a", "b", "c", "d", "e"]);
        assert_eq!(layout.layout_mode(), LayoutMode::Grid);
        assert_eq!(
            layout.grid(),
            GridShape {
                columns: 3,
                rows: 2
            }
        );
    }

    #[test]
    fn closing_maximized_pane_clears_maximization() {
        let mut layout = layout_with(&["a", "b", "c"]);
        let b = AgentId::from("b");
        layout.maximize(&b).unwrap();
        assert_eq!(layout.visible_panes(), ids(&["b"]).as_slice());

        assert!(layout.close(&b));
        assert_eq!(layout.maximized(), None);
        assert_eq!(layout.open_order(), ids(&["a", "c"]).as_slice());
        assert_eq!(layout.visible_panes(), ids(&["a", "c"]).as_slice());
    }

    #[test]
    fn open_is_idempotent_and_keeps_order() {
        let mut layout = layout_with(&["a", "b"]);
        assert!(!layout.open(&AgentId::from("a")));
        assert!(layout.open(&AgentId::from("c")));
        assert_eq!(layout.open_order(), ids(&["a", "b", "c"]).as_slice());
    }

    #[test]
    fn toggle_opens_then_closes() {
        let mut layout = PaneLayout::default();
        let a = AgentId::from("a");
        assert!(layout.toggle(&a));
        assert!(layout.is_open(&a));
        assert!(!layout.toggle(&a));
        assert!(!layout.is_open(&a));
    }

    #[test]
    fn maximizing_closed_pane_is_rejected() {
        let mut layout = layout_with(&["a"]);
        let err = layout.maximize(&AgentId::from("z")).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(layout.maximized(), None);
    }

    #[test]
    fn toggle_maximize_round_trip() {
        let mut layout = layout_with(&["a", "b"]);
        let a = AgentId::from("a");
        layout.toggle_maximize(&a).unwrap();
        assert_eq!(layout.maximized(), Some(&a));
        assert_eq!(layout.view_label(), "Focused view");
        layout.toggle_maximize(&a).unwrap();
        assert_eq!(layout.maximized(), None);
        assert_eq!(layout.view_label(), "Grid layout");
    }

    #[test]
    fn layout_mode_does_not_touch_membership() {
        let mut layout = layout_with(&["a", "b", "c"]);
        layout.maximize(&AgentId::from("c")).unwrap();
        layout.set_layout_mode(LayoutMode::Rows);
        assert_eq!(layout.open_order(), ids(&["a", "b", "c"]).as_slice());
        assert_eq!(layout.maximized(), Some(&AgentId::from("c")));
        assert_eq!(layout.grid(), GridShape::SINGLE);
        layout.restore();
        assert_eq!(
            layout.grid(),
            GridShape {
                columns: 1,
                rows: 3
            }
        );
        assert_eq!(layout.view_label(), "Rows layout");
    }

    #[test]
    fn retain_filters_out_maximized_pane() {
        let mut layout = layout_with(&["a", "b", "c"]);
        layout.maximize(&AgentId::from("b")).unwrap();
        let removed = layout.retain(|id| id.as_str() != "b");
        assert_eq!(removed, ids(&["b"]));
        assert_eq!(layout.open_order(), ids(&["a", "c"]).as_slice());
        assert_eq!(layout.maximized(), None);
    }

    #[test]
    fn show_all_and_close_all() {
        let mut layout = layout_with(&["c"]);
        layout.maximize(&AgentId::from("c")).unwrap();
        layout.open_all(ids(&["a", "b", "c", "a"]));
        assert_eq!(layout.open_order(), ids(&["a", "b", "c"]).as_slice());
        assert_eq!(layout.maximized(), Some(&AgentId::from("c")));

        layout.close_all();
        assert!(layout.open_order().is_empty());
        assert_eq!(layout.maximized(), None);
    }

    #[test]
    fn layout_mode_parses_case_insensitively() {
        assert_eq!(
            LayoutMode::from_str("Columns").unwrap(),
            LayoutMode::Columns
        );
        assert_eq!(LayoutMode::from_str("rows").unwrap(), LayoutMode::Rows);
        assert!(LayoutMode::from_str("mosaic").is_err());
    }

    #[derive(Debug, Clone)]
    enum PaneOp {
        Open(u8),
        Close(u8),
        Toggle(u8),
        Maximize(u8),
        Restore,
        Mode(LayoutMode),
        Retain(u8),
    }

    fn arb_mode() -> impl Strategy<Value = LayoutMode> {
        prop_oneof![
            Just(LayoutMode::Grid),
            Just(LayoutMode::Columns),
            Just(LayoutMode::Rows),
        ]
    }

    fn arb_pane_op() -> impl Strategy<Value = PaneOp> {
        prop_oneof![
            (0u8..6).prop_map(PaneOp::Open),
            (0u8..6).prop_map(PaneOp::Close),
            (0u8..6).prop_map(PaneOp::Toggle),
            (0u8..6).prop_map(PaneOp::Maximize),
            Just(PaneOp::Restore),
            arb_mode().prop_map(PaneOp::Mode),
            (0u8..6).prop_map(PaneOp::Retain),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_grid_shape_is_pure_and_covers(count in 0usize..64, mode in arb_mode(), maximized in any::<bool>()) {
            let first = grid_shape(count, mode, maximized);
            prop_assert_eq!(first, grid_shape(count, mode, maximized));
            prop_assert!(first.columns >= 1 && first.rows >= 1);
            let columns_capped = mode == LayoutMode::Columns && count > 4;
            if !maximized && !columns_capped {
                prop_assert!(first.cells() >= count);
            }
        }

        #[test]
        fn prop_pane_invariants_hold(ops in prop::collection::vec(arb_pane_op(), 0..50)) {
            let mut layout = PaneLayout::default();
            for op in ops {
                match op {
                    PaneOp::Open(n) => { layout.open(&AgentId::new(n.to_string())); }
                    PaneOp::Close(n) => { layout.close(&AgentId::new(n.to_string())); }
                    PaneOp::Toggle(n) => { layout.toggle(&AgentId::new(n.to_string())); }
                    PaneOp::Maximize(n) => { let _ = layout.maximize(&AgentId::new(n.to_string())); }
                    PaneOp::Restore => layout.restore(),
                    PaneOp::Mode(mode) => layout.set_layout_mode(mode),
                    PaneOp::Retain(n) => {
                        let drop_id = n.to_string();
                        layout.retain(|id| id.as_str() != drop_id);
                    }
                }

                if let Some(max) = layout.maximized() {
                    prop_assert!(layout.is_open(max));
                    prop_assert_eq!(layout.visible_panes().len(), 1);
                }
                let mut seen = std::collections::HashSet::new();
                for id in layout.open_order() {
                    prop_assert!(seen.insert(id.clone()), "duplicate pane {}", id);
                }
            }
        }
    }
}
