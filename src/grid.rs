//! Dashboard grid: a fixed number of columns, unbounded rows, widgets placed
//! as `w × h` rectangles. Widgets never overlap and always float up as far
//! as they can.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::model::{LayoutNode, WidgetSize};
use crate::storage::{self, StorageError};
use crate::store::KeyValueStore;

/// Bounds for positions and heights read from storage or an import.
pub const MAX_ROW: u16 = 1024;
pub const MAX_HEIGHT: u16 = 64;

/// What the loader asks the shell to put on the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub id: String,
    pub auto_position: bool,
    pub node: Option<LayoutNode>,
}

pub struct GridManager {
    columns: u16,
    nodes: Vec<LayoutNode>,
    edit_mode: bool,
    debounce: Duration,
    save_due: Option<Instant>,
    default_widgets: Vec<String>,
}

impl GridManager {
    pub fn new(columns: u16, debounce: Duration, default_widgets: Vec<String>) -> Self {
        GridManager {
            columns: columns.max(1),
            nodes: Vec::new(),
            edit_mode: false,
            debounce,
            save_due: None,
            default_widgets,
        }
    }

    /// Loads the persisted layout, handing every entry to `on_render`, and
    /// leaves the grid locked.
    pub fn init(
        &mut self,
        store: &dyn KeyValueStore,
        on_render: impl FnMut(&mut GridManager, Placement),
    ) {
        self.load_layout(store, on_render);
        self.set_edit_mode(false);
    }

    /// Saved positions win, then the bare list of active ids, then the
    /// configured default set.
    pub fn load_layout(
        &mut self,
        store: &dyn KeyValueStore,
        mut on_render: impl FnMut(&mut GridManager, Placement),
    ) {
        self.nodes.clear();
        self.save_due = None;

        let saved = storage::load_layout(store);
        if !saved.is_empty() {
            debug!(count = saved.len(), "restoring saved layout");
            for node in saved {
                let placement = Placement {
                    id: node.id.clone(),
                    auto_position: false,
                    node: Some(node),
                };
                on_render(self, placement);
            }
            return;
        }

        let active = storage::load_active_ids(store);
        let ids = if active.is_empty() {
            debug!("no saved layout, using default widgets");
            self.default_widgets.clone()
        } else {
            active
        };
        for id in ids {
            on_render(
                self,
                Placement {
                    id,
                    auto_position: true,
                    node: None,
                },
            );
        }
    }

    /// Places a widget. Returns false when the id is empty or already on
    /// the grid.
    pub fn add_widget(
        &mut self,
        id: &str,
        size: WidgetSize,
        auto_position: bool,
        node: Option<&LayoutNode>,
    ) -> bool {
        if id.is_empty() {
            return false;
        }
        if self.contains(id) {
            warn!(widget = id, "widget already on the grid");
            return false;
        }

        let (w, h) = match node {
            Some(n) => (n.w, n.h),
            None => (size.w, size.h),
        };
        let w = w.clamp(1, self.columns);
        let h = h.clamp(1, MAX_HEIGHT);

        match node {
            Some(n) if !auto_position => {
                let placed = LayoutNode {
                    id: id.to_string(),
                    x: n.x.min(self.columns - w),
                    y: n.y.min(MAX_ROW),
                    w,
                    h,
                };
                self.nodes.push(placed);
                self.settle(Some(id));
            }
            _ => {
                let (x, y) = self.first_free_slot(w, h);
                self.nodes.push(LayoutNode {
                    id: id.to_string(),
                    x,
                    y,
                    w,
                    h,
                });
                self.settle(None);
            }
        }
        true
    }

    pub fn remove_widget(&mut self, id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        if self.nodes.len() == before {
            return false;
        }
        self.settle(None);
        true
    }

    /// Persists the layout; returns the message to show when not silent.
    pub fn save_layout(
        &mut self,
        store: &mut dyn KeyValueStore,
        silent: bool,
    ) -> Result<Option<&'static str>, StorageError> {
        storage::save_layout(store, &self.nodes)?;
        self.save_due = None;
        if silent {
            debug!("layout saved");
            Ok(None)
        } else {
            info!(widgets = self.nodes.len(), "layout saved");
            Ok(Some("Layout saved"))
        }
    }

    pub fn set_edit_mode(&mut self, enabled: bool) -> Option<&'static str> {
        self.edit_mode = enabled;
        enabled.then_some("Edit mode enabled")
    }

    pub fn toggle_edit_mode(&mut self) -> Option<&'static str> {
        self.set_edit_mode(!self.edit_mode)
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn get_active_widgets(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|n| n.id.clone())
            .filter(|id| !id.is_empty())
            .collect()
    }

    /// Placed widgets in reading order (top to bottom, left to right).
    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    /// Number of grid rows in use.
    pub fn rows(&self) -> u16 {
        self.nodes
            .iter()
            .map(|n| n.y.saturating_add(n.h))
            .max()
            .unwrap_or(0)
    }

    /// Moves a widget by whole cells. Only allowed in edit mode.
    pub fn move_widget(&mut self, id: &str, dx: i32, dy: i32, now: Instant) -> bool {
        if !self.edit_mode {
            return false;
        }
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let current = self.nodes[idx].clone();
        let max_x = i32::from(self.columns - current.w);
        let x = (i32::from(current.x) + dx).clamp(0, max_x) as u16;
        let mut y = (i32::from(current.y) + dy).clamp(0, i32::from(MAX_ROW)) as u16;

        if dy > 0 {
            // Stepping down swaps with whatever sits directly below.
            let target = LayoutNode {
                x,
                y,
                ..current.clone()
            };
            let below: Vec<usize> = (0..self.nodes.len())
                .filter(|&i| i != idx && overlaps(&self.nodes[i], &target))
                .collect();
            if let Some(lift) = below.iter().map(|&i| self.nodes[i].h).max() {
                for &i in &below {
                    self.nodes[i].y = current.y;
                }
                y = current.y.saturating_add(lift);
            }
        }

        self.nodes[idx].x = x;
        self.nodes[idx].y = y;
        self.settle(Some(id));
        let changed = self.node(id) != Some(&current);
        if changed {
            self.schedule_save(now);
        }
        changed
    }

    /// Grows or shrinks a widget by whole cells. Only allowed in edit mode.
    pub fn resize_widget(&mut self, id: &str, dw: i32, dh: i32, now: Instant) -> bool {
        if !self.edit_mode {
            return false;
        }
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let current = self.nodes[idx].clone();
        let max_w = i32::from(self.columns - current.x);
        let w = (i32::from(current.w) + dw).clamp(1, max_w) as u16;
        let h = (i32::from(current.h) + dh).clamp(1, i32::from(MAX_HEIGHT)) as u16;
        if w == current.w && h == current.h {
            return false;
        }
        self.nodes[idx].w = w;
        self.nodes[idx].h = h;
        self.settle(Some(id));
        self.schedule_save(now);
        true
    }

    pub fn has_pending_save(&self) -> bool {
        self.save_due.is_some()
    }

    /// Writes the layout once the debounce window after the last change has
    /// passed. Returns whether a save happened.
    pub fn flush_pending(
        &mut self,
        store: &mut dyn KeyValueStore,
        now: Instant,
    ) -> Result<bool, StorageError> {
        match self.save_due {
            Some(due) if now >= due => {
                self.save_layout(store, true)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn schedule_save(&mut self, now: Instant) {
        if self.edit_mode {
            self.save_due = Some(now + self.debounce);
        }
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    fn first_free_slot(&self, w: u16, h: u16) -> (u16, u16) {
        let bottom = self.rows();
        for y in 0..=bottom {
            for x in 0..=(self.columns - w) {
                let candidate = LayoutNode {
                    id: String::new(),
                    x,
                    y,
                    w,
                    h,
                };
                if !self.nodes.iter().any(|n| overlaps(n, &candidate)) {
                    return (x, y);
                }
            }
        }
        (0, bottom)
    }

    /// Pushes widgets that collide with `anchor` (or with each other) down,
    /// then lets everything float up.
    fn settle(&mut self, anchor: Option<&str>) {
        let mut pending = std::mem::take(&mut self.nodes);
        pending.sort_by_key(|n| (n.y, n.x));
        if let Some(anchor) = anchor {
            if let Some(pos) = pending.iter().position(|n| n.id == anchor) {
                let node = pending.remove(pos);
                pending.insert(0, node);
            }
        }

        let mut placed: Vec<LayoutNode> = Vec::with_capacity(pending.len());
        for mut node in pending {
            while let Some(blocker) = placed.iter().find(|p| overlaps(p, &node)) {
                node.y = blocker.y.saturating_add(blocker.h);
            }
            placed.push(node);
        }

        placed.sort_by_key(|n| (n.y, n.x));
        let mut compacted: Vec<LayoutNode> = Vec::with_capacity(placed.len());
        for mut node in placed {
            while node.y > 0 {
                let lifted = LayoutNode {
                    y: node.y - 1,
                    ..node.clone()
                };
                if compacted.iter().any(|p| overlaps(p, &lifted)) {
                    break;
                }
                node.y -= 1;
            }
            compacted.push(node);
        }
        compacted.sort_by_key(|n| (n.y, n.x));
        self.nodes = compacted;
    }
}

fn overlaps(a: &LayoutNode, b: &LayoutNode) -> bool {
    a.x < b.x.saturating_add(b.w)
        && b.x < a.x.saturating_add(a.w)
        && a.y < b.y.saturating_add(b.h)
        && b.y < a.y.saturating_add(a.h)
}
