use bevy::prelude::{ResMut, Resource};
use bevy_egui::{egui, EguiContexts};
use std::collections::HashSet;

use crate::app::resources::{Controller, Net};
use crate::graph::layout::{Layout, LayoutNode, LayoutNodeKind, Point};
use crate::graph::Action;
use crate::ui::tooltips::render_tooltip;
use crate::ui::{rgb, UiLayout};
use crate::util::ids::short_label;

const NODE_H: f32 = 40.0;
const ENDPOINT_H: f32 = 28.0;
const FIT_MARGIN: f32 = 40.0;
const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 3.0;
const ZOOM_STEP: f32 = 0.0015;

const EDGE_COLOR: egui::Color32 = egui::Color32::from_rgb(0x94, 0xa3, 0xb8);
const GHOST_COLOR: egui::Color32 = egui::Color32::from_rgb(0xf5, 0x9e, 0x0b);
const SELECT_COLOR: egui::Color32 = egui::Color32::from_rgb(0x11, 0x18, 0x27);
const TEXT_COLOR: egui::Color32 = egui::Color32::from_rgb(0x0f, 0x17, 0x2a);

/// Pan/zoom of the graph canvas. Positions are layout units around the
/// canvas centre.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct CanvasView {
    pub pan: egui::Vec2,
    pub zoom: f32,
    pub seen_revision: Option<u64>,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self {
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            seen_revision: None,
        }
    }
}

fn node_size(node: &LayoutNode) -> egui::Vec2 {
    let h = match node.kind {
        LayoutNodeKind::Endpoint { .. } => ENDPOINT_H,
        _ => NODE_H,
    };
    egui::vec2(node.style.width as f32, h)
}

impl CanvasView {
    pub fn to_screen(&self, rect: egui::Rect, p: Point) -> egui::Pos2 {
        rect.center() + self.pan + egui::vec2(p.x, p.y) * self.zoom
    }

    fn node_rect(&self, rect: egui::Rect, node: &LayoutNode) -> egui::Rect {
        egui::Rect::from_center_size(
            self.to_screen(rect, node.position),
            node_size(node) * self.zoom,
        )
    }

    /// Centres the layout's bounding box in `rect`, never zooming in past 1.
    pub fn fit(&mut self, rect: egui::Rect, layout: &Layout) {
        let mut bounds = egui::Rect::NOTHING;
        for node in &layout.nodes {
            let size = node_size(node);
            bounds = bounds.union(egui::Rect::from_center_size(
                egui::pos2(node.position.x, node.position.y),
                size,
            ));
        }
        if !bounds.is_positive() {
            *self = Self::default();
            return;
        }
        let avail = (rect.size() - egui::vec2(FIT_MARGIN, FIT_MARGIN) * 2.0).max(egui::vec2(1.0, 1.0));
        let zoom = (avail.x / bounds.width())
            .min(avail.y / bounds.height())
            .clamp(MIN_ZOOM, 1.0);
        self.zoom = zoom;
        self.pan = -bounds.center().to_vec2() * zoom;
    }

    /// Zooms by `delta` keeping the layout point under `anchor` in place.
    pub fn zoom_at(&mut self, rect: egui::Rect, anchor: egui::Pos2, delta: f32) {
        let next = (self.zoom * (1.0 + delta * ZOOM_STEP)).clamp(MIN_ZOOM, MAX_ZOOM);
        let offset = anchor - rect.center();
        let world = (offset - self.pan) / self.zoom;
        self.pan = offset - world * next;
        self.zoom = next;
    }
}

pub fn draw_canvas(
    mut contexts: EguiContexts,
    mut ctrl: ResMut<Controller>,
    mut net: ResMut<Net>,
    mut view: ResMut<CanvasView>,
    mut ui_layout: ResMut<UiLayout>,
) {
    let ctx = contexts.ctx_mut().clone();
    let st = &ctrl.0;
    let layout = &st.view.layout;
    let mut actions = Vec::new();
    let mut hovered: Option<(egui::Pos2, Vec<String>)> = None;

    let ghost_path: HashSet<String> = st
        .focus
        .ghost()
        .and_then(|key| layout.node_for_key(key))
        .map(|n| layout.path_to(&n.id).into_iter().collect())
        .unwrap_or_default();
    let live_target = st.ghost_target();

    egui::CentralPanel::default()
        .frame(egui::Frame::none())
        .show(&ctx, |ui| {
            let (resp, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let rect = resp.rect;
            ui_layout.content_rect = rect;

            if view.seen_revision != Some(st.view.revision) {
                view.seen_revision = Some(st.view.revision);
                view.fit(rect, layout);
            }
            if resp.dragged() {
                view.pan += resp.drag_delta();
            }
            if let Some(ptr) = resp.hover_pos() {
                let scroll = ui.input(|i| i.smooth_scroll_delta.y);
                if scroll != 0.0 {
                    view.zoom_at(rect, ptr, scroll);
                }
            }

            for edge in &layout.edges {
                let (Some(a), Some(b)) = (layout.node(&edge.source), layout.node(&edge.target))
                else {
                    continue;
                };
                let on_path = ghost_path.contains(&edge.source) && ghost_path.contains(&edge.target);
                let stroke = if on_path {
                    egui::Stroke::new(3.0, GHOST_COLOR)
                } else {
                    egui::Stroke::new(1.0, EDGE_COLOR)
                };
                painter.line_segment(
                    [view.to_screen(rect, a.position), view.to_screen(rect, b.position)],
                    stroke,
                );
            }

            let font = egui::FontId::proportional((13.0 * view.zoom).clamp(6.0, 20.0));
            let pointer = resp.hover_pos();
            let mut clicked_node: Option<&LayoutNode> = None;
            for node in &layout.nodes {
                let r = view.node_rect(rect, node);
                if !rect.intersects(r) {
                    continue;
                }
                let key = node.source_key();
                let selected = key.is_some() && key.as_ref() == st.focus.selected();
                let ghost = key.is_some() && key.as_ref() == st.focus.ghost();
                let stroke = if selected {
                    egui::Stroke::new(3.0, SELECT_COLOR)
                } else {
                    egui::Stroke::new(1.5, rgb(node.style.stroke))
                };
                let rounding = match node.kind {
                    LayoutNodeKind::Endpoint { .. } => r.height() / 2.0,
                    _ => 6.0 * view.zoom,
                };
                painter.rect(r, rounding, rgb(node.style.fill), stroke);
                if ghost {
                    painter.rect_stroke(r.expand(4.0), rounding + 4.0, egui::Stroke::new(2.5, GHOST_COLOR));
                }
                if key.is_some() && key == live_target {
                    painter.text(
                        r.right_top() + egui::vec2(4.0, 0.0),
                        egui::Align2::LEFT_BOTTOM,
                        "live",
                        egui::FontId::proportional(11.0),
                        GHOST_COLOR,
                    );
                }
                painter.text(
                    r.center(),
                    egui::Align2::CENTER_CENTER,
                    short_label(&node.label),
                    font.clone(),
                    TEXT_COLOR,
                );

                if pointer.is_some_and(|p| r.contains(p)) {
                    if resp.clicked() {
                        clicked_node = Some(node);
                    }
                    hovered = pointer.map(|p| (p + egui::vec2(14.0, 14.0), tooltip_lines(node)));
                }
            }

            if resp.clicked() {
                let key = clicked_node.and_then(LayoutNode::source_key);
                if key.is_some() || clicked_node.is_none() {
                    actions.push(Action::SelectNode(key));
                }
            }
        });

    if let Some((pos, lines)) = hovered {
        render_tooltip(&ctx, "canvas_tooltip", pos, lines);
    }

    ctrl.dispatch(&mut net, actions);
}

fn tooltip_lines(node: &LayoutNode) -> Vec<String> {
    match &node.kind {
        LayoutNodeKind::Endpoint {
            status,
            method,
            url,
            snapshot,
            ..
        } => {
            let mut lines = vec![
                format!("{} {}", method.to_ascii_uppercase(), url),
                format!("Status: {}", status.label()),
            ];
            if let Some(code) = snapshot.response.status_code {
                lines.push(format!("Last response: HTTP {code}"));
            }
            lines
        }
        LayoutNodeKind::Route { group, .. } => vec![format!("Route group {group}")],
        _ => vec![node.label.clone()],
    }
}
