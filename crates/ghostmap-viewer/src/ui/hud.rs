use bevy::prelude::Res;
use bevy_egui::{egui, EguiContexts};

use crate::app::resources::Controller;
use crate::graph::timeline::PlaybackMode;
use crate::net::FetchSlot;
use crate::ui::{UiLayout, HUD_EDGE_PADDING};

const HUD_MAX_W: f32 = 360.0;

pub fn hud_overlay(mut contexts: EguiContexts, ctrl: Res<Controller>, layout: Res<UiLayout>) {
    let st = &ctrl.0;
    let ctx = contexts.ctx_mut();
    let screen = ctx.screen_rect();
    let origin = if layout.content_rect.is_positive() {
        layout.content_rect.min
    } else if layout.panel_rect.is_positive() {
        egui::pos2(layout.panel_rect.max.x, screen.min.y)
    } else {
        screen.min
    };

    egui::Area::new("hud".into())
        .order(egui::Order::Foreground)
        .fixed_pos(origin + egui::vec2(HUD_EDGE_PADDING, HUD_EDGE_PADDING))
        .show(ctx, |ui| {
            ui.set_max_width(HUD_MAX_W);
            ui.group(|ui| {
                ui.label(st.focus.status_line());

                let (pos, len) = st.playback.progress();
                if len > 0 {
                    let mode = match st.playback.mode() {
                        PlaybackMode::Playing => "playing",
                        PlaybackMode::Paused => "paused",
                        PlaybackMode::Idle => "idle",
                    };
                    ui.label(format!(
                        "Step {pos}/{len} · {mode} · {}",
                        st.playback.speed().label()
                    ));
                }

                ui.separator();
                ui.label(format!("Ghost: {}", st.ghost.activity));
                if !st.ghost.target.is_empty() {
                    ui.label(format!("Target: {}", st.ghost.target));
                }
                ui.label(st.ghost.status.as_str());

                if let Some(err) = &st.data.last_error {
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                }
                if st.is_loading(FetchSlot::VisualMap) || st.is_loading(FetchSlot::Tree) {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading map");
                    });
                }
            });
        });
}
