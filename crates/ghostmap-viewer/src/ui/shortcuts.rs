use bevy::prelude::ResMut;
use bevy_egui::{egui, EguiContexts};

use crate::app::resources::{Controller, Net};
use crate::graph::{Action, PlaybackSpeed};

pub fn handle_shortcuts(
    mut contexts: EguiContexts,
    mut ctrl: ResMut<Controller>,
    mut net: ResMut<Net>,
) {
    let ctx = contexts.ctx_mut();
    let mut actions = Vec::new();

    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) && ctrl.0.focus.selected().is_some() {
        actions.push(Action::SelectNode(None));
    }

    if !ctx.wants_keyboard_input() && ctrl.0.ui.session.is_some() {
        let index = ctrl.0.playback.index() as i64;
        ctx.input(|i| {
            if i.key_pressed(egui::Key::Space) {
                actions.push(Action::TogglePlay);
            }
            if i.key_pressed(egui::Key::ArrowLeft) {
                actions.push(Action::Seek(index - 1));
            }
            if i.key_pressed(egui::Key::ArrowRight) {
                actions.push(Action::Seek(index + 1));
            }
            if i.key_pressed(egui::Key::N) {
                actions.push(Action::SkipToFinding);
            }
            for (key, speed) in [
                (egui::Key::Num1, PlaybackSpeed::X1),
                (egui::Key::Num2, PlaybackSpeed::X2),
                (egui::Key::Num5, PlaybackSpeed::X5),
            ] {
                if i.key_pressed(key) {
                    actions.push(Action::SetSpeed(speed));
                }
            }
        });
    }

    ctrl.dispatch(&mut net, actions);
}
