use bevy_egui::egui;

use crate::graph::timeline::PlaybackMode;
use crate::graph::{Action, AppState, PlaybackSpeed};
use crate::net::{FetchSlot, TokioTicker};
use crate::ui::rgb;
use crate::util::ids::display_time;

const FINDING_COLOR: u32 = 0xdc2626;

pub fn playback_section(ui: &mut egui::Ui, st: &AppState<TokioTicker>, actions: &mut Vec<Action>) {
    ui.horizontal(|ui| {
        ui.heading("Sessions");
        if st.is_loading(FetchSlot::Sessions) || st.is_loading(FetchSlot::Timeline) {
            ui.spinner();
        }
    });

    if st.ui.project.is_none() {
        ui.label("Select a project to see its sessions.");
        return;
    }
    if st.data.sessions.is_empty() {
        ui.label("No sessions for this project.");
        return;
    }

    egui::ScrollArea::vertical()
        .id_source("session_list")
        .max_height(120.0)
        .show(ui, |ui| {
            for s in &st.data.sessions {
                let current = st.ui.session.as_ref() == Some(&s.id);
                let text = format!("{} · {}", s.label, display_time(s.started_at.as_deref()));
                if ui.selectable_label(current, text).clicked() && !current {
                    actions.push(Action::SelectSession(s.id.clone()));
                }
            }
        });

    if st.ui.session.is_none() {
        return;
    }

    let pb = &st.playback;
    ui.add_space(6.0);
    ui.horizontal(|ui| {
        let play_label = if pb.mode() == PlaybackMode::Playing {
            "Pause"
        } else {
            "Play"
        };
        if ui
            .add_enabled(!pb.is_empty(), egui::Button::new(play_label))
            .clicked()
        {
            actions.push(Action::TogglePlay);
        }
        if ui
            .add_enabled(pb.next_finding().is_some(), egui::Button::new("Next finding"))
            .clicked()
        {
            actions.push(Action::SkipToFinding);
        }
        let (pos, len) = pb.progress();
        ui.label(format!("{pos}/{len}"));
    });

    ui.horizontal(|ui| {
        ui.label("Speed");
        for speed in PlaybackSpeed::ALL {
            if ui
                .selectable_label(pb.speed() == speed, speed.label())
                .clicked()
            {
                actions.push(Action::SetSpeed(speed));
            }
        }
    });

    if pb.is_empty() {
        ui.label("No timeline data for this session.");
        return;
    }

    let last = pb.activities().len() - 1;
    let mut index = pb.index();
    if ui
        .add(egui::Slider::new(&mut index, 0..=last).show_value(false))
        .changed()
    {
        actions.push(Action::Seek(index as i64));
    }

    egui::ScrollArea::vertical()
        .id_source("activity_list")
        .max_height(220.0)
        .show(ui, |ui| {
            for (i, a) in pb.activities().iter().enumerate() {
                let mut text = egui::RichText::new(format!("{} · {}", a.timestamp, a.action));
                if a.is_finding {
                    text = text.color(rgb(FINDING_COLOR)).strong();
                }
                let resp = ui.selectable_label(i == pb.index(), text);
                if resp.clicked() {
                    actions.push(Action::Seek(i as i64));
                }
                resp.on_hover_ui(|ui| {
                    ui.label(&a.result);
                    if let Some(sev) = &a.severity {
                        ui.label(format!("Severity: {sev}"));
                    }
                    if !a.tools.is_empty() {
                        ui.label(format!("Tools: {}", a.tools.join(", ")));
                    }
                });
            }
        });
}
