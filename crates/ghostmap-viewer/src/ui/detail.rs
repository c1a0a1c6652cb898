use bevy::prelude::{Local, ResMut};
use bevy_egui::{egui, EguiContexts};
use ghostmap_core::{NewRecommendation, NewStatus, StatusUpdate};

use crate::app::resources::{Controller, Net};
use crate::graph::layout::status_color;
use crate::graph::model::{Endpoint, HttpSnapshot, Target, TestStatus};
use crate::graph::normalize::DEFAULT_PRIORITY;
use crate::graph::Action;
use crate::net::Mutation;
use crate::ui::{rgb, UiLayout, DETAIL_W};
use crate::util::ids::display_time;

pub struct DetailForms {
    status: TestStatus,
    test_type: String,
    notes: String,
    recommendation: String,
    priority: i64,
}

impl Default for DetailForms {
    fn default() -> Self {
        Self {
            status: TestStatus::Planned,
            test_type: String::new(),
            notes: String::new(),
            recommendation: String::new(),
            priority: DEFAULT_PRIORITY,
        }
    }
}

pub fn detail_panel(
    mut contexts: EguiContexts,
    mut ctrl: ResMut<Controller>,
    mut net: ResMut<Net>,
    mut layout: ResMut<UiLayout>,
    mut forms: Local<DetailForms>,
) {
    let st = &ctrl.0;
    let endpoint = st.selected_endpoint();
    let target = st.selected_target();
    if endpoint.is_none() && target.is_none() {
        layout.detail_rect = egui::Rect::NOTHING;
        return;
    }

    let mut actions = Vec::new();
    let panel = egui::SidePanel::right("detail")
        .default_width(DETAIL_W)
        .resizable(true)
        .show(contexts.ctx_mut(), |ui| {
            ui.horizontal(|ui| {
                ui.heading("Details");
                if ui.small_button("Close").clicked() {
                    actions.push(Action::SelectNode(None));
                }
            });
            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| {
                if let Some(ep) = endpoint {
                    endpoint_section(ui, ep, &mut forms, &mut actions);
                    ui.add_space(10.0);
                    ui.separator();
                }
                if let Some(t) = target {
                    target_section(ui, t, &mut forms, &mut actions);
                }
            });
        });
    layout.detail_rect = panel.response.rect;

    ctrl.dispatch(&mut net, actions);
}

fn endpoint_section(
    ui: &mut egui::Ui,
    ep: &Endpoint,
    forms: &mut DetailForms,
    actions: &mut Vec<Action>,
) {
    let current = ep.current_status();
    ui.label(egui::RichText::new(format!("{} {}", ep.method.to_ascii_uppercase(), ep.url)).strong());
    ui.label(egui::RichText::new(current.label()).color(rgb(status_color(current))));
    if let Some(notes) = &ep.notes {
        ui.label(notes);
    }

    let coverage = ep.coverage();
    egui::Grid::new("coverage").num_columns(2).show(ui, |ui| {
        for (name, list) in [
            ("Tested", &coverage.tested),
            ("Planned", &coverage.planned),
            ("Recommended", &coverage.recommended),
        ] {
            ui.label(name);
            if list.is_empty() {
                ui.weak("none");
            } else {
                ui.label(list.join(", "));
            }
            ui.end_row();
        }
    });

    ui.add_space(6.0);
    ui.label(egui::RichText::new("Statuses").strong());
    if ep.statuses.is_empty() {
        ui.weak("No statuses recorded.");
    }
    for (i, s) in ep.statuses.iter().enumerate() {
        ui.horizontal(|ui| {
            let test_type = s.test_type.as_deref().unwrap_or("general");
            ui.label(format!("{test_type} · {}", display_time(s.updated_at.as_deref())));
            let Some(id) = &s.id else {
                ui.label(s.status.label());
                return;
            };
            egui::ComboBox::from_id_source(("status_edit", i))
                .selected_text(s.status.label())
                .width(110.0)
                .show_ui(ui, |ui| {
                    for option in TestStatus::ALL {
                        if ui.selectable_label(s.status == option, option.label()).clicked()
                            && s.status != option
                        {
                            actions.push(Action::Mutate(Mutation::UpdateStatus {
                                status: id.clone(),
                                body: StatusUpdate {
                                    status: Some(option.as_str().to_string()),
                                    ..StatusUpdate::default()
                                },
                            }));
                        }
                    }
                });
        });
        if let Some(notes) = &s.notes {
            ui.weak(notes);
        }
    }

    ui.add_space(4.0);
    ui.horizontal(|ui| {
        egui::ComboBox::from_id_source("new_status")
            .selected_text(forms.status.label())
            .width(110.0)
            .show_ui(ui, |ui| {
                for option in TestStatus::ALL {
                    ui.selectable_value(&mut forms.status, option, option.label());
                }
            });
        ui.add(
            egui::TextEdit::singleline(&mut forms.test_type)
                .hint_text("Test type")
                .desired_width(120.0),
        );
    });
    ui.add(egui::TextEdit::multiline(&mut forms.notes).hint_text("Notes").desired_rows(2));
    if ui.button("Add status").clicked() {
        actions.push(Action::Mutate(Mutation::AddStatus {
            endpoint: ep.id.clone(),
            body: NewStatus {
                status: forms.status.as_str().to_string(),
                test_type: non_empty(&forms.test_type),
                notes: non_empty(&forms.notes),
            },
        }));
        forms.test_type.clear();
        forms.notes.clear();
    }

    ui.add_space(6.0);
    ui.label(egui::RichText::new("Findings").strong());
    if ep.findings.is_empty() {
        ui.weak("No findings.");
    }
    for f in &ep.findings {
        ui.group(|ui| {
            ui.label(egui::RichText::new(&f.title).strong());
            ui.label(format!("{} · {}", f.severity, f.status));
            if let Some(desc) = &f.description {
                ui.label(desc);
            }
        });
    }

    ui.add_space(6.0);
    egui::CollapsingHeader::new("Request / response")
        .default_open(false)
        .show(ui, |ui| snapshot(ui, &ep.snapshot));
}

fn snapshot(ui: &mut egui::Ui, snap: &HttpSnapshot) {
    let req = &snap.request;
    ui.monospace(format!("{} {}", req.method, req.url));
    if let Some(h) = &req.headers {
        ui.monospace(h);
    }
    if let Some(b) = &req.body {
        ui.monospace(b);
    }
    ui.separator();
    let res = &snap.response;
    match res.status_code {
        Some(code) => ui.monospace(format!("HTTP {code}")),
        None => ui.monospace("HTTP ?"),
    };
    if let Some(h) = &res.headers {
        ui.monospace(h);
    }
    if let Some(b) = &res.body {
        ui.monospace(b);
    }
}

fn target_section(
    ui: &mut egui::Ui,
    target: &Target,
    forms: &mut DetailForms,
    actions: &mut Vec<Action>,
) {
    ui.label(egui::RichText::new(&target.hostname).strong());
    if let Some(notes) = &target.notes {
        ui.label(notes);
    }
    ui.label(format!(
        "{} urls · {} endpoints",
        target.urls.len(),
        target.endpoints().count()
    ));

    ui.add_space(6.0);
    ui.label(egui::RichText::new("Recommendations").strong());
    if target.recommendations.is_empty() {
        ui.weak("No open recommendations.");
    }
    for r in &target.recommendations {
        ui.label(format!("[{}] {}", r.priority, r.text));
    }

    ui.add_space(4.0);
    ui.add(
        egui::TextEdit::multiline(&mut forms.recommendation)
            .hint_text("New recommendation")
            .desired_rows(2),
    );
    ui.horizontal(|ui| {
        ui.label("Priority");
        ui.add(egui::DragValue::new(&mut forms.priority).range(1..=10));
        let text = forms.recommendation.trim().to_string();
        if ui
            .add_enabled(!text.is_empty(), egui::Button::new("Add"))
            .clicked()
        {
            actions.push(Action::Mutate(Mutation::AddRecommendation {
                target: target.id.clone(),
                body: NewRecommendation {
                    recommendation_text: text,
                    priority: forms.priority,
                },
            }));
            forms.recommendation.clear();
        }
    });
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
