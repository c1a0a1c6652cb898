use bevy::prelude::{Local, ResMut};
use bevy_egui::{egui, EguiContexts};
use ghostmap_core::NewProject;

use crate::app::resources::{Controller, Net, Settings};
use crate::graph::filter::{MethodFilter, StatusFilter};
use crate::graph::model::{EntityId, TestStatus};
use crate::graph::{Action, LayoutStrategyKind};
use crate::net::{FetchSlot, Mutation};
use crate::ui::{UiLayout, PANEL_W};
use crate::util::config;

#[derive(Default)]
pub struct PanelForms {
    search: String,
    new_project: String,
    settings_msg: Option<Result<String, String>>,
}

pub fn ui_panel(
    mut contexts: EguiContexts,
    mut ctrl: ResMut<Controller>,
    mut net: ResMut<Net>,
    mut settings: ResMut<Settings>,
    mut layout: ResMut<UiLayout>,
    mut forms: Local<PanelForms>,
) {
    let mut actions: Vec<Action> = Vec::new();
    let st = &ctrl.0;
    if forms.search != st.ui.criteria.search && !st.ui.criteria.search.is_empty() {
        forms.search = st.ui.criteria.search.clone();
    }

    let panel = egui::SidePanel::left("left")
        .default_width(PANEL_W)
        .resizable(true)
        .show(contexts.ctx_mut(), |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("GhostMap");
                ui.label(format!("API: {}", settings.0.api_base));
                ui.separator();

                project_section(ui, st, &mut forms, &mut actions);

                ui.add_space(8.0);
                ui.separator();
                ui.heading("Filters");
                filter_section(ui, st, &mut forms, &mut actions);

                ui.add_space(8.0);
                ui.separator();
                ui.heading("Layout");
                for kind in LayoutStrategyKind::ALL {
                    if ui
                        .radio(st.ui.strategy == kind, kind.label())
                        .clicked()
                    {
                        actions.push(Action::SetStrategy(kind));
                    }
                }

                let stats = st.view.filtered.stats;
                ui.add_space(4.0);
                ui.label(format!(
                    "{} targets · {} urls · {} endpoints · {} findings",
                    stats.targets, stats.urls, stats.endpoints, stats.findings
                ));

                ui.add_space(8.0);
                ui.separator();
                egui::CollapsingHeader::new("Outline")
                    .default_open(true)
                    .show(ui, |ui| super::outline::outline_tree(ui, st, &mut actions));

                ui.add_space(8.0);
                ui.separator();
                super::playback::playback_section(ui, st, &mut actions);

                ui.add_space(8.0);
                ui.separator();
                egui::CollapsingHeader::new("Settings")
                    .default_open(false)
                    .show(ui, |ui| settings_section(ui, st, &mut settings, &mut forms));
            });
        });
    layout.panel_rect = panel.response.rect;

    ctrl.dispatch(&mut net, actions);
}

fn project_label(name: &str, id: &EntityId) -> String {
    if name.is_empty() {
        format!("Project {id}")
    } else {
        name.to_string()
    }
}

fn project_section(
    ui: &mut egui::Ui,
    st: &crate::graph::AppState<crate::net::TokioTicker>,
    forms: &mut PanelForms,
    actions: &mut Vec<Action>,
) {
    let selected_text = st
        .ui
        .project
        .as_ref()
        .map(|id| {
            st.data
                .projects
                .iter()
                .find(|p| &p.id == id)
                .map(|p| project_label(&p.name, &p.id))
                .unwrap_or_else(|| format!("Project {id}"))
        })
        .unwrap_or_else(|| "(none)".to_string());

    ui.horizontal(|ui| {
        egui::ComboBox::from_id_source("project_select")
            .selected_text(selected_text)
            .width(180.0)
            .show_ui(ui, |ui| {
                if ui
                    .selectable_label(st.ui.project.is_none(), "(none)")
                    .clicked()
                {
                    actions.push(Action::SetProject(None));
                }
                for p in &st.data.projects {
                    let current = st.ui.project.as_ref() == Some(&p.id);
                    if ui
                        .selectable_label(current, project_label(&p.name, &p.id))
                        .clicked()
                    {
                        actions.push(Action::SetProject(Some(p.id.clone())));
                    }
                }
            });
        if ui.button("Refresh").clicked() {
            actions.push(Action::Refresh);
        }
        if st.is_loading(FetchSlot::VisualMap) || st.is_loading(FetchSlot::Projects) {
            ui.spinner();
        }
    });

    let mut all = st.ui.show_all_projects;
    if ui.checkbox(&mut all, "Show every project").changed() {
        actions.push(Action::ShowAllProjects(all));
    }

    ui.horizontal(|ui| {
        ui.add(
            egui::TextEdit::singleline(&mut forms.new_project)
                .hint_text("New project name")
                .desired_width(180.0),
        );
        let name = forms.new_project.trim().to_string();
        if ui
            .add_enabled(!name.is_empty(), egui::Button::new("Create"))
            .clicked()
        {
            actions.push(Action::Mutate(Mutation::CreateProject(NewProject {
                name,
                description: None,
            })));
            forms.new_project.clear();
        }
    });
}

fn filter_section(
    ui: &mut egui::Ui,
    st: &crate::graph::AppState<crate::net::TokioTicker>,
    forms: &mut PanelForms,
    actions: &mut Vec<Action>,
) {
    let resp = ui.add(
        egui::TextEdit::singleline(&mut forms.search)
            .hint_text("Search url, method, status, test type"),
    );
    if resp.changed() {
        actions.push(Action::SetSearch(forms.search.clone()));
    }

    let criteria = &st.ui.criteria;
    let target_text = criteria
        .target
        .as_ref()
        .and_then(|id| st.data.target_options.iter().find(|o| &o.id == id))
        .map(|o| o.label.clone())
        .unwrap_or_else(|| "All targets".to_string());
    egui::ComboBox::from_id_source("target_filter")
        .selected_text(target_text)
        .show_ui(ui, |ui| {
            if ui
                .selectable_label(criteria.target.is_none(), "All targets")
                .clicked()
            {
                actions.push(Action::SetTargetFilter(None));
            }
            for opt in &st.data.target_options {
                let current = criteria.target.as_ref() == Some(&opt.id);
                if ui.selectable_label(current, &opt.label).clicked() {
                    actions.push(Action::SetTargetFilter(Some(opt.id.clone())));
                }
            }
        });

    ui.horizontal(|ui| {
        let method_text = match &criteria.method {
            MethodFilter::All => "ALL".to_string(),
            MethodFilter::Only(m) => m.to_ascii_uppercase(),
        };
        egui::ComboBox::from_id_source("method_filter")
            .selected_text(method_text)
            .width(90.0)
            .show_ui(ui, |ui| {
                if ui
                    .selectable_label(criteria.method == MethodFilter::All, "ALL")
                    .clicked()
                {
                    actions.push(Action::SetMethodFilter(MethodFilter::All));
                }
                for m in &st.data.method_options {
                    let current = matches!(&criteria.method, MethodFilter::Only(cur) if cur.eq_ignore_ascii_case(m));
                    if ui.selectable_label(current, m).clicked() {
                        actions.push(Action::SetMethodFilter(MethodFilter::Only(m.clone())));
                    }
                }
            });

        let status_text = match criteria.status {
            StatusFilter::All => "ALL",
            StatusFilter::Only(s) => s.label(),
        };
        egui::ComboBox::from_id_source("status_filter")
            .selected_text(status_text)
            .width(110.0)
            .show_ui(ui, |ui| {
                if ui
                    .selectable_label(criteria.status == StatusFilter::All, "ALL")
                    .clicked()
                {
                    actions.push(Action::SetStatusFilter(StatusFilter::All));
                }
                for s in TestStatus::ALL {
                    if ui
                        .selectable_label(criteria.status == StatusFilter::Only(s), s.label())
                        .clicked()
                    {
                        actions.push(Action::SetStatusFilter(StatusFilter::Only(s)));
                    }
                }
            });
    });

    if !criteria.is_empty() && ui.small_button("Clear filters").clicked() {
        forms.search.clear();
        actions.push(Action::SetSearch(String::new()));
        actions.push(Action::SetTargetFilter(None));
        actions.push(Action::SetMethodFilter(MethodFilter::All));
        actions.push(Action::SetStatusFilter(StatusFilter::All));
    }
}

fn settings_section(
    ui: &mut egui::Ui,
    st: &crate::graph::AppState<crate::net::TokioTicker>,
    settings: &mut Settings,
    forms: &mut PanelForms,
) {
    ui.checkbox(&mut settings.0.auto_play, "Auto-play on session load");
    ui.label(format!(
        "Ghost poll: {} ms · request timeout: {} ms",
        settings.0.ghost_poll_ms, settings.0.request_timeout_ms
    ));
    if ui.button("Save current view as defaults").clicked() {
        settings.0.default_strategy = st.ui.strategy;
        settings.0.default_speed = st.playback.speed();
        forms.settings_msg = Some(match config::save(&settings.0) {
            Ok(()) => Ok("Saved.".to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "saving viewer config failed");
                Err(format!("{e:#}"))
            }
        });
    }
    match &forms.settings_msg {
        Some(Ok(msg)) => {
            ui.label(msg);
        }
        Some(Err(msg)) => {
            ui.label(egui::RichText::new(msg).color(egui::Color32::LIGHT_RED));
        }
        None => {}
    }
}
