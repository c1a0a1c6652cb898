use bevy_egui::egui;

use crate::graph::layout::status_color;
use crate::graph::model::{NodeKey, Target};
use crate::graph::{Action, AppState};
use crate::net::TokioTicker;
use crate::ui::rgb;

/// Collapsible project > target > url > endpoint view of the filtered tree.
/// Header clicks select the node and flip its expanded state.
pub fn outline_tree(ui: &mut egui::Ui, st: &AppState<TokioTicker>, actions: &mut Vec<Action>) {
    let tree = &st.view.filtered.tree;
    if tree.is_empty() {
        ui.label("Nothing to show.");
        return;
    }
    for branch in tree.branches() {
        let key = NodeKey::project(&branch.project.id);
        header(ui, st, actions, key, &branch.project.name, |ui, actions| {
            if branch.targets.is_empty() {
                ui.weak("No targets");
            }
            for target in &branch.targets {
                target_header(ui, st, actions, target);
            }
        });
    }
}

fn target_header(
    ui: &mut egui::Ui,
    st: &AppState<TokioTicker>,
    actions: &mut Vec<Action>,
    target: &Target,
) {
    header(ui, st, actions, target.key(), &target.hostname, |ui, actions| {
        for group in &target.urls {
            let key = NodeKey::url(&target.id, &group.url);
            header(ui, st, actions, key, &group.url, |ui, actions| {
                for ep in &group.endpoints {
                    let key = ep.key();
                    let selected = st.focus.selected() == Some(&key);
                    let ghost = st.focus.ghost() == Some(&key);
                    let mut text = egui::RichText::new(format!(
                        "● {} {}",
                        ep.method.to_ascii_uppercase(),
                        ep.current_status().label()
                    ))
                    .color(rgb(status_color(ep.current_status())));
                    if ghost {
                        text = text.strong().underline();
                    }
                    if ui.selectable_label(selected, text).clicked() {
                        actions.push(Action::SelectNode(Some(key)));
                    }
                }
            });
        }
    });
}

fn header(
    ui: &mut egui::Ui,
    st: &AppState<TokioTicker>,
    actions: &mut Vec<Action>,
    key: NodeKey,
    label: &str,
    body: impl FnOnce(&mut egui::Ui, &mut Vec<Action>),
) {
    let mut text = egui::RichText::new(label);
    if st.focus.selected() == Some(&key) {
        text = text.strong();
    }
    if st.focus.ghost().is_some_and(|g| {
        st.source_tree()
            .index()
            .ancestors(g)
            .iter()
            .any(|a| a == &key)
    }) {
        text = text.italics();
    }
    let resp = egui::CollapsingHeader::new(text)
        .id_source(key.as_str())
        .open(Some(st.focus.is_expanded(&key)))
        .show(ui, |ui| body(ui, actions));
    if resp.header_response.clicked() {
        actions.push(Action::ToggleExpanded(key.clone()));
        actions.push(Action::SelectNode(Some(key)));
    }
}
