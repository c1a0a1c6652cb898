use bevy::app::AppExit;
use bevy::prelude::*;

use crate::app::resources::{Controller, Net, NetRx};
use crate::graph::Action;

pub mod resources;

pub struct GhostMapPlugin;

impl Plugin for GhostMapPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<crate::ui::UiLayout>()
            .init_resource::<crate::render::CanvasView>()
            .add_systems(Startup, (crate::render::setup_camera, initial_load))
            .add_systems(
                Update,
                (
                    pump_network,
                    crate::ui::handle_shortcuts,
                    crate::ui::ui_panel,
                    crate::ui::detail_panel,
                    crate::render::draw_canvas,
                    crate::ui::hud_overlay,
                    teardown_on_exit,
                )
                    .chain(),
            );
    }
}

fn initial_load(mut ctrl: ResMut<Controller>, mut net: ResMut<Net>) {
    ctrl.dispatch(&mut net, [Action::Refresh]);
}

fn pump_network(mut ctrl: ResMut<Controller>, mut net: ResMut<Net>, rx: Res<NetRx>) {
    for msg in rx.0.try_iter().take(10_000) {
        for effect in ctrl.0.apply(msg) {
            net.0.run(effect);
        }
    }
}

fn teardown_on_exit(
    mut exits: EventReader<AppExit>,
    mut ctrl: ResMut<Controller>,
    mut net: ResMut<Net>,
) {
    if exits.read().next().is_some() {
        ctrl.dispatch(&mut net, [Action::Teardown]);
    }
}
