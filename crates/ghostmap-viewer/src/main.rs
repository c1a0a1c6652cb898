mod app;
mod graph;
mod net;
mod render;
mod ui;
mod util;

use anyhow::Result;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use tracing::info;

use crate::app::resources::{Controller, Net, NetRx, Settings};
use crate::app::GhostMapPlugin;
use crate::graph::model::EntityId;
use crate::graph::AppState;
use crate::net::{ApiClient, NetRuntime};
use crate::util::{args, config};

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

fn main() -> Result<()> {
    init_tracing();

    let args = args::parse_args()?;
    let mut cfg = config::load_or_default();
    args.apply_to(&mut cfg);

    let (tx, rx) = crossbeam_channel::unbounded();
    let api = ApiClient::new(&cfg.api_base, cfg.request_timeout())?;
    let net = NetRuntime::start(api, tx, cfg.ghost_poll_interval())?;

    let mut state = AppState::new(net.ticker());
    state.apply_viewer_config(&cfg);
    state.ui.project = args.project.as_deref().map(EntityId::from);
    info!(project = ?state.ui.project, strategy = %state.ui.strategy, "starting viewer");

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "GhostMap".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin)
        .add_plugins(GhostMapPlugin)
        .insert_resource(Controller(state))
        .insert_resource(Net(net))
        .insert_resource(NetRx(rx))
        .insert_resource(Settings(cfg))
        .run();
    Ok(())
}
