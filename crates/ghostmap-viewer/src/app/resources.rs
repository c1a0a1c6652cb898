use bevy::prelude::Resource;
use crossbeam_channel::Receiver;

use crate::graph::{Action, AppState};
use crate::net::{Incoming, NetRuntime, TokioTicker};

#[derive(Resource)]
pub struct NetRx(pub Receiver<Incoming>);

#[derive(Resource)]
pub struct Net(pub NetRuntime);

#[derive(Resource)]
pub struct Controller(pub AppState<TokioTicker>);

impl Controller {
    /// Runs each action through the controller and hands its effects to the runtime.
    pub fn dispatch(&mut self, net: &mut Net, actions: impl IntoIterator<Item = Action>) {
        for action in actions {
            for effect in self.0.update(action) {
                net.0.run(effect);
            }
        }
    }
}

/// Effective config: file merged with command-line flags.
#[derive(Resource)]
pub struct Settings(pub crate::util::config::ViewerConfig);
