pub mod canvas;

use bevy::prelude::*;
use bevy::render::camera::ClearColorConfig;

pub use canvas::{draw_canvas, CanvasView};

/// egui draws everything; the camera only gives it a surface.
pub fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2dBundle {
        camera: Camera {
            clear_color: ClearColorConfig::Custom(Color::srgb(0.97, 0.98, 0.99)),
            ..default()
        },
        ..default()
    });
}
