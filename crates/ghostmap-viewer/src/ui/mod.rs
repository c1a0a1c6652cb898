use bevy::prelude::Resource;
use bevy_egui::egui;

pub mod detail;
pub mod hud;
pub mod outline;
pub mod panel;
pub mod playback;
pub mod shortcuts;
pub mod tooltips;

pub use detail::detail_panel;
pub use hud::hud_overlay;
pub use panel::ui_panel;
pub use shortcuts::handle_shortcuts;

pub const PANEL_W: f32 = 320.0;
pub const DETAIL_W: f32 = 360.0;
pub const HUD_EDGE_PADDING: f32 = 10.0;

#[derive(Resource, Clone, Copy)]
pub struct UiLayout {
    pub panel_rect: egui::Rect,
    pub detail_rect: egui::Rect,
    pub content_rect: egui::Rect,
}

impl Default for UiLayout {
    fn default() -> Self {
        Self {
            panel_rect: egui::Rect::NOTHING,
            detail_rect: egui::Rect::NOTHING,
            content_rect: egui::Rect::NOTHING,
        }
    }
}

/// Hex `0xRRGGBB` to an egui colour.
pub fn rgb(hex: u32) -> egui::Color32 {
    egui::Color32::from_rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}
