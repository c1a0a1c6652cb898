pub mod filter;
pub mod focus;
pub mod layout;
pub mod model;
pub mod normalize;
pub mod state;
pub mod timeline;
pub mod tree;

pub use layout::LayoutStrategyKind;
pub use state::{Action, AppState};
pub use timeline::PlaybackSpeed;
