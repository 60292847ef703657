mod adapters;
pub mod sim;
pub mod types;

pub use adapters::{Host, SharedHost};
pub use types::{
    ConsoleTap, FaultKind, Frame, NavigationState, NetworkOutcome, NetworkTap, OverlayKind,
    OverlayNode, PageFault, ScreenState,
};
