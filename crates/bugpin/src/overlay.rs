//! Badges and highlights for previously filed incidents, kept in sync
//! with the remote incident list and the live DOM.

pub mod reconciler;
pub mod urlmatch;

pub use reconciler::OverlayReconciler;
