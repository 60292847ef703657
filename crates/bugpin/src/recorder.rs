//! Passive diagnostic recorders installed over the host's console and
//! network primitives.

pub mod console;
pub mod network;

pub use console::ConsoleRecorder;
pub use network::NetworkRecorder;
