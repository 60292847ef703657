pub mod agent;
pub mod bus;

pub mod error;
pub mod types;
pub mod config;
pub mod host;

pub mod buffer;
pub mod record;
pub mod recorder;
pub mod fingerprint;
pub mod dom;
pub mod picker;
pub mod capture;
pub mod annotate;
pub mod report;
pub mod incident;
pub mod overlay;
pub mod wizard;
pub mod utils;

pub use crate::agent::Agent;
pub use crate::bus::{AgentEvent, Bus};
pub use crate::config::AgentConfig;
pub use crate::error::{AgentError, AgentResult};
pub use crate::host::{Host, SharedHost};
pub use crate::incident::{IncidentSource, RemoteIncident};
pub use crate::report::{ReportSink, SubmitHooks, SubmittedReport};
pub use crate::wizard::{ReportWizard, WizardStep};
