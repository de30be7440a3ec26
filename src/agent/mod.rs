//! Communication with the diagnostic agent embedded in monitored processes.

pub mod commands;
pub mod discovery;
pub mod protocol;
pub mod target;

pub use commands::{AgentCommand, CommandTable};
pub use target::TargetResolver;
