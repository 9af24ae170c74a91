//! CLI subcommand implementations.

pub mod convert;
pub mod edit;
pub mod record;
pub mod report;
pub mod server;
pub mod util;
