//! Optional progress logger for migration batches.

use std::fmt;
use tracing::info;

/// Receives one formatted message per completed migration step.
///
/// An orchestrator without a logger simply emits nothing.
pub trait MigrationLogger: Send + Sync {
    fn log(&self, args: fmt::Arguments<'_>);
}

/// Forwards progress messages to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl MigrationLogger for TracingLogger {
    fn log(&self, args: fmt::Arguments<'_>) {
        info!("{}", args);
    }
}

impl<L: MigrationLogger + ?Sized> MigrationLogger for std::sync::Arc<L> {
    fn log(&self, args: fmt::Arguments<'_>) {
        (**self).log(args);
    }
}
