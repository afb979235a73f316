//! The logging seam: scheduler events go through a replaceable sink.

use std::fmt;

/// Three-level sink for scheduler events.
///
/// The default forwards to the [`log`] facade; install your own with
/// [`Cron::with_logger`](crate::Cron::with_logger) to capture events
/// elsewhere.
pub trait Logger: Send + Sync {
    fn error(&self, args: fmt::Arguments);
    fn info(&self, args: fmt::Arguments);
    fn debug(&self, args: fmt::Arguments);
}

/// Forwards to the `log` macros at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacade;

impl Logger for LogFacade {
    fn error(&self, args: fmt::Arguments) {
        log::error!("{args}");
    }

    fn info(&self, args: fmt::Arguments) {
        log::info!("{args}");
    }

    fn debug(&self, args: fmt::Arguments) {
        log::debug!("{args}");
    }
}
