//! Root logger helpers for hosts embedding the model.
use slog::Drain;
use std::fmt::Debug;

pub use slog::{Discard, Logger};

/// Wraps `drain` in an async drain and builds a root logger from it.
pub fn root<D>(drain: D) -> Logger
where
    D: Drain<Ok = ()> + Send + 'static,
    D::Err: Debug,
{
    let drain = slog_async::Async::new(drain.fuse()).build().fuse();

    Logger::root(drain, o!("crate" => "cbrl", "version" => env!("CARGO_PKG_VERSION")))
}

/// Terminal formatter writing to stdout.
pub fn stdout() -> slog::Fuse<slog_term::FullFormat<slog_term::TermDecorator>> {
    let decorator = slog_term::TermDecorator::new().stdout().build();

    slog_term::FullFormat::new(decorator).build().fuse()
}

/// Logger that drops every record; the default for a fresh model.
pub fn discard() -> Logger { Logger::root(Discard, o!()) }
