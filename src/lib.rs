//! # cronheap
//!
//! `cronheap` is an in-process job scheduler driven by cron expressions.
//! Schedules compile down to one 64-bit mask per field, pending entries
//! live in a min-heap keyed by their next firing instant, and a single
//! dispatch loop sleeps until the earliest one is due, launching each
//! firing on its own worker thread.
//!
//! ```no_run
//! use cronheap::{Cron, EntryOpts};
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//!
//! let cron = Arc::new(Cron::new());
//!
//! cron.add_fn("*/5 * * * *", || println!("five more minutes"), EntryOpts::new());
//! cron.add_fn("30 8 * * *", || println!("time for breakfast"), EntryOpts::new());
//! cron.add_fn(
//!     "@every 90s",
//!     || println!("an occasional nudge"),
//!     EntryOpts::new().max_execute_times(10).run_first(),
//! );
//!
//! let runner = Arc::clone(&cron);
//! let handle = thread::spawn(move || runner.run());
//!
//! thread::sleep(Duration::from_secs(600));
//! cron.stop();
//! handle.join().unwrap();
//! ```
//!
//! Expressions follow classic cron: five fields (minute, hour, day-of-month,
//! month, day-of-week) with `*`, ranges, steps, commas and month/weekday
//! names, plus the `@yearly`…`@hourly` shorthands and `@every <duration>`.
//! A parser built with [`ParseOptions::ALL`] accepts a leading seconds
//! field as well.

mod bounds;
mod cron;
mod entry;
mod error;
mod heap;
mod logger;
mod parser;
mod schedule;

pub use crate::cron::Cron;
pub use crate::entry::{Entry, EntryOpts, Job};
pub use crate::error::{Error, Result};
pub use crate::logger::{LogFacade, Logger};
pub use crate::parser::{ParseOptions, Parser, SpecParser};
pub use crate::schedule::{EverySchedule, Schedule, SpecSchedule};

/// Timestamps are in the user's local timezone.
pub type Timestamp = chrono::DateTime<chrono::Local>;
