//! The scheduler façade and its dispatch loop.

use crate::entry::{Entry, EntryOpts, Job};
use crate::heap::EntryHeap;
use crate::logger::{LogFacade, Logger};
use crate::parser::{Parser, SpecParser};
use chrono::Local;
use crossbeam_channel::{after, bounded, select, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How long the loop parks when nothing is due: effectively forever, until
/// a mutation arrives.
const IDLE_WAIT: Duration = Duration::from_secs(1_000_000 * 3600);

/// Everything the façade guards with its lock. While the dispatch loop is
/// running it owns the entries exclusively; the heap held here is then
/// empty, and mutations travel over the channels instead.
struct State {
    entries: EntryHeap,
    running: bool,
    last_id: i64,
}

/// An in-process cron scheduler backed by a min-heap of entries.
///
/// Jobs are registered with a textual schedule and dispatched on their own
/// worker threads; the dispatch loop itself runs on whichever thread calls
/// [`run`](Cron::run) and keeps going until [`stop`](Cron::stop) or
/// [`release`](Cron::release).
///
/// ```
/// use cronheap::{Cron, EntryOpts};
///
/// let cron = Cron::new();
/// let id = cron.add_fn("30 8 * * *", || println!("time for breakfast"), EntryOpts::new());
/// assert!(id > 0);
/// cron.remove(id);
/// ```
pub struct Cron {
    state: Mutex<State>,
    add_tx: Sender<Entry>,
    add_rx: Receiver<Entry>,
    remove_tx: Sender<i64>,
    remove_rx: Receiver<i64>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    release_tx: Sender<()>,
    release_rx: Receiver<()>,
    // The loop hands surviving entries back to `stop` on exit.
    handback_tx: Sender<EntryHeap>,
    handback_rx: Receiver<EntryHeap>,
    parser: Box<dyn Parser>,
    logger: Box<dyn Logger>,
}

impl Default for Cron {
    fn default() -> Self {
        Self::new()
    }
}

impl Cron {
    /// A scheduler with the standard five-field parser and the `log`-facade
    /// logger.
    pub fn new() -> Self {
        // Rendezvous channels: a sender meets the loop inside its select.
        // Senders hold the state lock while sending and the loop never
        // takes that lock, so the pairing cannot deadlock.
        let (add_tx, add_rx) = bounded(0);
        let (remove_tx, remove_rx) = bounded(0);
        let (stop_tx, stop_rx) = bounded(0);
        let (release_tx, release_rx) = bounded(0);
        let (handback_tx, handback_rx) = bounded(0);
        Cron {
            state: Mutex::new(State {
                entries: EntryHeap::default(),
                running: false,
                last_id: 0,
            }),
            add_tx,
            add_rx,
            remove_tx,
            remove_rx,
            stop_tx,
            stop_rx,
            release_tx,
            release_rx,
            handback_tx,
            handback_rx,
            parser: Box::new(SpecParser::default()),
            logger: Box::new(LogFacade),
        }
    }

    /// Replace the schedule parser. Call before starting the scheduler.
    pub fn with_parser(mut self, parser: impl Parser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Replace the logging sink. Call before starting the scheduler.
    pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    /// Register `job` to run on the given schedule.
    ///
    /// Returns the entry id, or `0` when the expression does not parse (the
    /// failure is logged at error level).
    pub fn add(&self, spec: &str, job: impl Job, opts: EntryOpts) -> i64 {
        let schedule = match self.parser.parse(spec) {
            Ok(schedule) => schedule,
            Err(err) => {
                self.logger.error(format_args!("add job failure: {err}"));
                return 0;
            }
        };
        let mut state = self.state.lock().unwrap();
        state.last_id += 1;
        let id = state.last_id;
        let entry = Entry {
            id,
            spec: spec.to_string(),
            schedule,
            job: Arc::new(job),
            next: None,
            prev: None,
            times: opts.times,
            count: 0,
            run_first: opts.run_first,
        };
        if state.running {
            let _ = self.add_tx.send(entry);
        } else {
            state.entries.push(entry);
        }
        id
    }

    /// Register a closure to run on the given schedule.
    pub fn add_fn<F>(&self, spec: &str, f: F, opts: EntryOpts) -> i64
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add(spec, f, opts)
    }

    /// Remove an entry by id. Best-effort: silent if the id is unknown.
    pub fn remove(&self, id: i64) {
        let mut state = self.state.lock().unwrap();
        if state.running {
            let _ = self.remove_tx.send(id);
        } else {
            state.entries.remove_id(id);
        }
    }

    /// Run the scheduler on the calling thread until [`stop`](Cron::stop)
    /// or [`release`](Cron::release). No-op if already running.
    pub fn run(&self) {
        let mut entries = {
            let mut state = self.state.lock().unwrap();
            if state.running {
                return;
            }
            state.running = true;
            std::mem::take(&mut state.entries)
        };
        self.logger.info(format_args!("start cron"));

        // Schedule everything from one snapshot of the clock, firing
        // run-first entries ahead of their first computed instant.
        let now = Local::now();
        for entry in entries.iter_mut() {
            entry.next = entry.schedule.next(now);
            if entry.run_first {
                entry.run_first = false;
                entry.count += 1;
                spawn_worker(&entry.job);
            }
        }
        // A run-first firing may already have used up a capped entry.
        entries.retain(|e| !e.exhausted());

        self.dispatch(entries);
    }

    /// Stop the scheduler, keeping its entries for a later run. No-op when
    /// not running.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.running {
            return;
        }
        let _ = self.stop_tx.send(());
        if let Ok(entries) = self.handback_rx.recv() {
            for entry in entries {
                state.entries.push(entry);
            }
        }
        state.running = false;
        self.logger.info(format_args!("stop cron"));
    }

    /// Stop the scheduler if it is running and discard every entry.
    pub fn release(&self) {
        let mut state = self.state.lock().unwrap();
        if state.running {
            let _ = self.release_tx.send(());
            state.running = false;
        }
        state.entries.clear();
        self.logger.info(format_args!("release cron"));
    }

    /// The single-threaded loop: sleep until the earliest `next`, fire
    /// everything due, and fold in one mutation per wakeup.
    fn dispatch(&self, mut entries: EntryHeap) {
        loop {
            let wait = match entries.peek().and_then(|e| e.next) {
                Some(next) => (next - Local::now()).to_std().unwrap_or(Duration::ZERO),
                None => IDLE_WAIT,
            };

            select! {
                recv(after(wait)) -> _ => {
                    let now = Local::now();
                    loop {
                        let due = matches!(
                            entries.peek(),
                            Some(e) if matches!(e.next, Some(next) if next <= now)
                        );
                        if !due {
                            break;
                        }
                        let Some(mut entry) = entries.pop() else {
                            break;
                        };
                        self.logger
                            .debug(format_args!("run entry {}: {}", entry.id, entry.spec));
                        spawn_worker(&entry.job);
                        entry.count += 1;
                        if entry.exhausted() {
                            self.logger.debug(format_args!(
                                "entry {} exhausted after {} runs",
                                entry.id, entry.count
                            ));
                            continue;
                        }
                        entry.prev = entry.next;
                        entry.next = entry.schedule.next(now);
                        entries.push(entry);
                    }
                },
                recv(self.add_rx) -> entry => {
                    if let Ok(mut entry) = entry {
                        entry.next = entry.schedule.next(Local::now());
                        self.logger
                            .debug(format_args!("add entry {}: {}", entry.id, entry.spec));
                        entries.push(entry);
                    }
                },
                recv(self.remove_rx) -> id => {
                    if let Ok(id) = id {
                        if entries.remove_id(id).is_some() {
                            self.logger.debug(format_args!("remove entry {id}"));
                        }
                    }
                },
                recv(self.stop_rx) -> _ => {
                    let _ = self.handback_tx.send(entries);
                    return;
                },
                recv(self.release_rx) -> _ => {
                    return;
                },
            }
        }
    }
}

/// Each firing gets a fresh worker thread; a panicking job takes down its
/// worker, never the loop.
fn spawn_worker(job: &Arc<dyn Job>) {
    let job = Arc::clone(job);
    thread::spawn(move || job.run());
}
