//! Scheduler behavior under real time.
//!
//! These tests drive a live scheduler with `@every 1s` entries and short
//! sleeps, so each assertion leaves generous slack around the firing
//! instants it expects.

use cronheap::{Cron, EntryOpts, Logger, ParseOptions, SpecParser};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Run the scheduler on a background thread and give the loop a moment to
/// come up before the test starts mutating it.
fn start(cron: &Arc<Cron>) -> thread::JoinHandle<()> {
    let runner = Arc::clone(cron);
    let handle = thread::spawn(move || runner.run());
    thread::sleep(Duration::from_millis(100));
    handle
}

/// A counter job plus its shared tally.
fn counter() -> (Arc<AtomicU32>, impl Fn() + Send + Sync + 'static) {
    let fired = Arc::new(AtomicU32::new(0));
    let tally = Arc::clone(&fired);
    (fired, move || {
        tally.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn unparsable_spec_is_rejected_with_zero_id() {
    let cron = Cron::new();
    assert_eq!(cron.add_fn("not a spec", || {}, EntryOpts::new()), 0);
    assert_eq!(cron.add_fn("61 * * * *", || {}, EntryOpts::new()), 0);
}

#[test]
fn ids_are_issued_from_one() {
    let cron = Cron::new();
    assert_eq!(cron.add_fn("* * * * *", || {}, EntryOpts::new()), 1);
    assert_eq!(cron.add_fn("@hourly", || {}, EntryOpts::new()), 2);
    // A failed add burns no id.
    assert_eq!(cron.add_fn("bad", || {}, EntryOpts::new()), 0);
    assert_eq!(cron.add_fn("@daily", || {}, EntryOpts::new()), 3);
}

#[test]
fn second_run_is_a_noop() {
    let cron = Arc::new(Cron::new());
    let first = start(&cron);
    // Whichever of these becomes the runner, the other returns at once;
    // one stop must unwind both.
    let second = {
        let runner = Arc::clone(&cron);
        thread::spawn(move || runner.run())
    };
    thread::sleep(Duration::from_millis(200));
    cron.stop();
    first.join().unwrap();
    second.join().unwrap();
}

#[test]
fn removed_entry_never_fires() {
    let cron = Arc::new(Cron::new());
    let (fired, job) = counter();
    let id = cron.add_fn("@every 1s", job, EntryOpts::new());
    assert!(id > 0);
    cron.remove(id);

    let handle = start(&cron);
    thread::sleep(Duration::from_millis(2500));
    cron.stop();
    handle.join().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn remove_while_running() {
    let cron = Arc::new(Cron::new());
    let (fired, job) = counter();
    let id = cron.add_fn("@every 1s", job, EntryOpts::new());

    let handle = start(&cron);
    thread::sleep(Duration::from_millis(1500));
    cron.remove(id);
    let seen = fired.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(2000));
    cron.stop();
    handle.join().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), seen);
}

#[test]
fn max_execute_times_caps_firings() {
    let cron = Arc::new(Cron::new());
    let (fired, job) = counter();
    cron.add_fn("@every 1s", job, EntryOpts::new().max_execute_times(2));

    let handle = start(&cron);
    thread::sleep(Duration::from_millis(4500));
    cron.stop();
    handle.join().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn run_first_fires_immediately() {
    let cron = Arc::new(Cron::new());
    let (fired, job) = counter();
    // The schedule itself is a year away; only run_first can fire it.
    cron.add_fn("0 0 1 1 *", job, EntryOpts::new().run_first());

    let begun = Instant::now();
    let handle = start(&cron);
    while fired.load(Ordering::SeqCst) == 0 && begun.elapsed() < Duration::from_secs(1) {
        thread::sleep(Duration::from_millis(5));
    }
    let latency = begun.elapsed();
    cron.stop();
    handle.join().unwrap();

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(latency < Duration::from_secs(1), "took {latency:?}");
}

#[test]
fn run_first_counts_toward_the_cap() {
    let cron = Arc::new(Cron::new());
    let (fired, job) = counter();
    cron.add_fn(
        "@every 1s",
        job,
        EntryOpts::new().max_execute_times(1).run_first(),
    );

    let handle = start(&cron);
    thread::sleep(Duration::from_millis(2500));
    cron.stop();
    handle.join().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn add_while_running() {
    let cron = Arc::new(Cron::new());
    let handle = start(&cron);

    let (fired, job) = counter();
    let id = cron.add_fn("@every 1s", job, EntryOpts::new());
    assert!(id > 0);
    thread::sleep(Duration::from_millis(2500));
    cron.stop();
    handle.join().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn stop_preserves_entries_release_clears_them() {
    let cron = Arc::new(Cron::new());
    let (fired, job) = counter();
    cron.add_fn("@every 1s", job, EntryOpts::new());

    let handle = start(&cron);
    thread::sleep(Duration::from_millis(1500));
    cron.stop();
    handle.join().unwrap();
    let after_first = fired.load(Ordering::SeqCst);
    assert!(after_first >= 1);

    // The entry survived the stop and keeps firing on the next run.
    let handle = start(&cron);
    thread::sleep(Duration::from_millis(1500));
    cron.stop();
    handle.join().unwrap();
    let after_second = fired.load(Ordering::SeqCst);
    assert!(after_second > after_first);

    // Release drops it; a further run fires nothing.
    cron.release();
    let handle = start(&cron);
    thread::sleep(Duration::from_millis(1500));
    cron.stop();
    handle.join().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), after_second);
}

#[test]
fn release_while_running_clears_entries() {
    let cron = Arc::new(Cron::new());
    let (fired, job) = counter();
    cron.add_fn("@every 1s", job, EntryOpts::new());

    let handle = start(&cron);
    cron.release();
    handle.join().unwrap();

    let handle = start(&cron);
    thread::sleep(Duration::from_millis(1500));
    cron.stop();
    handle.join().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn never_firing_entry_parks_the_loop() {
    // February 30th can never match; the entry sorts last with no next
    // instant and the loop just sleeps until told otherwise.
    let cron = Arc::new(Cron::new().with_parser(SpecParser::new(ParseOptions::ALL)));
    let (fired, job) = counter();
    let id = cron.add_fn("0 0 0 30 2 *", job, EntryOpts::new());
    assert!(id > 0);

    let handle = start(&cron);
    thread::sleep(Duration::from_millis(300));
    cron.stop();
    handle.join().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn parse_failures_are_logged() {
    #[derive(Clone, Default)]
    struct CaptureLogger {
        errors: Arc<Mutex<Vec<String>>>,
    }

    impl Logger for CaptureLogger {
        fn error(&self, args: fmt::Arguments) {
            self.errors.lock().unwrap().push(args.to_string());
        }
        fn info(&self, _: fmt::Arguments) {}
        fn debug(&self, _: fmt::Arguments) {}
    }

    let logger = CaptureLogger::default();
    let cron = Cron::new().with_logger(logger.clone());
    assert_eq!(cron.add_fn("every minute or so", || {}, EntryOpts::new()), 0);

    let errors = logger.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("add job failure"), "{}", errors[0]);
}

#[test]
fn panicking_job_does_not_kill_the_loop() {
    let cron = Arc::new(Cron::new());
    let (fired, job) = counter();
    cron.add_fn("@every 1s", || panic!("job blew up"), EntryOpts::new());
    cron.add_fn("@every 1s", job, EntryOpts::new());

    let handle = start(&cron);
    thread::sleep(Duration::from_millis(2500));
    cron.stop();
    handle.join().unwrap();
    // The healthy job kept firing alongside the panicking one.
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}
