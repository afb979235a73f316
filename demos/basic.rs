// A few schedules running against the real clock.

use cronheap::{Cron, EntryOpts};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn tick() {
    println!("tick at {}", chrono::Local::now().to_rfc2822());
}

fn main() {
    pretty_env_logger::init();

    let cron = Arc::new(Cron::new());

    cron.add_fn("@every 2s", tick, EntryOpts::new());

    cron.add_fn(
        "@every 3s",
        || println!("three seconds, at most twice"),
        EntryOpts::new().max_execute_times(2),
    );

    cron.add_fn(
        "30 8 * * *",
        || println!("time for breakfast"),
        EntryOpts::new().run_first(),
    );

    let runner = Arc::clone(&cron);
    let handle = thread::spawn(move || runner.run());

    thread::sleep(Duration::from_secs(10));
    cron.stop();
    handle.join().unwrap();
}
