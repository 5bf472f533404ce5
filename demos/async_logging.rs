//! Async logging example
//!
//! Demonstrates async loggers sharing the worker pool across threads.
//!
//! Run with: cargo run --example async_logging

use blogger::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== blogger - Async Logging Example ===\n");

    let logger = Arc::new(
        Logger::builder()
            .tag("async")
            .async_mode(1000)
            .sink(ColoredConsoleSink::new())
            .build(),
    );

    println!("1. High-throughput async logging:");
    for i in 0..100 {
        logger.info("Message #{}", &[&i]);
    }
    logger.flush()?;
    println!("   Logged 100 messages asynchronously");

    println!("\n2. Multi-threaded logging:");
    let handles: Vec<_> = (0..5)
        .map(|thread_id| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..20 {
                    logger.info("Thread {} - Message {}", &[&thread_id, &i]);
                    thread::sleep(Duration::from_millis(10));
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            eprintln!("a logging thread panicked");
        }
    }

    println!("\n3. Metrics:");
    logger.flush()?;
    let metrics = logger.metrics();
    println!("   Dispatched: {}", metrics.dispatched());
    println!("   Blocked submissions: {}", metrics.blocked_submissions());

    if !logger.shutdown(Duration::from_secs(5)) {
        eprintln!("Warning: logger did not drain in time");
    }
    WorkerPool::shutdown_global();

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
