//! Basic logger usage example
//!
//! Demonstrates a blocking console logger, level filtering and patterns.
//!
//! Run with: cargo run --example basic_usage

use blogger::prelude::*;
use blogger::{info, warn};

fn main() -> Result<()> {
    println!("=== blogger - Basic Usage Example ===\n");

    // Blocking logger writing colored output to stdout
    let logger = Logger::blocking_console("basic", Level::Trace, true);

    println!("1. Logging at different levels:");
    logger.trace("This is a trace message", &[]);
    logger.debug("This is a debug message", &[]);
    logger.info("This is an info message", &[]);
    logger.warn("This is a warning message", &[]);
    logger.error("This is an error message", &[]);
    logger.crit("This is a critical message", &[]);

    println!("\n2. Placeholders and macros:");
    logger.info("[{}] value={}", &[&"x", &42]);
    info!(logger, "{} + {} = {}", 2, 2, 4);

    println!("\n3. Raising the filter to WARNING:");
    logger.set_filter(Level::Warn);
    logger.info("Info message (hidden)", &[]);
    warn!(logger, "Warning message (visible)");

    println!("\n4. Custom pattern:");
    logger.set_filter(Level::Trace);
    logger.set_pattern("{lvl} {tag} :: {msg}");
    logger.info("Pattern switched", &[]);

    println!("\n5. Long messages are cut to the buffer size:");
    let long = "lorem ipsum ".repeat(20);
    logger.info("{}", &[&long]);

    logger.flush()?;
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
