//! File logging example
//!
//! Demonstrates a logger built from `LoggerProps` writing to the console and
//! to a size-rotated file.
//!
//! Run with: cargo run --example file_logging

use blogger::prelude::*;

fn main() -> Result<()> {
    println!("=== blogger - File Logging Example ===\n");

    let props = LoggerProps {
        tag: "files".to_string(),
        colored: false,
        file_logger: true,
        path: "logs/application.log".to_string(),
        bytes_per_file: Some(1024),
        log_files: 3,
        ..LoggerProps::default()
    };
    // from_props never fails; validate says up front what it would drop
    props.validate()?;
    let logger = Logger::from_props(&props);
    println!("Sinks: {:?}\n", logger.sink_names());

    println!("1. Logging to both console and file:");
    logger.info("Application started", &[]);
    logger.debug("Loading configuration...", &[]);
    logger.warn("Using default settings for some options", &[]);
    logger.error("Failed to load optional plugin", &[]);

    println!("\n2. Filling the file past its limit:");
    for i in 1..=60 {
        logger.info("Processing item {}/60", &[&i]);
    }

    logger.flush()?;
    println!("\n=== Example completed successfully! ===");
    println!("Check logs/application.log and its rotated copies (.1, .2)");

    Ok(())
}
