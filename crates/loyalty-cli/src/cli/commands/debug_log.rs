//! Debug log command handlers.

use anyhow::Result;

use crate::cli::AppContext;

pub fn show(ctx: &AppContext, limit: Option<usize>) -> Result<()> {
    let entries = ctx.debug_log.entries();
    if entries.is_empty() {
        println!("No debug log entries.");
        return Ok(());
    }

    let skip = limit.map_or(0, |n| entries.len().saturating_sub(n));
    for entry in entries.iter().skip(skip) {
        let timestamp = entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ");
        match &entry.data {
            Some(data) => println!("{timestamp} {} {data}", entry.message),
            None => println!("{timestamp} {}", entry.message),
        }
    }
    Ok(())
}

pub fn clear(ctx: &mut AppContext) -> Result<()> {
    ctx.debug_log.clear();
    println!("✓ Debug log cleared");
    Ok(())
}
