//! Command implementations

pub mod run;

use crate::transports;

/// List transports compiled into this binary
pub fn list_transports() {
    let transports = transports::available_transports();
    if transports.is_empty() {
        println!("No transports available (recompile with transport features enabled)");
        return;
    }

    println!("Available transports:");
    println!();
    for t in &transports {
        if t.aliases.is_empty() {
            println!("  {:10} - {}", t.name, t.description);
        } else {
            println!(
                "  {:10} - {} (aliases: {})",
                t.name,
                t.description,
                t.aliases.join(", ")
            );
        }
    }
}
