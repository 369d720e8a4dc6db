//! workshop-enroll - Workshop enrollment CLI
//!
//! Registers participants for capped workshop sessions with a quota
//! category, a regular category and a waiting list.
//!
//! ## Quick Start
//!
//! ```bash
//! # Register for the first session
//! workshop-enroll enroll "Ada Lovelace"
//!
//! # Register in the quota category, attending remotely
//! workshop-enroll enroll "Grace Hopper" --quota --mode remote
//!
//! # Show who is enrolled and queued
//! workshop-enroll status
//!
//! # Seat counts for every session
//! workshop-enroll stats --json
//! ```

mod commands;

fn main() {
    if let Err(err) = commands::run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
