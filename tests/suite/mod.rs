mod bridge_protocol;
mod cli;
mod failures;
#[cfg(unix)]
mod launcher;
mod runner;
