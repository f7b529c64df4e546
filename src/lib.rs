//! Media control server: index media folders, list them over a one-shot TCP
//! protocol, and supervise a single player process.

pub mod cli;
pub mod config;
pub mod media;
pub mod playback;
pub mod protocol;
pub mod server;
