//! Relay core library: the Bot Framework messaging gateway, the turn logic that forwards
//! messages to a Langflow flow, and the Graph identity lookup used by the CLI.

pub mod activity;
pub mod auth;
pub mod bot;
pub mod cards;
pub mod channels;
pub mod config;
pub mod directory;
pub mod error;
pub mod extract;
pub mod flow;
pub mod gateway;
pub mod http;
pub mod init;
pub mod state;
pub mod trigger;

#[cfg(test)]
mod test_support;
