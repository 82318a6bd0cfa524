mod args;
mod chat;
mod models;

pub use args::{ChatArgs, Cli, Command};
