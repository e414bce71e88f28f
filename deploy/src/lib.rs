pub mod command_line;
pub mod commands;
pub mod config;
pub mod pty;
pub mod runner;
