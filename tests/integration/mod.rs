//! Integration tests for the cli-bridge console and worker hand-off

mod config_integration;
mod console_adapter;
mod console_loop;
mod properties;
mod test_utils;
