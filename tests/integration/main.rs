//! Integration tests

mod common;
mod config_test;
mod supervisor_test;
