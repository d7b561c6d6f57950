//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the remote listing API and run
//! full harvests end-to-end against temporary input, dataset and checkpoint
//! files.

mod common;
mod config_tests;
mod explore_tests;
mod venue_tests;
