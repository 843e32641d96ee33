//! Integration tests for Profile-Harvest
//!
//! These drive the full coordinator against scripted pages and write the
//! results through the real sinks.

mod harvest_tests;
