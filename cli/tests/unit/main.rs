//! Unit tests for the solo CLI
//!
//! These tests use scripted port implementations and run fast without
//! external I/O beyond temp directories.

mod deployment_delete;
