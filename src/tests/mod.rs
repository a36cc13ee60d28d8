//! # Scheduler Test Suite
//!
//! End-to-end scenarios for the sampling scheduler, run against scripted
//! collaborators with short cadences so each test finishes in well under a
//! second.
