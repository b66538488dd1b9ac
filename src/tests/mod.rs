// src/tests/mod.rs
//! Cross-module tests: dispatcher, aggregator and the assembled engine

mod aggregator_tests;
