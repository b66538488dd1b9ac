// src/rate_limit/tests/mod.rs
