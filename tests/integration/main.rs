//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the full control loop
//! against the mock adapters in `mock_hw`.  All tests run on the host
//! with no real hardware required.

mod decision_tests;
mod mock_hw;
mod scheduler_tests;
