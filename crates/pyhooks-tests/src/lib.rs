//! pyhooks End-to-End Test Infrastructure
//!
//! Runs the sample backends under `samples/buildsys_pkgs` against the sample
//! projects under `samples/` through a real Python interpreter.
//!
//! ## Running Tests
//!
//! ```bash
//! # Tests skip themselves when no interpreter is found
//! cargo test -p pyhooks-tests
//!
//! # Pick the interpreter explicitly
//! PYHOOKS_PYTHON=/usr/bin/python3.12 cargo test -p pyhooks-tests
//! ```

pub mod harness;
