//! medaudit CLI - Medication Data-Quality Auditor
//!
//! Thin entry point; the command surface lives in [`medaudit::cli`].

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::process::ExitCode;

fn main() -> ExitCode {
    medaudit::cli::run()
}
