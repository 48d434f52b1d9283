// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! atkins-exec: the process-execution adapter. No knowledge of pipelines,
//! jobs, or steps lives here — this crate runs one `Command` at a time and
//! reports back an `ExecResult`.

mod command;
mod error;
mod executor;
mod os;
mod process;
mod pty;
mod result;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(test)]
#[path = "fake_tests.rs"]
mod fake_tests;

pub use command::{Command, ExecutorDefaults, LineSink, OutputSink, StdinSource};
pub use error::ExecutorError;
pub use executor::ProcessExecutor;
pub use os::OsProcessExecutor;
pub use process::{Process, Signal};
pub use result::ExecResult;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProcessExecutor, RecordedCall};

#[cfg(test)]
#[path = "os_tests.rs"]
mod os_tests;
