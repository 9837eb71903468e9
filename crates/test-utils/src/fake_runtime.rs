use std::sync::{Arc, Mutex};

use hotserve::errors::{HotserveError, Result};
use hotserve::runtime::RuntimeControl;

/// A call made on [`FakeRuntime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeCall {
    Open,
    Signal,
    Kill,
}

/// A fake runtime process that:
/// - records every open / signal / kill
/// - can be told to fail `open` (as if the executable were missing).
///
/// Clones share their state, so a test keeps one clone and hands the other
/// to the serve loop.
#[derive(Debug, Clone, Default)]
pub struct FakeRuntime {
    calls: Arc<Mutex<Vec<RuntimeCall>>>,
    fail_open: Arc<Mutex<bool>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_open(&self, fail: bool) {
        *self.fail_open.lock().unwrap() = fail;
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than the final teardown kill.
    pub fn reloads(&self) -> Vec<RuntimeCall> {
        self.calls()
            .into_iter()
            .filter(|c| *c != RuntimeCall::Kill)
            .collect()
    }
}

impl RuntimeControl for FakeRuntime {
    fn open(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(RuntimeCall::Open);
        if *self.fail_open.lock().unwrap() {
            return Err(HotserveError::RuntimeNotFound("fake-runtime".to_string()));
        }
        Ok(())
    }

    fn signal(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(RuntimeCall::Signal);
        Ok(())
    }

    fn kill(&mut self) {
        self.calls.lock().unwrap().push(RuntimeCall::Kill);
    }
}
