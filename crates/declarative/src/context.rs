//! Progress and confirmation callbacks
//!
//! These traits keep the host free of any particular UI: a caller can print,
//! log, or record what the host does.

use crate::types::{ApplyResult, Change, Hook};

/// Progress callback for reconciliation passes
pub trait ProgressCallback {
    /// Called once the change for an instance is planned
    fn on_planned(&mut self, address: &str, change: Change);

    /// Called before a hook runs
    fn on_hook_start(&mut self, address: &str, hook: Hook);

    /// Called when a pass completes
    fn on_complete(&mut self, address: &str, result: &ApplyResult);
}

/// Confirmation callback for destructive changes
pub trait ConfirmCallback {
    /// Ask whether to proceed
    ///
    /// # Returns
    /// `true` to proceed, `false` to skip the change
    fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_planned(&mut self, _address: &str, _change: Change) {}
    fn on_hook_start(&mut self, _address: &str, _hook: Hook) {}
    fn on_complete(&mut self, _address: &str, _result: &ApplyResult) {}
}

/// Progress callback that reports through the `log` facade
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_planned(&mut self, address: &str, change: Change) {
        log::debug!("{address}: planned {change}");
    }

    fn on_hook_start(&mut self, address: &str, hook: Hook) {
        log::debug!("{address}: running {hook}");
    }

    fn on_complete(&mut self, address: &str, result: &ApplyResult) {
        if result.is_change() {
            log::info!("{address}: {result:?}");
        } else {
            log::debug!("{address}: {result:?}");
        }
    }
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}
