//! Validation-scoped submission helpers.

use anyhow::{Result as AnyResult, anyhow};
use log::error;
use pollster::block_on;
use wgpu::{CommandBuffer, Device, ErrorFilter, Queue};

/// Submit command buffers under a validation error scope, mapping any
/// captured error into anyhow with context.
///
/// # Errors
/// Returns an error if WGPU validation fails during submission.
pub fn submit_with_validation<I>(device: &Device, queue: &Queue, submissions: I) -> AnyResult<()>
where
    I: IntoIterator<Item = CommandBuffer>,
{
    device.push_error_scope(ErrorFilter::Validation);
    queue.submit(submissions);
    if let Some(err) = block_on(device.pop_error_scope()) {
        error!(target: "wgpu_rhi", "WGPU error on submit: {err:?}");
        return Err(anyhow!("wgpu validation error on submit: {err:?}"));
    }
    Ok(())
}

/// Run a closure while a validation error scope is active.
///
/// Used around shader module and pipeline creation so compile/link failures
/// surface as errors carrying the driver log instead of an uncaptured panic.
///
/// # Errors
/// Returns an error if WGPU validation fails inside the scope.
pub fn with_validation_scope<F, T>(device: &Device, label: &str, f: F) -> AnyResult<T>
where
    F: FnOnce() -> T,
{
    device.push_error_scope(ErrorFilter::Validation);
    let out = f();
    if let Some(err) = block_on(device.pop_error_scope()) {
        error!(target: "wgpu_rhi", "WGPU error in scope '{label}': {err:?}");
        return Err(anyhow!("wgpu validation error in {label}: {err:?}"));
    }
    Ok(out)
}
