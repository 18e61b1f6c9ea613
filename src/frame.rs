use crate::adapter::RendererAdapter;
use crate::error::CaptureResult;

/// Forces a redraw of the current viewport and suspends at `waits`
/// successive frame boundaries before the frame is considered settled.
/// Readiness is purely time-based; judging the pixels is the validator's
/// job.
pub fn settle<A: RendererAdapter>(adapter: &mut A, waits: u32) -> CaptureResult<()> {
    adapter.force_redraw()?;
    for _ in 0..waits {
        adapter.wait_next_frame()?;
    }
    tracing::trace!(waits, "frame settled");
    Ok(())
}

/// Wait ceiling for a given attempt: starts at the configured budget and
/// decreases by one per retry, so a tile that has already failed is judged
/// sooner rather than later. Floored at 1 — a zero-wait settle would sample
/// the very frame that was already judged corrupt.
pub fn waits_for_attempt(frame_wait_budget: u32, attempt: u32) -> u32 {
    frame_wait_budget.saturating_sub(attempt).max(1)
}
