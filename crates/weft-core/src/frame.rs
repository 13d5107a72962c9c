//! Animation-frame coalescing.
//!
//! Scroll handlers, navigation listeners and similar fire-hose triggers call
//! [`FrameScheduler::request`]; however many requests arrive before the next
//! frame, the task runs once.

use crate::error::PlatformResult;
use crate::platform::Platform;
use std::cell::Cell;
use std::rc::Rc;

/// Runs a task at most once per animation frame.
#[derive(Clone)]
pub struct FrameScheduler {
	platform: Rc<dyn Platform>,
	task: Rc<dyn Fn()>,
	pending: Rc<Cell<bool>>,
}

impl std::fmt::Debug for FrameScheduler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FrameScheduler")
			.field("pending", &self.pending.get())
			.finish()
	}
}

impl FrameScheduler {
	/// Creates a scheduler for `task`.
	pub fn new(platform: Rc<dyn Platform>, task: impl Fn() + 'static) -> Self {
		Self {
			platform,
			task: Rc::new(task),
			pending: Rc::new(Cell::new(false)),
		}
	}

	/// Requests a run on the next frame.
	///
	/// Returns `Ok(true)` when a frame was scheduled and `Ok(false)` when the
	/// request was folded into an already pending one.
	pub fn request(&self) -> PlatformResult<bool> {
		if self.pending.replace(true) {
			return Ok(false);
		}

		let task = self.task.clone();
		let pending = self.pending.clone();
		let scheduled = self.platform.request_animation_frame(Box::new(move || {
			// Cleared first so the task itself may request the next frame.
			pending.set(false);
			task();
		}));

		if let Err(err) = scheduled {
			self.pending.set(false);
			tracing::warn!(error = %err, "animation frame request failed");
			return Err(err);
		}
		Ok(true)
	}

	/// Whether a run is scheduled and has not happened yet.
	pub fn is_pending(&self) -> bool {
		self.pending.get()
	}
}
