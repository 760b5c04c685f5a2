//! Tick scheduling capability.
//!
//! The controller never drives its own loop. It asks an injected [`Scheduler`]
//! for the next frame callback and the host calls
//! [`GraphController::on_frame`](super::GraphController::on_frame) when that
//! callback fires. Requests made before the callback fires coalesce into one.
//!
//! - [`ManualScheduler`] records requests; tests and headless hosts pump frames
//!   themselves.
//! - `AnimationFrameScheduler` (feature `web`) drives frames from
//!   `window.requestAnimationFrame`.

/// Schedules at most one pending frame callback.
pub trait Scheduler {
	/// Request a frame callback. No-op if one is already pending.
	fn schedule(&mut self);

	/// Drop the pending callback, if any. No further frames fire until the
	/// next [`Scheduler::schedule`].
	fn cancel(&mut self);

	/// Mark the pending callback as delivered. Called at the start of every frame.
	fn acknowledge(&mut self);

	/// Whether a callback is pending.
	fn is_pending(&self) -> bool;
}

/// A scheduler that only records requests.
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
	pending: bool,
	requests: usize,
}

impl ManualScheduler {
	/// A scheduler with nothing pending.
	pub fn new() -> Self {
		Self::default()
	}

	/// How many distinct callbacks have been requested so far.
	pub fn requests(&self) -> usize {
		self.requests
	}
}

impl Scheduler for ManualScheduler {
	fn schedule(&mut self) {
		if !self.pending {
			self.pending = true;
			self.requests += 1;
		}
	}

	fn cancel(&mut self) {
		self.pending = false;
	}

	fn acknowledge(&mut self) {
		self.pending = false;
	}

	fn is_pending(&self) -> bool {
		self.pending
	}
}

#[cfg(feature = "web")]
pub use web::AnimationFrameScheduler;

#[cfg(feature = "web")]
mod web {
	use std::cell::{Cell, RefCell};
	use std::rc::Rc;

	use log::warn;
	use wasm_bindgen::prelude::*;

	use super::Scheduler;

	/// Drives frames from `window.requestAnimationFrame`.
	///
	/// The frame closure is bound after construction because it usually needs a
	/// handle to the controller that owns this scheduler:
	///
	/// ```ignore
	/// let controller = Rc::new(RefCell::new(GraphController::new(data, None, AnimationFrameScheduler::new())?));
	/// let weak = Rc::downgrade(&controller);
	/// controller.borrow().scheduler().bind(move || {
	///     if let Some(c) = weak.upgrade() {
	///         c.borrow_mut().on_frame();
	///     }
	/// });
	/// ```
	#[derive(Default)]
	pub struct AnimationFrameScheduler {
		callback: RefCell<Option<Closure<dyn FnMut()>>>,
		handle: Rc<Cell<Option<i32>>>,
		wanted: Cell<bool>,
	}

	impl AnimationFrameScheduler {
		/// A scheduler with no frame closure bound yet.
		pub fn new() -> Self {
			Self::default()
		}

		/// Install the frame closure. A frame requested before binding fires now.
		pub fn bind(&self, mut on_frame: impl FnMut() + 'static) {
			let handle = self.handle.clone();
			*self.callback.borrow_mut() = Some(Closure::new(move || {
				handle.set(None);
				on_frame();
			}));
			if self.wanted.replace(false) {
				self.request();
			}
		}

		fn request(&self) {
			if self.handle.get().is_some() {
				return;
			}
			let callback = self.callback.borrow();
			let Some(cb) = callback.as_ref() else {
				self.wanted.set(true);
				return;
			};
			let Some(window) = web_sys::window() else {
				warn!("force-graph-engine: no window, frame not scheduled");
				return;
			};
			match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
				Ok(id) => self.handle.set(Some(id)),
				Err(e) => warn!("force-graph-engine: requestAnimationFrame failed: {:?}", e),
			}
		}
	}

	impl Scheduler for AnimationFrameScheduler {
		fn schedule(&mut self) {
			self.request();
		}

		fn cancel(&mut self) {
			self.wanted.set(false);
			if let Some(id) = self.handle.take() {
				if let Some(window) = web_sys::window() {
					let _ = window.cancel_animation_frame(id);
				}
			}
		}

		fn acknowledge(&mut self) {
			self.handle.set(None);
		}

		fn is_pending(&self) -> bool {
			self.handle.get().is_some() || self.wanted.get()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_requests_coalesce_until_acknowledged() {
		let mut scheduler = ManualScheduler::new();
		scheduler.schedule();
		scheduler.schedule();
		assert!(scheduler.is_pending());
		assert_eq!(scheduler.requests(), 1);

		scheduler.acknowledge();
		scheduler.schedule();
		assert_eq!(scheduler.requests(), 2);

		scheduler.cancel();
		assert!(!scheduler.is_pending());
	}
}
