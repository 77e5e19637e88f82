use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;

use crate::error::CaptureError;

#[derive(Debug)]
struct GateState {
    size: [u32; 2],
    layout_pending: bool,
    detached: bool,
    layout_waiters: Vec<oneshot::Sender<()>>,
    detach_waiters: Vec<oneshot::Sender<()>>,
}

/// Tracks whether the surface has a settled size that can be captured.
///
/// The surface calls [`LayoutGate::begin_layout`] when its size is about to
/// change and [`LayoutGate::complete_layout`] once it has been measured. A gate
/// starts out pending, since a surface that was never measured has nothing to
/// capture. Clones share the same state.
#[derive(Debug, Clone)]
pub struct LayoutGate {
    state: Arc<Mutex<GateState>>,
}

impl Default for LayoutGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutGate {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState {
                size: [0, 0],
                layout_pending: true,
                detached: false,
                layout_waiters: Vec::new(),
                detach_waiters: Vec::new(),
            })),
        }
    }

    /// Mark a layout pass as pending; captures wait until it completes
    pub fn begin_layout(&self) {
        self.state.lock().layout_pending = true;
    }

    /// Record the measured size in pixels and release waiting captures
    pub fn complete_layout(&self, size: [u32; 2]) {
        let waiters = {
            let mut state = self.state.lock();
            state.size = size;
            state.layout_pending = false;
            std::mem::take(&mut state.layout_waiters)
        };
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    /// The surface is gone for good
    pub fn detach(&self) {
        let waiters = {
            let mut state = self.state.lock();
            state.detached = true;
            let mut waiters = std::mem::take(&mut state.layout_waiters);
            waiters.append(&mut state.detach_waiters);
            waiters
        };
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    pub fn is_detached(&self) -> bool {
        self.state.lock().detached
    }

    pub fn is_layout_pending(&self) -> bool {
        self.state.lock().layout_pending
    }

    /// Last measured size in pixels
    pub fn size(&self) -> [u32; 2] {
        self.state.lock().size
    }

    /// Wait until no layout pass is pending and return the measured size
    pub async fn ready(&self) -> Result<[u32; 2], CaptureError> {
        loop {
            let receiver = {
                let mut state = self.state.lock();
                if state.detached {
                    return Err(CaptureError::Detached);
                }
                if !state.layout_pending {
                    return Ok(state.size);
                }
                let (sender, receiver) = oneshot::channel();
                state.layout_waiters.push(sender);
                receiver
            };
            // Either outcome means the state changed; re-check it
            let _ = receiver.await;
        }
    }

    /// Resolves once the surface has been detached
    pub async fn detached(&self) {
        loop {
            let receiver = {
                let mut state = self.state.lock();
                if state.detached {
                    return;
                }
                state.detach_waiters.retain(|waiter| !waiter.is_canceled());
                let (sender, receiver) = oneshot::channel();
                state.detach_waiters.push(sender);
                receiver
            };
            let _ = receiver.await;
        }
    }
}
