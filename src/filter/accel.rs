//! Process-wide hardware acceleration context for the filter engine.
//!
//! The context wraps a compute-capable GPU device. Creating one is
//! expensive, so the lifecycle is load-once/unload-once: the first
//! [`acquire`] creates it, later acquires hand out clones of the live
//! context, and [`release`] tears it down exactly once at process
//! shutdown. A machine without a usable adapter yields `None` and the
//! engine falls back to its CPU path.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static CONTEXT: Mutex<Option<Arc<AccelContext>>> = Mutex::new(None);
static INIT_ATTEMPTED: AtomicBool = AtomicBool::new(false);

/// Handle to the process-wide compute device.
pub struct AccelContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
}

impl AccelContext {
    /// Compute device for engine dispatches.
    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Submission queue paired with [`device`](Self::device).
    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Name of the adapter backing this context.
    #[inline]
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    fn create() -> Option<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        }));
        let adapter = match adapter {
            Ok(adapter) => adapter,
            Err(e) => {
                tracing::warn!("no adapter for acceleration context: {e}");
                return None;
            }
        };
        let adapter_name = adapter.get_info().name;
        match pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())) {
            Ok((device, queue)) => {
                tracing::info!("acceleration context initialized on {adapter_name}");
                Some(Self {
                    device,
                    queue,
                    adapter_name,
                })
            }
            Err(e) => {
                tracing::warn!("device request failed on {adapter_name}: {e}");
                None
            }
        }
    }
}

/// Get the process-wide acceleration context, creating it on first use.
///
/// Initialization happens at most once per process; if it fails (or the
/// context was already released) this returns `None` without retrying.
pub fn acquire() -> Option<Arc<AccelContext>> {
    let mut slot = CONTEXT.lock();
    if let Some(ctx) = slot.as_ref() {
        return Some(Arc::clone(ctx));
    }
    if INIT_ATTEMPTED.swap(true, Ordering::SeqCst) {
        return None;
    }
    let ctx = AccelContext::create().map(Arc::new);
    *slot = ctx.clone();
    ctx
}

/// Tear down the process-wide context. Safe to call repeatedly; only
/// the first call after initialization drops the shared reference
/// (outstanding clones keep the device alive until they are dropped).
pub fn release() {
    let mut slot = CONTEXT.lock();
    if slot.take().is_some() {
        tracing::info!("acceleration context released");
    }
}
