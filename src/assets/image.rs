use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::assets::decode::{ImageData, decode_image};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Loading state of an [`ImageResource`].
#[derive(Clone, Debug)]
pub enum ImageState {
    /// Still loading; drawing must wait.
    Pending,
    /// Decoded and ready to blit.
    Ready(ImageData),
    /// Loading finished with an error. Counts as settled for drawing purposes.
    Failed(String),
}

type Waiter = Box<dyn FnOnce()>;

struct ResourceInner {
    id: u64,
    label: String,
    state: RefCell<ImageState>,
    waiters: RefCell<Vec<Waiter>>,
}

/// Shared handle to an image that may still be loading.
///
/// This is the readiness boundary between the host's asset loader and the layers that draw the
/// image. The host settles a resource exactly once with [`ImageResource::resolve`] or
/// [`ImageResource::fail`]; every waiter registered through [`ImageResource::on_settled`] runs once,
/// in registration order, whichever way it settled.
///
/// Handles are cheap to clone and single-threaded.
#[derive(Clone)]
pub struct ImageResource {
    inner: Rc<ResourceInner>,
}

impl ImageResource {
    fn with_state(label: impl Into<String>, state: ImageState) -> Self {
        Self {
            inner: Rc::new(ResourceInner {
                id: NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed),
                label: label.into(),
                state: RefCell::new(state),
                waiters: RefCell::new(Vec::new()),
            }),
        }
    }

    /// A resource whose bytes have not arrived yet.
    pub fn pending(label: impl Into<String>) -> Self {
        Self::with_state(label, ImageState::Pending)
    }

    /// A resource that is already decoded.
    pub fn ready(label: impl Into<String>, data: ImageData) -> Self {
        Self::with_state(label, ImageState::Ready(data))
    }

    /// Process-unique resource id.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Human-readable label (usually the asset key or path).
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ImageState {
        self.inner.state.borrow().clone()
    }

    /// `true` when decoded pixels are available.
    pub fn is_ready(&self) -> bool {
        matches!(*self.inner.state.borrow(), ImageState::Ready(_))
    }

    /// `true` once loading finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        !matches!(*self.inner.state.borrow(), ImageState::Pending)
    }

    /// Decoded pixels, if ready.
    pub fn data(&self) -> Option<ImageData> {
        match &*self.inner.state.borrow() {
            ImageState::Ready(d) => Some(d.clone()),
            ImageState::Pending | ImageState::Failed(_) => None,
        }
    }

    /// Intrinsic pixel size, if ready.
    pub fn natural_size(&self) -> Option<(u32, u32)> {
        match &*self.inner.state.borrow() {
            ImageState::Ready(d) => Some((d.width, d.height)),
            ImageState::Pending | ImageState::Failed(_) => None,
        }
    }

    /// Number of waiters registered and not yet fired.
    pub fn waiter_count(&self) -> usize {
        self.inner.waiters.borrow().len()
    }

    /// Register a one-shot callback for "became ready or failed".
    ///
    /// Runs immediately when the resource is already settled.
    pub fn on_settled(&self, f: impl FnOnce() + 'static) {
        if self.is_settled() {
            f();
            return;
        }
        self.inner.waiters.borrow_mut().push(Box::new(f));
    }

    /// Settle with decoded pixels and wake every waiter.
    pub fn resolve(&self, data: ImageData) {
        self.settle(ImageState::Ready(data));
    }

    /// Settle with an error and wake every waiter.
    pub fn fail(&self, reason: impl Into<String>) {
        self.settle(ImageState::Failed(reason.into()));
    }

    /// Decode encoded bytes and settle accordingly. Decode errors settle as failed.
    pub fn load_bytes(&self, bytes: &[u8]) {
        match decode_image(bytes) {
            Ok(data) => self.resolve(data),
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn settle(&self, next: ImageState) {
        {
            let mut state = self.inner.state.borrow_mut();
            if !matches!(*state, ImageState::Pending) {
                tracing::warn!(
                    resource = self.inner.id,
                    label = %self.inner.label,
                    "image resource settled twice; keeping first outcome"
                );
                return;
            }
            if let ImageState::Failed(reason) = &next {
                tracing::warn!(
                    resource = self.inner.id,
                    label = %self.inner.label,
                    %reason,
                    "image resource failed to load"
                );
            }
            *state = next;
        }

        // Waiters may register new waiters on other resources or draw; never hold a borrow here.
        let waiters = std::mem::take(&mut *self.inner.waiters.borrow_mut());
        tracing::debug!(
            resource = self.inner.id,
            waiters = waiters.len(),
            "image resource settled"
        );
        for w in waiters {
            w();
        }
    }
}

impl PartialEq for ImageResource {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ImageResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.state.borrow() {
            ImageState::Pending => "pending",
            ImageState::Ready(_) => "ready",
            ImageState::Failed(_) => "failed",
        };
        f.debug_struct("ImageResource")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/image.rs"]
mod tests;
