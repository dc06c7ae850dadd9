use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::foundation::core::{Affine, Vector};

/// Logical-to-surface coordinate mapping shared by one or more layers.
///
/// Cloning a `View` yields another handle to the same mapping; a pan applied through any handle is
/// seen by every layer positioned through it.
#[derive(Clone, Default)]
pub struct View {
    inner: Rc<ViewInner>,
}

#[derive(Default)]
struct ViewInner {
    transform: Cell<Affine>,
    layers: RefCell<Vec<String>>,
}

impl View {
    /// Identity view positioning for the named layers.
    pub fn new<I, S>(layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let view = Self::default();
        for name in layers {
            view.attach(name);
        }
        view
    }

    /// Map a logical position to surface pixel coordinates.
    pub fn get_position(&self, logical: Vector) -> Vector {
        (self.inner.transform.get() * logical.to_point()).into()
    }

    pub fn transform(&self) -> Affine {
        self.inner.transform.get()
    }

    pub fn set_transform(&self, transform: Affine) {
        self.inner.transform.set(transform);
    }

    /// Shift the mapping by `delta` surface pixels.
    pub fn pan(&self, delta: Vector) {
        let t = self.inner.transform.get();
        self.inner
            .transform
            .set(Affine::translate((delta.x, delta.y)) * t);
    }

    /// Names of the layers positioned through this view.
    pub fn layers(&self) -> Vec<String> {
        self.inner.layers.borrow().clone()
    }

    pub(crate) fn attach(&self, layer: impl Into<String>) {
        let layer = layer.into();
        let mut layers = self.inner.layers.borrow_mut();
        if !layers.contains(&layer) {
            layers.push(layer);
        }
    }

    pub(crate) fn detach(&self, layer: &str) {
        self.inner.layers.borrow_mut().retain(|l| l != layer);
    }

    /// `true` when both handles refer to the same mapping.
    pub fn is_shared_with(&self, other: &View) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("transform", &self.inner.transform.get())
            .field("layers", &*self.inner.layers.borrow())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/view.rs"]
mod tests;
