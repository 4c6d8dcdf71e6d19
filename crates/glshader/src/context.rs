use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::driver::GlDriver;
use crate::types::PipelineOptions;

/// Shared handle to one graphics context.
///
/// Owns the driver and the context-wide "currently active program" slot. GL
/// keeps exactly one active program per context: activating a program through
/// any handle replaces whatever was active before, for every holder of this
/// context. Stage and program objects keep a clone so they can release their
/// driver handles when dropped.
///
/// Not `Send`: a GL context belongs to the thread it is current on.
pub struct GlContext<D: GlDriver> {
    inner: Rc<ContextInner<D>>,
}

struct ContextInner<D: GlDriver> {
    driver: D,
    active: Cell<Option<D::Program>>,
    options: PipelineOptions,
}

impl<D: GlDriver> GlContext<D> {
    pub fn new(driver: D) -> Self {
        Self::with_options(driver, PipelineOptions::default())
    }

    pub fn with_options(driver: D, options: PipelineOptions) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                driver,
                active: Cell::new(None),
                options,
            }),
        }
    }

    pub fn driver(&self) -> &D {
        &self.inner.driver
    }

    pub fn options(&self) -> PipelineOptions {
        self.inner.options
    }

    /// Program most recently activated through this context, if it is still alive.
    pub fn active_program(&self) -> Option<D::Program> {
        self.inner.active.get()
    }

    /// Leaves the context with no active program.
    pub fn deactivate(&self) {
        self.inner.driver.use_program(None);
        self.inner.active.set(None);
    }

    pub(crate) fn bind(&self, program: D::Program) {
        self.inner.driver.use_program(Some(program));
        self.inner.active.set(Some(program));
    }

    pub(crate) fn same_context(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<D: GlDriver> Clone for GlContext<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: GlDriver> fmt::Debug for GlContext<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlContext")
            .field("active", &self.inner.active.get())
            .field("options", &self.inner.options)
            .finish()
    }
}
