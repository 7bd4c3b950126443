//! The interface finished pages are handed to.
//!
//! The engine does not write any document format itself.
//! Each page is shipped, in order, as a packaged [VList] to a [Backend].

use crate::node::VList;

/// Error returned by a backend.
pub type BackendError = Box<dyn std::error::Error>;

/// A consumer of finished pages.
pub trait Backend {
    /// Receives one page.
    ///
    /// Page numbers start at 1 and increase by one with each call.
    fn receive(&mut self, page_number: usize, page: VList) -> Result<(), BackendError>;

    /// Called once after the last page.
    fn finish(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Extra cost added to every page break on the given page.
    ///
    /// A value of 10000 or more makes every break on the page infinitely bad.
    fn insertion_penalty(&self, _page_number: usize) -> i32 {
        0
    }
}

/// A backend that keeps every page in memory.
#[derive(Debug, Default)]
pub struct Collect {
    pub pages: Vec<VList>,
    pub finished: bool,
}

impl Backend for Collect {
    fn receive(&mut self, page_number: usize, page: VList) -> Result<(), BackendError> {
        debug_assert_eq!(page_number, self.pages.len() + 1);
        self.pages.push(page);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        self.finished = true;
        Ok(())
    }
}

/// Shared backends, so a caller can inspect pages after handing the backend to the engine.
impl<B: Backend + ?Sized> Backend for std::rc::Rc<std::cell::RefCell<B>> {
    fn receive(&mut self, page_number: usize, page: VList) -> Result<(), BackendError> {
        self.borrow_mut().receive(page_number, page)
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        self.borrow_mut().finish()
    }

    fn insertion_penalty(&self, page_number: usize) -> i32 {
        self.borrow().insertion_penalty(page_number)
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn receive(&mut self, page_number: usize, page: VList) -> Result<(), BackendError> {
        (**self).receive(page_number, page)
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        (**self).finish()
    }

    fn insertion_penalty(&self, page_number: usize) -> i32 {
        (**self).insertion_penalty(page_number)
    }
}
