//! Enumerate/Pull pagination.
//!
//! ```text
//! Start --Enumerate--> HasContext --Pull--> HasContext | Exhausted
//!   any failure -----> Failed
//! ```
//!
//! A context is consumed by the Pull that uses it. After a failed round trip
//! the old context is dropped, since its validity on the device is unknown;
//! recovery means a new cursor and a new Enumerate.

use crate::client::Client;
use crate::error::{Result, WsmanError};
use crate::message::EnumerationContext;
use crate::parser::Element;
use crate::transport::Transport;
use tracing::{debug, warn};

/// Where a cursor is in the Enumerate/Pull exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    Start,
    HasContext(EnumerationContext),
    Exhausted,
    Failed,
}

/// Stateful iterator over the pages of one enumeration.
pub struct EnumerationCursor<'c, T> {
    client: &'c Client<T>,
    resource_uri: String,
    state: CursorState,
    pages: usize,
    items: usize,
}

impl<'c, T: Transport> EnumerationCursor<'c, T> {
    pub fn new(client: &'c Client<T>, resource_uri: impl Into<String>) -> Self {
        Self {
            client,
            resource_uri: resource_uri.into(),
            state: CursorState::Start,
            pages: 0,
            items: 0,
        }
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Pages received so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Items received so far.
    pub fn items(&self) -> usize {
        self.items
    }

    /// Fetch the next page, enumerating first if needed.
    ///
    /// Returns `Ok(None)` once end-of-sequence has been seen. A page may be
    /// empty while the sequence continues.
    pub fn next_page(&mut self) -> Result<Option<Vec<Element>>> {
        // Failed until a round trip proves otherwise.
        let context = match std::mem::replace(&mut self.state, CursorState::Failed) {
            CursorState::Start => match self.client.enumerate(&self.resource_uri) {
                Ok(context) => context,
                Err(e) => {
                    warn!(resource_uri = %self.resource_uri, error = %e, "Enumerate failed");
                    return Err(e);
                }
            },
            CursorState::HasContext(context) => context,
            CursorState::Exhausted => {
                self.state = CursorState::Exhausted;
                return Ok(None);
            }
            CursorState::Failed => return Err(WsmanError::CursorFailed),
        };

        let page = match self.client.pull(&self.resource_uri, &context) {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    resource_uri = %self.resource_uri,
                    pages = self.pages,
                    error = %e,
                    "Pull failed, abandoning enumeration"
                );
                return Err(e);
            }
        };

        self.pages += 1;
        self.items += page.items.len();
        self.state = match page.context {
            Some(next) => CursorState::HasContext(next),
            None => {
                debug!(
                    resource_uri = %self.resource_uri,
                    pages = self.pages,
                    items = self.items,
                    "Enumeration exhausted"
                );
                CursorState::Exhausted
            }
        };
        Ok(Some(page.items))
    }

    /// Pull until end-of-sequence, concatenating pages in order.
    pub fn drain(&mut self) -> Result<Vec<Element>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page()? {
            all.extend(page);
        }
        Ok(all)
    }

    /// Tell the device to drop a live context early.
    ///
    /// A cursor that never enumerated has nothing to release. An exhausted or
    /// failed cursor holds no valid context and is an error.
    pub fn release(self) -> Result<()> {
        match &self.state {
            CursorState::Start => Ok(()),
            CursorState::HasContext(context) => self.client.release(&self.resource_uri, context),
            CursorState::Exhausted => Err(WsmanError::CursorExhausted),
            CursorState::Failed => Err(WsmanError::CursorFailed),
        }
    }
}

impl<T: Transport> Iterator for EnumerationCursor<'_, T> {
    type Item = Result<Vec<Element>>;

    /// Yields each page, then stops; a failure is yielded once.
    fn next(&mut self) -> Option<Self::Item> {
        if self.state == CursorState::Failed {
            return None;
        }
        self.next_page().transpose()
    }
}
