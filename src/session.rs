//! Per-session message sequencing.
//!
//! A [`Session`] owns the configuration shared by every envelope and the
//! counter that hands out `MessageID` values. Identifiers are assigned when a
//! header is built, so two messages built in one order and sent in another
//! still carry identifiers that reflect construction order.

use crate::config::ClientConfig;
use crate::envelope::{Header, SelectorSet};
use crate::message::Resource;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A `MessageID` value, unique and increasing within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u64);

impl MessageId {
    /// Raw counter value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One client session: shared header values plus the message counter.
#[derive(Debug)]
pub struct Session {
    config: ClientConfig,
    next_id: AtomicU64,
}

impl Session {
    /// Create a session whose first message gets id 0.
    pub fn new(config: ClientConfig) -> Self {
        Self::starting_at(config, 0)
    }

    /// Create a session whose first message gets `first_id`.
    pub fn starting_at(config: ClientConfig, first_id: u64) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(first_id),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Allocate the next message identifier.
    ///
    /// # Panics
    ///
    /// Panics once the identifiers are used up. The last one handed out is
    /// `u64::MAX - 1`; the counter never wraps.
    pub fn next_message_id(&self) -> MessageId {
        match self
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
        {
            Ok(id) => MessageId(id),
            Err(_) => panic!("MessageID space of this session is exhausted"),
        }
    }

    /// Identifier the next header will receive, without allocating it.
    pub fn peek_message_id(&self) -> MessageId {
        MessageId(self.next_id.load(Ordering::SeqCst))
    }

    /// Build a header, allocating its MessageID now.
    ///
    /// # Panics
    ///
    /// Panics if `resource_uri` is empty or the MessageIDs are used up.
    pub fn build_header(
        &self,
        action: impl Into<String>,
        resource_uri: impl Into<String>,
        selectors: Option<SelectorSet>,
    ) -> Header {
        let resource_uri = resource_uri.into();
        assert!(!resource_uri.is_empty(), "resource URI must not be empty");
        Header {
            action: action.into(),
            to: self.config.session.destination.clone(),
            resource_uri,
            message_id: self.next_message_id(),
            reply_to: self.config.session.reply_to.clone(),
            operation_timeout: self.config.session.operation_timeout,
            selectors: selectors.filter(|s| !s.is_empty()),
        }
    }

    /// Bind the generic verb set to one resource URI.
    ///
    /// # Panics
    ///
    /// Panics if `resource_uri` is empty.
    pub fn resource(&self, resource_uri: impl Into<String>) -> Resource<'_> {
        Resource::new(self, resource_uri)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ids_increase_by_one() {
        let session = Session::default();
        let ids: Vec<u64> = (0..5).map(|_| session.next_message_id().value()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(session.peek_message_id().value(), 5);
    }

    #[test]
    fn test_header_takes_id_at_build_time() {
        let session = Session::starting_at(ClientConfig::default(), 10);
        let first = session.build_header("a", "http://example.org/r", None);
        let second = session.build_header("b", "http://example.org/r", None);
        assert_eq!(first.message_id.value(), 10);
        assert_eq!(second.message_id.value(), 11);
    }

    #[test]
    fn test_empty_selector_set_is_dropped() {
        let session = Session::default();
        let header = session.build_header("a", "http://example.org/r", Some(SelectorSet::new()));
        assert!(header.selectors.is_none());
    }

    #[test]
    #[should_panic(expected = "resource URI must not be empty")]
    fn test_empty_resource_uri_panics() {
        Session::default().build_header("a", "", None);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let session = Arc::new(Session::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    (0..250)
                        .map(|_| session.next_message_id().value())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1000);
        assert_eq!(all.last().copied(), Some(999));
    }

    #[test]
    fn test_last_id_before_exhaustion() {
        let session = Session::starting_at(ClientConfig::default(), u64::MAX - 2);
        assert_eq!(session.next_message_id().value(), u64::MAX - 2);
        assert_eq!(session.next_message_id().value(), u64::MAX - 1);
    }

    #[test]
    #[should_panic(expected = "MessageID space of this session is exhausted")]
    fn test_counter_never_wraps() {
        let session = Session::starting_at(ClientConfig::default(), u64::MAX - 1);
        session.next_message_id();
        session.next_message_id();
    }

    #[test]
    fn test_independent_sessions() {
        let a = Session::default();
        let b = Session::default();
        a.next_message_id();
        a.next_message_id();
        assert_eq!(b.next_message_id().value(), 0);
    }
}
