//! WS-Management client core.
//!
//! Builds SOAP envelopes for the generic WS-Man verb set, parses responses
//! into typed shapes, drives Enumerate/Pull pagination, and decodes CIM
//! integer enumerations into names.
//!
//! # Features
//!
//! - Deterministic, single-line envelopes (Get, Put, Create, Delete,
//!   Enumerate, Pull, Release, method invocation, Identify)
//! - Per-session, strictly increasing `MessageID`s
//! - SOAP fault decoding and response correlation (`RelatesTo`, `Action`)
//! - `Outcome` for method ReturnValues; callers decide what is fatal
//! - Forward-compatible enum decoding with a stable sentinel
//!
//! HTTP, TLS and authentication are supplied through [`Transport`].
//!
//! # Example
//!
//! ```ignore
//! use wsman_client::{Client, ClientConfig};
//! use wsman_client::parser::Element;
//!
//! let client = Client::new(ClientConfig::default(), my_http_transport);
//! let ports: Vec<Element> = client.enumerate_all(
//!     "http://intel.com/wbem/wscim/1/amt-schema/1/AMT_EthernetPortSettings",
//! )?;
//! let res = client.request_state_change(
//!     "http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_KVMRedirectionSAP",
//!     2,
//! )?;
//! res.outcome.into_result("RequestStateChange")?;
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod enumeration;
pub mod envelope;
pub mod error;
pub mod message;
pub mod parser;
pub mod response;
pub mod session;
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use enumeration::{CursorState, EnumerationCursor};
pub use envelope::{EndpointReference, Instance, Properties, PropertyValue, SelectorSet};
pub use error::{Fault, FaultKind, Result, TransportError, WsmanError};
pub use message::{EnumerationContext, Message, Resource, Verb};
pub use response::{FromElement, MethodResponse, Outcome, PullPage};
pub use session::{MessageId, Session};
pub use transport::Transport;
