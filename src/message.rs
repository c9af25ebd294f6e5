//! The generic verb set bound to one resource URI.
//!
//! Every verb is pure construction: it allocates a MessageID and returns the
//! request [`Message`]. Sending and parsing happen separately, so the same
//! messages serve as dry-run XML.

use crate::envelope::{
    action, build_envelope, build_identify_envelope, namespaced_element, Instance, Properties,
    PropertyValue, SelectorSet, WSEN_NS,
};
use crate::session::{MessageId, Session};
use std::fmt;

/// The operation a message performs; decides how its response is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Get,
    Put,
    Create,
    Delete,
    Enumerate,
    Pull,
    Release,
    Identify,
    /// Class method invocation by name
    Invoke(String),
}

impl Verb {
    pub fn name(&self) -> &str {
        match self {
            Self::Get => "Get",
            Self::Put => "Put",
            Self::Create => "Create",
            Self::Delete => "Delete",
            Self::Enumerate => "Enumerate",
            Self::Pull => "Pull",
            Self::Release => "Release",
            Self::Identify => "Identify",
            Self::Invoke(method) => method,
        }
    }
}

/// Opaque enumeration cursor token owned by the remote device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumerationContext(String);

impl EnumerationContext {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnumerationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully built request envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    verb: Verb,
    action: String,
    resource_uri: String,
    message_id: Option<MessageId>,
    xml: String,
}

impl Message {
    pub fn verb(&self) -> &Verb {
        &self.verb
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn resource_uri(&self) -> &str {
        &self.resource_uri
    }

    /// `None` only for Identify, which carries no addressing headers.
    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    pub fn as_str(&self) -> &str {
        &self.xml
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.xml.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.xml
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xml)
    }
}

/// Verb builder for one resource class.
#[derive(Debug, Clone)]
pub struct Resource<'s> {
    session: &'s Session,
    resource_uri: String,
}

impl<'s> Resource<'s> {
    /// # Panics
    ///
    /// Panics if `resource_uri` is empty.
    pub fn new(session: &'s Session, resource_uri: impl Into<String>) -> Self {
        let resource_uri = resource_uri.into();
        assert!(!resource_uri.is_empty(), "resource URI must not be empty");
        Self {
            session,
            resource_uri,
        }
    }

    pub fn uri(&self) -> &str {
        &self.resource_uri
    }

    /// Class name, taken from the last path segment of the resource URI.
    pub fn class_name(&self) -> &str {
        self.resource_uri
            .rsplit('/')
            .next()
            .unwrap_or(&self.resource_uri)
    }

    fn message(&self, verb: Verb, action: String, selectors: Option<SelectorSet>, body: &str) -> Message {
        let header = self
            .session
            .build_header(action.clone(), self.resource_uri.clone(), selectors);
        Message {
            verb,
            action,
            resource_uri: self.resource_uri.clone(),
            message_id: Some(header.message_id),
            xml: build_envelope(&header, body),
        }
    }

    /// Retrieve one instance, or the singleton when `selectors` is `None`.
    pub fn get(&self, selectors: Option<SelectorSet>) -> Message {
        self.message(Verb::Get, action::GET.to_string(), selectors, "")
    }

    /// Start a class-scoped enumeration.
    pub fn enumerate(&self) -> Message {
        let body = format!(r#"<Enumerate xmlns="{}" />"#, WSEN_NS);
        self.message(Verb::Enumerate, action::ENUMERATE.to_string(), None, &body)
    }

    /// Fetch the next page with a context from Enumerate or a previous Pull.
    pub fn pull(&self, context: &EnumerationContext) -> Message {
        let limits = &self.session.config().enumeration;
        let body = format!(
            "<Pull xmlns=\"{}\"><EnumerationContext>{}</EnumerationContext>\
             <MaxElements>{}</MaxElements><MaxCharacters>{}</MaxCharacters></Pull>",
            WSEN_NS,
            quick_xml::escape::escape(context.as_str()),
            limits.max_elements,
            limits.max_characters
        );
        self.message(Verb::Pull, action::PULL.to_string(), None, &body)
    }

    /// Abandon a live enumeration context.
    pub fn release(&self, context: &EnumerationContext) -> Message {
        let body = format!(
            r#"<Release xmlns="{}"><EnumerationContext>{}</EnumerationContext></Release>"#,
            WSEN_NS,
            quick_xml::escape::escape(context.as_str())
        );
        self.message(Verb::Release, action::RELEASE.to_string(), None, &body)
    }

    /// Replace an instance. `selectors` may be `None` for singletons.
    pub fn put(&self, selectors: Option<SelectorSet>, instance: &Instance) -> Message {
        let body = instance.to_xml(&self.resource_uri);
        self.message(Verb::Put, action::PUT.to_string(), selectors, &body)
    }

    /// Create a new instance.
    pub fn create(&self, instance: &Instance) -> Message {
        let body = instance.to_xml(&self.resource_uri);
        self.message(Verb::Create, action::CREATE.to_string(), None, &body)
    }

    /// Delete the addressed instance.
    ///
    /// # Panics
    ///
    /// Panics if `selectors` is empty; Delete is always instance-scoped.
    pub fn delete(&self, selectors: SelectorSet) -> Message {
        assert!(!selectors.is_empty(), "Delete requires at least one selector");
        self.message(Verb::Delete, action::DELETE.to_string(), Some(selectors), "")
    }

    /// Invoke a class method with ordered parameters.
    pub fn invoke(&self, method: &str, params: &Properties) -> Message {
        self.invoke_on(method, None, params)
    }

    /// Invoke a method on the instance addressed by `selectors`.
    pub fn invoke_on(&self, method: &str, selectors: Option<SelectorSet>, params: &Properties) -> Message {
        let body = namespaced_element(&format!("{}_INPUT", method), &self.resource_uri, params);
        self.message(
            Verb::Invoke(method.to_string()),
            action::method(&self.resource_uri, method),
            selectors,
            &body,
        )
    }

    /// `RequestStateChange` with a single `RequestedState` parameter.
    pub fn request_state_change(&self, requested_state: u32) -> Message {
        self.invoke(REQUEST_STATE_CHANGE, &request_state_change_params(requested_state))
    }
}

pub(crate) const REQUEST_STATE_CHANGE: &str = "RequestStateChange";

pub(crate) fn request_state_change_params(requested_state: u32) -> Properties {
    Properties::new().with("RequestedState", PropertyValue::from(requested_state))
}

/// The Identify request, independent of any resource.
pub fn identify() -> Message {
    Message {
        verb: Verb::Identify,
        action: String::new(),
        resource_uri: String::new(),
        message_id: None,
        xml: build_identify_envelope(),
    }
}
