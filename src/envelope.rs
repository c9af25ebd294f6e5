//! SOAP envelope construction.
//!
//! Output is a single line with no insignificant whitespace so the same input
//! always yields the same bytes.

use crate::config::xs_duration;
use crate::session::MessageId;
use quick_xml::escape::escape;
use std::fmt::Write;
use std::time::Duration;

/// SOAP 1.2 envelope namespace.
pub const SOAP_12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
/// WS-Addressing namespace.
pub const WSA_NS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
/// WS-Management namespace.
pub const WSMAN_NS: &str = "http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd";
/// WS-Enumeration namespace.
pub const WSEN_NS: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration";
/// WS-Transfer namespace.
pub const WXF_NS: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer";
/// WS-Management identity namespace.
pub const WSMID_NS: &str = "http://schemas.dmtf.org/wbem/wsman/identity/1/wsmanidentity.xsd";

/// Fixed action URIs of the transfer and enumeration verbs.
pub mod action {
    pub const GET: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Get";
    pub const PUT: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Put";
    pub const CREATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Create";
    pub const DELETE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Delete";
    pub const ENUMERATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration/Enumerate";
    pub const PULL: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration/Pull";
    pub const RELEASE: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration/Release";

    /// Action of a class method: `{resource_uri}/{method}`.
    pub fn method(resource_uri: &str, method: &str) -> String {
        format!("{}/{}", resource_uri, method)
    }

    /// Action a well-behaved service answers with.
    pub fn response(action: &str) -> String {
        format!("{}Response", action)
    }
}

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// One `(Name, Value)` selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub name: String,
    pub value: String,
}

/// Ordered selectors addressing one instance. Order is preserved on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorSet {
    selectors: Vec<Selector>,
}

impl SelectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a selector, keeping insertion order.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.selectors.push(Selector {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.selectors.iter()
    }

    /// Value of the first selector with this name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.selectors
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.value.as_str())
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:SelectorSet>");
        for selector in &self.selectors {
            let _ = write!(
                out,
                r#"<w:Selector Name="{}">{}</w:Selector>"#,
                escape(selector.name.as_str()),
                escape(selector.value.as_str())
            );
        }
        out.push_str("</w:SelectorSet>");
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for SelectorSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = SelectorSet::new();
        for (name, value) in iter {
            set.push(name, value);
        }
        set
    }
}

/// Envelope header, built by [`Session::build_header`](crate::Session::build_header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub action: String,
    pub to: String,
    pub resource_uri: String,
    pub message_id: MessageId,
    pub reply_to: String,
    pub operation_timeout: Duration,
    pub selectors: Option<SelectorSet>,
}

impl Header {
    fn write_xml(&self, out: &mut String) {
        let _ = write!(
            out,
            "<Header><a:Action>{}</a:Action><a:To>{}</a:To><w:ResourceURI>{}</w:ResourceURI>\
             <a:MessageID>{}</a:MessageID><a:ReplyTo><a:Address>{}</a:Address></a:ReplyTo>\
             <w:OperationTimeout>{}</w:OperationTimeout>",
            escape(self.action.as_str()),
            escape(self.to.as_str()),
            escape(self.resource_uri.as_str()),
            self.message_id,
            escape(self.reply_to.as_str()),
            xs_duration(self.operation_timeout),
        );
        if let Some(selectors) = &self.selectors {
            selectors.write_xml(out);
        }
        out.push_str("</Header>");
    }
}

/// Wrap a header and an already-serialized body fragment into an envelope.
pub fn build_envelope(header: &Header, body: &str) -> String {
    let mut out = String::with_capacity(512 + body.len());
    out.push_str(XML_DECLARATION);
    let _ = write!(
        out,
        r#"<Envelope xmlns="{}" xmlns:a="{}" xmlns:w="{}">"#,
        SOAP_12_NS, WSA_NS, WSMAN_NS
    );
    header.write_xml(&mut out);
    out.push_str("<Body>");
    out.push_str(body);
    out.push_str("</Body></Envelope>");
    out
}

/// The Identify envelope carries no addressing headers at all.
pub fn build_identify_envelope() -> String {
    format!(
        r#"{}<Envelope xmlns="{}" xmlns:wsmid="{}"><Header></Header><Body><wsmid:Identify/></Body></Envelope>"#,
        XML_DECLARATION, SOAP_12_NS, WSMID_NS
    )
}

/// A WS-Addressing endpoint reference to a managed instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReference {
    pub address: String,
    pub resource_uri: String,
    pub selectors: SelectorSet,
}

impl EndpointReference {
    pub fn new(resource_uri: impl Into<String>, selectors: SelectorSet) -> Self {
        Self {
            address: crate::config::ANONYMOUS_ADDRESS.to_string(),
            resource_uri: resource_uri.into(),
            selectors,
        }
    }

    fn write_xml(&self, out: &mut String) {
        let _ = write!(
            out,
            "<a:Address>{}</a:Address><a:ReferenceParameters><w:ResourceURI>{}</w:ResourceURI>",
            escape(self.address.as_str()),
            escape(self.resource_uri.as_str())
        );
        if !self.selectors.is_empty() {
            self.selectors.write_xml(out);
        }
        out.push_str("</a:ReferenceParameters>");
    }
}

/// Value of one property or method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    /// Rendered as one element per entry
    Array(Vec<String>),
    Reference(EndpointReference),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        Self::Array(value)
    }
}

impl From<EndpointReference> for PropertyValue {
    fn from(value: EndpointReference) -> Self {
        Self::Reference(value)
    }
}

/// Ordered `(name, value)` pairs rendered under the `h:` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn write_xml(&self, out: &mut String) {
        for (name, value) in &self.entries {
            let name = escape(name.as_str());
            match value {
                PropertyValue::Text(text) => {
                    let _ = write!(out, "<h:{0}>{1}</h:{0}>", name, escape(text.as_str()));
                }
                PropertyValue::Array(items) => {
                    for item in items {
                        let _ = write!(out, "<h:{0}>{1}</h:{0}>", name, escape(item.as_str()));
                    }
                }
                PropertyValue::Reference(epr) => {
                    let _ = write!(out, "<h:{}>", name);
                    epr.write_xml(out);
                    let _ = write!(out, "</h:{}>", name);
                }
            }
        }
    }
}

/// A class instance body for Put and Create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub class_name: String,
    pub properties: Properties,
}

impl Instance {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            properties: Properties::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push(name, value);
        self
    }

    /// `<h:{Class} xmlns:h="{resource_uri}">...</h:{Class}>`
    pub fn to_xml(&self, resource_uri: &str) -> String {
        namespaced_element(&self.class_name, resource_uri, &self.properties)
    }
}

/// `<h:{name} xmlns:h="{namespace}">{properties}</h:{name}>`
pub(crate) fn namespaced_element(name: &str, namespace: &str, properties: &Properties) -> String {
    let name = escape(name);
    let mut out = format!(r#"<h:{} xmlns:h="{}">"#, name, escape(namespace));
    properties.write_xml(&mut out);
    let _ = write!(out, "</h:{}>", name);
    out
}
