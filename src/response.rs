//! Typed response shapes, one per verb.

use crate::codec::{self, ReturnValueCode};
use crate::envelope::{EndpointReference, SelectorSet, WSA_NS, WSEN_NS, WSMAN_NS, WSMID_NS, WXF_NS};
use crate::error::{Result, WsmanError};
use crate::message::EnumerationContext;
use crate::parser::{Element, ResponseEnvelope};

/// Conversion from a parsed element into a binding's typed structure.
pub trait FromElement: Sized {
    fn from_element(element: &Element) -> Result<Self>;
}

impl FromElement for Element {
    fn from_element(element: &Element) -> Result<Self> {
        Ok(element.clone())
    }
}

/// Result of a method-style call, derived from its ReturnValue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(u32),
}

impl Outcome {
    pub fn from_return_value(code: u32) -> Self {
        if code == 0 {
            Self::Success
        } else {
            Self::Failure(code)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::Success => 0,
            Self::Failure(code) => *code,
        }
    }

    /// Opt into strict checking: a non-zero ReturnValue becomes an error.
    pub fn into_result(self, method: &str) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::Failure(code) => Err(WsmanError::ReturnValue {
                method: method.to_string(),
                code,
                name: codec::decode_kind::<ReturnValueCode>(i64::from(code)),
            }),
        }
    }
}

/// Parsed `{Method}_OUTPUT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodResponse {
    pub method: String,
    pub return_value: u32,
    pub outcome: Outcome,
    /// The whole output element, for method-specific out parameters
    pub output: Element,
}

impl MethodResponse {
    /// Symbolic name of the ReturnValue from the generic CIM table.
    pub fn return_value_name(&self) -> &'static str {
        codec::decode_kind::<ReturnValueCode>(i64::from(self.return_value))
    }
}

/// One page of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullPage {
    /// Items in the order the device sent them
    pub items: Vec<Element>,
    /// Context for the next Pull; `None` once the sequence has ended
    pub context: Option<EnumerationContext>,
}

impl PullPage {
    pub fn end_of_sequence(&self) -> bool {
        self.context.is_none()
    }
}

/// Parsed `IdentifyResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyResponse {
    pub protocol_version: String,
    pub product_vendor: Option<String>,
    pub product_version: Option<String>,
}

fn expect_body<'a>(env: &'a ResponseEnvelope, namespace: &str, name: &str) -> Result<&'a Element> {
    let el = env.body_element()?;
    if !el.is(namespace, name) {
        return Err(WsmanError::MalformedResponse(format!(
            "expected {} in body, found {}",
            name, el.name
        )));
    }
    Ok(el)
}

/// Get and Put answer with the instance itself.
pub fn parse_instance<T: FromElement>(env: &ResponseEnvelope) -> Result<T> {
    T::from_element(env.body_element()?)
}

pub fn parse_enumerate(env: &ResponseEnvelope) -> Result<EnumerationContext> {
    let el = expect_body(env, WSEN_NS, "EnumerateResponse")?;
    el.child_ns(WSEN_NS, "EnumerationContext")
        .map(|c| EnumerationContext::new(c.text.trim()))
        .ok_or_else(|| WsmanError::MalformedResponse("EnumerateResponse without EnumerationContext".into()))
}

pub fn parse_pull(env: &ResponseEnvelope) -> Result<PullPage> {
    let el = expect_body(env, WSEN_NS, "PullResponse")?;

    let items = el
        .child_ns(WSEN_NS, "Items")
        .map(|items| items.children.clone())
        .unwrap_or_default();
    let end = el.child_ns(WSEN_NS, "EndOfSequence").is_some()
        || el.child_ns(WSMAN_NS, "EndOfSequence").is_some();
    let context = el
        .child_ns(WSEN_NS, "EnumerationContext")
        .map(|c| EnumerationContext::new(c.text.trim()));

    match (end, context) {
        (true, _) => Ok(PullPage { items, context: None }),
        (false, Some(context)) => Ok(PullPage {
            items,
            context: Some(context),
        }),
        (false, None) => Err(WsmanError::MalformedResponse(
            "PullResponse has neither EnumerationContext nor EndOfSequence".into(),
        )),
    }
}

/// Create answers with a `ResourceCreated` endpoint reference.
pub fn parse_created(env: &ResponseEnvelope) -> Result<EndpointReference> {
    let el = expect_body(env, WXF_NS, "ResourceCreated")?;
    parse_endpoint_reference(el)
}

/// Parse the Address/ReferenceParameters children of an EPR element.
pub fn parse_endpoint_reference(el: &Element) -> Result<EndpointReference> {
    let address = el
        .child_ns(WSA_NS, "Address")
        .map(|a| a.text.trim().to_string())
        .unwrap_or_default();
    let params = el
        .child_ns(WSA_NS, "ReferenceParameters")
        .ok_or_else(|| WsmanError::MalformedResponse("endpoint reference without ReferenceParameters".into()))?;
    let resource_uri = params
        .child_ns(WSMAN_NS, "ResourceURI")
        .map(|r| r.text.trim().to_string())
        .ok_or_else(|| WsmanError::MalformedResponse("endpoint reference without ResourceURI".into()))?;

    let mut selectors = SelectorSet::new();
    if let Some(set) = params.child_ns(WSMAN_NS, "SelectorSet") {
        for selector in set.children_named("Selector") {
            let name = selector
                .attribute("Name")
                .ok_or_else(|| WsmanError::MalformedResponse("Selector without Name".into()))?;
            selectors.push(name, selector.text.clone());
        }
    }

    Ok(EndpointReference {
        address,
        resource_uri,
        selectors,
    })
}

/// Delete and Release answer with an empty body.
pub fn parse_empty(env: &ResponseEnvelope) -> Result<()> {
    if env.body.is_empty() {
        Ok(())
    } else {
        Err(WsmanError::MalformedResponse(format!(
            "expected empty body, found {}",
            env.body[0].name
        )))
    }
}

pub fn parse_method(env: &ResponseEnvelope, resource_uri: &str, method: &str) -> Result<MethodResponse> {
    let output_name = format!("{}_OUTPUT", method);
    let el = expect_body(env, resource_uri, &output_name)?;

    let raw = el
        .child("ReturnValue")
        .ok_or_else(|| WsmanError::MalformedResponse(format!("{} without ReturnValue", output_name)))?;
    let return_value: u32 = raw.text.trim().parse().map_err(|_| {
        WsmanError::MalformedResponse(format!("ReturnValue {:?} is not an unsigned integer", raw.text))
    })?;

    Ok(MethodResponse {
        method: method.to_string(),
        return_value,
        outcome: Outcome::from_return_value(return_value),
        output: el.clone(),
    })
}

pub fn parse_identify(env: &ResponseEnvelope) -> Result<IdentifyResponse> {
    let el = expect_body(env, WSMID_NS, "IdentifyResponse")?;
    let protocol_version = el
        .child_text("ProtocolVersion")
        .ok_or_else(|| WsmanError::MalformedResponse("IdentifyResponse without ProtocolVersion".into()))?
        .trim()
        .to_string();
    Ok(IdentifyResponse {
        protocol_version,
        product_vendor: el.child_text("ProductVendor").map(String::from),
        product_version: el.child_text("ProductVersion").map(String::from),
    })
}
