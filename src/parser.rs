//! Response envelope parsing.
//!
//! Uses quick-xml's namespace-aware reader, which never expands entities.
//! Responses carrying a DOCTYPE are rejected outright.

use crate::envelope::{SOAP_12_NS, WSA_NS, WSMAN_NS};
use crate::error::{Fault, Result, WsmanError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

/// SOAP 1.1 envelope namespace, accepted for faults from older stacks.
pub const SOAP_11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// A parsed XML element with resolved namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name, without prefix
    pub name: String,
    /// Resolved namespace URI
    pub namespace: Option<String>,
    /// Non-namespace attributes by local name, in document order
    pub attributes: Vec<(String, String)>,
    /// Concatenated, unescaped text content. Verbatim for leaf elements;
    /// whitespace-only text around child elements is dropped.
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// True when local name and namespace both match.
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// First child with this local name, any namespace.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child with this local name in `namespace`.
    pub fn child_ns(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(namespace, name))
    }

    /// All children with this local name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child with this local name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Follow a chain of local names.
    pub fn path(&self, names: &[&str]) -> Option<&Element> {
        names.iter().try_fold(self, |el, name| el.child(name))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Text of this element and all descendants, space separated.
    pub fn deep_text(&self) -> String {
        let mut parts = Vec::new();
        collect_text(self, &mut parts);
        parts.join(" ")
    }
}

fn collect_text<'a>(el: &'a Element, out: &mut Vec<&'a str>) {
    if !el.text.is_empty() {
        out.push(&el.text);
    }
    for child in &el.children {
        collect_text(child, out);
    }
}

/// Addressing headers of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeader {
    pub action: Option<String>,
    pub message_id: Option<String>,
    pub relates_to: Option<String>,
    pub resource_uri: Option<String>,
}

/// A parsed response envelope whose body is not a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub header: ResponseHeader,
    /// Element children of Body, in document order
    pub body: Vec<Element>,
}

impl ResponseEnvelope {
    /// The single body element, or a malformed-response error.
    pub fn body_element(&self) -> Result<&Element> {
        match self.body.as_slice() {
            [el] => Ok(el),
            [] => Err(WsmanError::MalformedResponse("empty response body".into())),
            _ => Err(WsmanError::MalformedResponse(format!(
                "expected one body element, found {}",
                self.body.len()
            ))),
        }
    }
}

/// Parse raw bytes into a tree rooted at the document element.
pub fn parse_document(data: &[u8]) -> Result<Element> {
    let xml = std::str::from_utf8(data)
        .map_err(|e| WsmanError::Xml(format!("Invalid UTF-8: {}", e)))?;

    // Leaf text is kept verbatim; only indentation between elements is dropped.
    let mut reader = NsReader::from_str(xml);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match event {
            Event::Start(ref e) => {
                let element = start_element(resolved, e)?;
                stack.push(element);
            }
            Event::Empty(ref e) => {
                let element = start_element(resolved, e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| WsmanError::Xml("unbalanced end tag".into()))?;
                if !element.children.is_empty() && element.text.trim().is_empty() {
                    element.text.clear();
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                let text = e.unescape()?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                let bytes = e.into_inner();
                let text = std::str::from_utf8(&bytes)
                    .map_err(|e| WsmanError::Xml(format!("Invalid UTF-8 in CDATA: {}", e)))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(text);
                }
            }
            Event::DocType(_) => {
                return Err(WsmanError::Xml("DOCTYPE declarations are not allowed".into()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(WsmanError::Xml("unexpected end of document".into()));
    }
    root.ok_or_else(|| WsmanError::Xml("document has no root element".into()))
}

fn start_element(resolved: ResolveResult, e: &BytesStart) -> Result<Element> {
    let namespace = match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(prefix) => {
            return Err(WsmanError::Xml(format!(
                "undeclared namespace prefix {}",
                String::from_utf8_lossy(&prefix)
            )));
        }
    };

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| WsmanError::Xml(e.to_string()))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        namespace,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(WsmanError::Xml("multiple root elements".into())),
    }
    Ok(())
}

/// Parse a response envelope. A SOAP fault body becomes [`WsmanError::Fault`].
pub fn parse_envelope(data: &[u8]) -> Result<ResponseEnvelope> {
    let root = parse_document(data)?;

    let soap_ns = match root.namespace.as_deref() {
        Some(SOAP_12_NS) if root.name == "Envelope" => SOAP_12_NS,
        Some(SOAP_11_NS) if root.name == "Envelope" => SOAP_11_NS,
        _ => {
            return Err(WsmanError::MalformedResponse(format!(
                "root element {} is not a SOAP envelope",
                root.name
            )));
        }
    };

    let mut header = ResponseHeader::default();
    if let Some(h) = root.child_ns(soap_ns, "Header") {
        let token = |ns: &str, name: &str| h.child_ns(ns, name).map(|e| e.text.trim().to_string());
        header.action = token(WSA_NS, "Action");
        header.message_id = token(WSA_NS, "MessageID");
        header.relates_to = token(WSA_NS, "RelatesTo");
        header.resource_uri = token(WSMAN_NS, "ResourceURI");
    }

    let body = root
        .children
        .into_iter()
        .find(|c| c.is(soap_ns, "Body"))
        .ok_or_else(|| WsmanError::MalformedResponse("envelope has no Body".into()))?;

    if let Some(fault) = body.child_ns(soap_ns, "Fault") {
        return Err(WsmanError::Fault(parse_fault(fault, soap_ns)));
    }

    Ok(ResponseEnvelope {
        header,
        body: body.children,
    })
}

fn parse_fault(fault: &Element, soap_ns: &str) -> Fault {
    let parsed = if soap_ns == SOAP_12_NS {
        let code = fault
            .path(&["Code", "Value"])
            .map(|e| e.text.trim().to_string())
            .unwrap_or_default();
        let subcode = fault
            .path(&["Code", "Subcode", "Value"])
            .map(|e| e.text.trim().to_string());
        let reason = fault
            .path(&["Reason", "Text"])
            .map(|e| e.text.trim().to_string())
            .unwrap_or_default();
        let detail = fault.child("Detail").map(Element::deep_text);
        (Fault::new(code, subcode, reason), detail)
    } else {
        let code = fault.child_text("faultcode").unwrap_or_default().trim().to_string();
        let reason = fault.child_text("faultstring").unwrap_or_default().trim().to_string();
        let detail = fault.child("detail").map(Element::deep_text);
        (Fault::new(code, None, reason), detail)
    };

    match parsed {
        (fault, Some(detail)) if !detail.is_empty() => fault.with_detail(detail),
        (fault, _) => fault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;

    const GET_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<a:Envelope xmlns:a="http://www.w3.org/2003/05/soap-envelope" xmlns:b="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:c="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd" xmlns:g="http://intel.com/wbem/wscim/1/amt-schema/1/AMT_GeneralSettings">
  <a:Header>
    <b:To>http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous</b:To>
    <b:RelatesTo>0</b:RelatesTo>
    <b:Action a:mustUnderstand="true">http://schemas.xmlsoap.org/ws/2004/09/transfer/GetResponse</b:Action>
    <b:MessageID>uuid:00000000-8086-8086-8086-000000000001</b:MessageID>
    <c:ResourceURI>http://intel.com/wbem/wscim/1/amt-schema/1/AMT_GeneralSettings</c:ResourceURI>
  </a:Header>
  <a:Body>
    <g:AMT_GeneralSettings>
      <g:HostName>Intel&amp;Co</g:HostName>
      <g:NetworkInterfaceEnabled>true</g:NetworkInterfaceEnabled>
    </g:AMT_GeneralSettings>
  </a:Body>
</a:Envelope>"#;

    const FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<a:Envelope xmlns:a="http://www.w3.org/2003/05/soap-envelope" xmlns:b="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:e="http://schemas.xmlsoap.org/ws/2004/09/enumeration">
  <a:Header>
    <b:Action>http://schemas.xmlsoap.org/ws/2004/08/addressing/fault</b:Action>
  </a:Header>
  <a:Body>
    <a:Fault>
      <a:Code>
        <a:Value>a:Sender</a:Value>
        <a:Subcode><a:Value>e:InvalidEnumerationContext</a:Value></a:Subcode>
      </a:Code>
      <a:Reason><a:Text xml:lang="en-US">The supplied enumeration context is invalid.</a:Text></a:Reason>
      <a:Detail><e:Context>1</e:Context></a:Detail>
    </a:Fault>
  </a:Body>
</a:Envelope>"#;

    #[test]
    fn test_parse_get_response() {
        let env = parse_envelope(GET_RESPONSE.as_bytes()).unwrap();
        assert_eq!(env.header.relates_to.as_deref(), Some("0"));
        assert_eq!(
            env.header.action.as_deref(),
            Some("http://schemas.xmlsoap.org/ws/2004/09/transfer/GetResponse")
        );
        let body = env.body_element().unwrap();
        assert_eq!(body.name, "AMT_GeneralSettings");
        assert_eq!(
            body.namespace.as_deref(),
            Some("http://intel.com/wbem/wscim/1/amt-schema/1/AMT_GeneralSettings")
        );
        assert_eq!(body.child_text("HostName"), Some("Intel&Co"));
        assert_eq!(body.child_text("NetworkInterfaceEnabled"), Some("true"));
    }

    #[test]
    fn test_parse_fault() {
        let err = parse_envelope(FAULT.as_bytes()).unwrap_err();
        match err {
            WsmanError::Fault(fault) => {
                assert_eq!(fault.kind, FaultKind::InvalidEnumerationContext);
                assert_eq!(fault.code, "a:Sender");
                assert_eq!(fault.reason, "The supplied enumeration context is invalid.");
                assert_eq!(fault.detail.as_deref(), Some("1"));
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_soap_11_fault() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>bad</faultstring></s:Fault></s:Body></s:Envelope>"#;
        match parse_envelope(xml.as_bytes()).unwrap_err() {
            WsmanError::Fault(fault) => {
                assert_eq!(fault.code, "s:Client");
                assert_eq!(fault.reason, "bad");
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_not_an_envelope() {
        let err = parse_envelope(b"<html><body>Unauthorized</body></html>").unwrap_err();
        assert!(matches!(err, WsmanError::MalformedResponse(_)));
    }

    #[test]
    fn test_missing_body() {
        let xml = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Header/></s:Envelope>"#;
        let err = parse_envelope(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, WsmanError::MalformedResponse(_)));
    }

    #[test]
    fn test_truncated_document() {
        let xml = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body>"#;
        let err = parse_envelope(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, WsmanError::Xml(_)));
    }

    #[test]
    fn test_doctype_rejected() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body>&xxe;</s:Body></s:Envelope>"#;
        let err = parse_envelope(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, WsmanError::Xml(_)));
    }

    #[test]
    fn test_invalid_utf8() {
        let err = parse_document(&[0x3c, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, WsmanError::Xml(_)));
    }

    #[test]
    fn test_leaf_text_is_verbatim() {
        let xml = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:g="urn:g">
  <s:Body>
    <g:Settings>
      <g:Name>  padded value  </g:Name>
      <g:Blank> </g:Blank>
    </g:Settings>
  </s:Body>
</s:Envelope>"#;
        let env = parse_envelope(xml.as_bytes()).unwrap();
        let settings = env.body_element().unwrap();
        assert_eq!(settings.text, "");
        assert_eq!(settings.child_text("Name"), Some("  padded value  "));
        assert_eq!(settings.child_text("Blank"), Some(" "));
    }

    #[test]
    fn test_header_tokens_ignore_indentation() {
        let xml = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:b="http://schemas.xmlsoap.org/ws/2004/08/addressing">
  <s:Header>
    <b:RelatesTo>
      7
    </b:RelatesTo>
  </s:Header>
  <s:Body/>
</s:Envelope>"#;
        let env = parse_envelope(xml.as_bytes()).unwrap();
        assert_eq!(env.header.relates_to.as_deref(), Some("7"));
        assert!(env.body.is_empty());
    }

    #[test]
    fn test_attributes_skip_namespace_bindings() {
        let root = parse_document(br#"<w:Selector xmlns:w="urn:x" Name="InstanceID">abc</w:Selector>"#).unwrap();
        assert_eq!(root.attributes, vec![("Name".to_string(), "InstanceID".to_string())]);
        assert_eq!(root.attribute("Name"), Some("InstanceID"));
        assert_eq!(root.text, "abc");
    }
}
