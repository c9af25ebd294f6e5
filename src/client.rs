//! Send-and-parse execution on top of the pure message builders.

use crate::config::ClientConfig;
use crate::enumeration::EnumerationCursor;
use crate::envelope::{action, EndpointReference, Instance, Properties, SelectorSet};
use crate::error::{Result, WsmanError};
use crate::message::{self, EnumerationContext, Message, Resource, Verb};
use crate::parser::{parse_envelope, ResponseEnvelope};
use crate::response::{self, FromElement, IdentifyResponse, MethodResponse, PullPage};
use crate::session::Session;
use crate::transport::Transport;
use tracing::{debug, trace, warn};

/// A session bound to a transport.
pub struct Client<T> {
    session: Session,
    transport: T,
}

impl<T: Transport> Client<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self::with_session(Session::new(config), transport)
    }

    pub fn with_session(session: Session, transport: T) -> Self {
        Self { session, transport }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Verb builder for `resource_uri` sharing this client's session.
    pub fn resource(&self, resource_uri: &str) -> Resource<'_> {
        self.session.resource(resource_uri)
    }

    /// Send a built message and parse the response envelope.
    ///
    /// Checks `RelatesTo` and `Action` when the response carries them.
    pub fn send(&self, message: &Message) -> Result<ResponseEnvelope> {
        let message_id = message.message_id().map(|id| id.to_string());
        debug!(
            message_id = message_id.as_deref().unwrap_or("-"),
            action = %message.action(),
            resource_uri = %message.resource_uri(),
            "Sending WS-Man request"
        );
        trace!(request = %message, "Request envelope");

        let raw = self.transport.post(message.as_bytes()).map_err(|e| {
            warn!(error = %e, verb = message.verb().name(), "Transport failed");
            WsmanError::from(e)
        })?;
        trace!(response = %String::from_utf8_lossy(&raw), "Response envelope");

        let envelope = parse_envelope(&raw).map_err(|e| {
            warn!(error = %e, verb = message.verb().name(), "Response rejected");
            e
        })?;

        if let (Some(expected), Some(actual)) = (&message_id, &envelope.header.relates_to) {
            if expected != actual {
                return Err(WsmanError::RelatesToMismatch {
                    expected: expected.clone(),
                    actual: actual.clone(),
                });
            }
        }

        if let (Some(expected), Some(actual)) = (expected_action(message), &envelope.header.action) {
            if &expected != actual {
                return Err(WsmanError::UnexpectedAction {
                    expected,
                    actual: actual.clone(),
                });
            }
        }

        Ok(envelope)
    }

    /// Get an instance, or the singleton when `selectors` is `None`.
    pub fn get<R: FromElement>(&self, resource_uri: &str, selectors: Option<SelectorSet>) -> Result<R> {
        let env = self.send(&self.resource(resource_uri).get(selectors))?;
        response::parse_instance(&env)
    }

    /// Replace an instance; returns the instance as stored by the device.
    pub fn put<R: FromElement>(
        &self,
        resource_uri: &str,
        selectors: Option<SelectorSet>,
        instance: &Instance,
    ) -> Result<R> {
        let env = self.send(&self.resource(resource_uri).put(selectors, instance))?;
        response::parse_instance(&env)
    }

    pub fn create(&self, resource_uri: &str, instance: &Instance) -> Result<EndpointReference> {
        let env = self.send(&self.resource(resource_uri).create(instance))?;
        response::parse_created(&env)
    }

    pub fn delete(&self, resource_uri: &str, selectors: SelectorSet) -> Result<()> {
        let env = self.send(&self.resource(resource_uri).delete(selectors))?;
        response::parse_empty(&env)
    }

    pub fn enumerate(&self, resource_uri: &str) -> Result<EnumerationContext> {
        let env = self.send(&self.resource(resource_uri).enumerate())?;
        response::parse_enumerate(&env)
    }

    pub fn pull(&self, resource_uri: &str, context: &EnumerationContext) -> Result<PullPage> {
        let env = self.send(&self.resource(resource_uri).pull(context))?;
        response::parse_pull(&env)
    }

    pub fn release(&self, resource_uri: &str, context: &EnumerationContext) -> Result<()> {
        let env = self.send(&self.resource(resource_uri).release(context))?;
        response::parse_empty(&env)
    }

    /// Invoke a class method. A non-zero ReturnValue is returned, not raised.
    pub fn invoke(&self, resource_uri: &str, method: &str, params: &Properties) -> Result<MethodResponse> {
        self.invoke_on(resource_uri, method, None, params)
    }

    pub fn invoke_on(
        &self,
        resource_uri: &str,
        method: &str,
        selectors: Option<SelectorSet>,
        params: &Properties,
    ) -> Result<MethodResponse> {
        let env = self.send(&self.resource(resource_uri).invoke_on(method, selectors, params))?;
        let output = response::parse_method(&env, resource_uri, method)?;
        debug!(
            method,
            return_value = output.return_value,
            outcome = output.return_value_name(),
            "Method returned"
        );
        Ok(output)
    }

    pub fn request_state_change(&self, resource_uri: &str, requested_state: u32) -> Result<MethodResponse> {
        self.invoke(
            resource_uri,
            message::REQUEST_STATE_CHANGE,
            &message::request_state_change_params(requested_state),
        )
    }

    pub fn identify(&self) -> Result<IdentifyResponse> {
        let env = self.send(&message::identify())?;
        response::parse_identify(&env)
    }

    /// A fresh Enumerate/Pull cursor over `resource_uri`.
    pub fn cursor(&self, resource_uri: &str) -> EnumerationCursor<'_, T> {
        EnumerationCursor::new(self, resource_uri)
    }

    /// Enumerate and drain a whole collection, preserving device order.
    pub fn enumerate_all<R: FromElement>(&self, resource_uri: &str) -> Result<Vec<R>> {
        self.cursor(resource_uri)
            .drain()?
            .iter()
            .map(R::from_element)
            .collect()
    }
}

/// The action a compliant service answers `message` with.
fn expected_action(message: &Message) -> Option<String> {
    match message.verb() {
        Verb::Identify => None,
        _ => Some(action::response(message.action())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::parser::Element;
    use crate::transport::from_fn;

    const URI: &str = "http://intel.com/wbem/wscim/1/amt-schema/1/AMT_GeneralSettings";

    fn reply(action: &str, relates_to: &str, body: &str) -> Vec<u8> {
        format!(
            r#"<a:Envelope xmlns:a="http://www.w3.org/2003/05/soap-envelope" xmlns:b="http://schemas.xmlsoap.org/ws/2004/08/addressing"><a:Header><b:RelatesTo>{}</b:RelatesTo><b:Action>{}</b:Action></a:Header><a:Body>{}</a:Body></a:Envelope>"#,
            relates_to, action, body
        )
        .into_bytes()
    }

    #[test]
    fn test_get_singleton() {
        let client = Client::new(
            ClientConfig::default(),
            from_fn(|_: &[u8]| {
                Ok(reply(
                    "http://schemas.xmlsoap.org/ws/2004/09/transfer/GetResponse",
                    "0",
                    &format!(r#"<g:AMT_GeneralSettings xmlns:g="{}"><g:HostName>nuc</g:HostName></g:AMT_GeneralSettings>"#, URI),
                ))
            }),
        );
        let settings: Element = client.get(URI, None).unwrap();
        assert_eq!(settings.child_text("HostName"), Some("nuc"));
    }

    #[test]
    fn test_relates_to_mismatch() {
        let client = Client::new(
            ClientConfig::default(),
            from_fn(|_: &[u8]| {
                Ok(reply(
                    "http://schemas.xmlsoap.org/ws/2004/09/transfer/GetResponse",
                    "41",
                    "<x/>",
                ))
            }),
        );
        let err = client.get::<Element>(URI, None).unwrap_err();
        assert!(matches!(err, WsmanError::RelatesToMismatch { .. }));
    }

    #[test]
    fn test_unexpected_action() {
        let client = Client::new(
            ClientConfig::default(),
            from_fn(|_: &[u8]| {
                Ok(reply(
                    "http://schemas.xmlsoap.org/ws/2004/09/transfer/PutResponse",
                    "0",
                    "<x/>",
                ))
            }),
        );
        let err = client.get::<Element>(URI, None).unwrap_err();
        assert!(matches!(err, WsmanError::UnexpectedAction { .. }));
    }

    #[test]
    fn test_transport_error_is_surfaced() {
        let client = Client::new(
            ClientConfig::default(),
            from_fn(|_: &[u8]| Err(TransportError::Status { code: 401, body: String::new() })),
        );
        let err = client.enumerate(URI).unwrap_err();
        assert!(matches!(err, WsmanError::Transport(TransportError::Status { code: 401, .. })));
    }

    #[test]
    fn test_request_state_change_failure_is_data() {
        let uri = "http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_KVMRedirectionSAP";
        let client = Client::new(
            ClientConfig::default(),
            from_fn(move |_: &[u8]| {
                Ok(reply(
                    &format!("{}/RequestStateChangeResponse", uri),
                    "0",
                    &format!(r#"<g:RequestStateChange_OUTPUT xmlns:g="{}"><g:ReturnValue>2</g:ReturnValue></g:RequestStateChange_OUTPUT>"#, uri),
                ))
            }),
        );
        let res = client.request_state_change(uri, 3).unwrap();
        assert_eq!(res.outcome, crate::Outcome::Failure(2));
        assert!(res.outcome.into_result("RequestStateChange").is_err());
    }

    #[test]
    fn test_request_state_change_matches_builder() {
        let uri = "http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_KVMRedirectionSAP";
        let sent = std::cell::RefCell::new(String::new());
        let client = Client::new(
            ClientConfig::default(),
            from_fn(|req: &[u8]| {
                *sent.borrow_mut() = String::from_utf8_lossy(req).into_owned();
                Ok(reply(
                    &format!("{}/RequestStateChangeResponse", uri),
                    "0",
                    &format!(r#"<g:RequestStateChange_OUTPUT xmlns:g="{}"><g:ReturnValue>0</g:ReturnValue></g:RequestStateChange_OUTPUT>"#, uri),
                ))
            }),
        );
        let res = client.request_state_change(uri, 3).unwrap();
        assert_eq!(res.method, "RequestStateChange");
        assert!(res.outcome.is_success());

        let expected = Session::default().resource(uri).request_state_change(3);
        assert_eq!(sent.borrow().as_str(), expected.as_str());
    }
}
