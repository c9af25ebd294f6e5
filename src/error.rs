//! Error types for the WS-Management client.

use thiserror::Error;

/// Errors surfaced by the message layer.
#[derive(Error, Debug)]
pub enum WsmanError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("XML parsing error: {0}")]
    Xml(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Fault(Fault),

    #[error("unexpected response action: expected {expected}, got {actual}")]
    UnexpectedAction { expected: String, actual: String },

    #[error("response relates to message {actual}, expected {expected}")]
    RelatesToMismatch { expected: String, actual: String },

    #[error("enumeration cursor failed earlier; start a new enumeration")]
    CursorFailed,

    #[error("enumeration context already exhausted")]
    CursorExhausted,

    #[error("{method} returned {code} ({name})")]
    ReturnValue {
        method: String,
        code: u32,
        name: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WsmanError {
    /// The fault kind, when this error is a SOAP fault.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Fault(fault) => Some(fault.kind),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for WsmanError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

/// Result type alias using WsmanError.
pub type Result<T> = std::result::Result<T, WsmanError>;

/// Failures reported by a [`Transport`](crate::transport::Transport).
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("{0}")]
    Other(String),
}

/// Well-known fault subcodes returned by WS-Management services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The enumeration context expired or was never valid
    InvalidEnumerationContext,
    /// The operation did not complete within OperationTimeout
    TimedOut,
    /// No resource matches the ResourceURI or selectors
    DestinationUnreachable,
    /// The action is not supported by the resource
    ActionNotSupported,
    /// Selectors are missing, unknown or malformed
    InvalidSelectors,
    /// The caller is not authorized
    AccessDenied,
    /// The body failed schema validation
    SchemaValidationError,
    /// A size or count limit was exceeded
    EncodingLimit,
    /// The service failed internally
    InternalError,
    /// Anything else
    Other,
}

impl FaultKind {
    /// Classify a subcode value such as `wsen:InvalidEnumerationContext`.
    pub fn from_subcode(subcode: &str) -> Self {
        let local = subcode.rsplit(':').next().unwrap_or(subcode);
        match local {
            "InvalidEnumerationContext" => Self::InvalidEnumerationContext,
            "TimedOut" => Self::TimedOut,
            "DestinationUnreachable" => Self::DestinationUnreachable,
            "ActionNotSupported" => Self::ActionNotSupported,
            "InvalidSelectors" => Self::InvalidSelectors,
            "AccessDenied" => Self::AccessDenied,
            "SchemaValidationError" => Self::SchemaValidationError,
            "EncodingLimit" => Self::EncodingLimit,
            "InternalError" => Self::InternalError,
            _ => Self::Other,
        }
    }

    /// Get the string code for this fault kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidEnumerationContext => "INVALID_ENUMERATION_CONTEXT",
            Self::TimedOut => "TIMED_OUT",
            Self::DestinationUnreachable => "DESTINATION_UNREACHABLE",
            Self::ActionNotSupported => "ACTION_NOT_SUPPORTED",
            Self::InvalidSelectors => "INVALID_SELECTORS",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::SchemaValidationError => "SCHEMA_VALIDATION_ERROR",
            Self::EncodingLimit => "ENCODING_LIMIT",
            Self::InternalError => "INTERNAL_ERROR",
            Self::Other => "OTHER",
        }
    }
}

/// A SOAP 1.2 fault returned in place of a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Classified subcode
    pub kind: FaultKind,
    /// Code/Value, e.g. `s:Sender`
    pub code: String,
    /// Subcode/Value, if present
    pub subcode: Option<String>,
    /// Reason/Text
    pub reason: String,
    /// Flattened Detail text, if present
    pub detail: Option<String>,
}

impl Fault {
    /// Create a fault, classifying its subcode.
    pub fn new(code: impl Into<String>, subcode: Option<String>, reason: impl Into<String>) -> Self {
        let kind = subcode
            .as_deref()
            .map(FaultKind::from_subcode)
            .unwrap_or(FaultKind::Other);
        Self {
            kind,
            code: code.into(),
            subcode,
            reason: reason.into(),
            detail: None,
        }
    }

    /// Attach detail text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SOAP fault [{}] {}", self.kind.as_str(), self.code)?;
        if let Some(subcode) = &self.subcode {
            write!(f, "/{}", subcode)?;
        }
        write!(f, ": {}", self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_kind_from_subcode() {
        assert_eq!(
            FaultKind::from_subcode("wsen:InvalidEnumerationContext"),
            FaultKind::InvalidEnumerationContext
        );
        assert_eq!(FaultKind::from_subcode("w:TimedOut"), FaultKind::TimedOut);
        assert_eq!(FaultKind::from_subcode("DestinationUnreachable"), FaultKind::DestinationUnreachable);
        assert_eq!(FaultKind::from_subcode("x:Whatever"), FaultKind::Other);
    }

    #[test]
    fn test_fault_kind_as_str() {
        assert_eq!(FaultKind::InvalidEnumerationContext.as_str(), "INVALID_ENUMERATION_CONTEXT");
        assert_eq!(FaultKind::AccessDenied.as_str(), "ACCESS_DENIED");
    }

    #[test]
    fn test_fault_display() {
        let fault = Fault::new(
            "s:Sender",
            Some("wsen:InvalidEnumerationContext".to_string()),
            "The enumeration context is not valid",
        );
        let text = WsmanError::Fault(fault).to_string();
        assert!(text.contains("INVALID_ENUMERATION_CONTEXT"));
        assert!(text.contains("s:Sender/wsen:InvalidEnumerationContext"));
    }

    #[test]
    fn test_fault_without_subcode_is_other() {
        let fault = Fault::new("s:Receiver", None, "boom");
        assert_eq!(fault.kind, FaultKind::Other);
        assert!(WsmanError::Fault(fault).fault_kind().is_some());
    }

    #[test]
    fn test_transport_error_wraps() {
        let err: WsmanError = TransportError::Status {
            code: 401,
            body: "Unauthorized".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "transport error: HTTP status 401: Unauthorized");
    }
}
