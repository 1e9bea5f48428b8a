//! Inbound dance envelope and status codes

use holons_core::{
    Holon, HolonCollection, HolonError, HolonReference, MapString, NodeCollection, SessionState,
    SpaceId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a dance, modelled on HTTP status classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseStatusCode {
    /// 200
    OK,
    /// 202
    Accepted,
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// 422
    UnprocessableEntity,
    /// 500
    ServerError,
    /// 501
    NotImplemented,
    /// 503
    ServiceUnavailable,
}

impl ResponseStatusCode {
    /// Check if the dance succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseStatusCode::OK | ResponseStatusCode::Accepted)
    }

    /// Numeric HTTP equivalent
    pub fn http_code(&self) -> u16 {
        match self {
            ResponseStatusCode::OK => 200,
            ResponseStatusCode::Accepted => 202,
            ResponseStatusCode::BadRequest => 400,
            ResponseStatusCode::Unauthorized => 401,
            ResponseStatusCode::Forbidden => 403,
            ResponseStatusCode::NotFound => 404,
            ResponseStatusCode::Conflict => 409,
            ResponseStatusCode::UnprocessableEntity => 422,
            ResponseStatusCode::ServerError => 500,
            ResponseStatusCode::NotImplemented => 501,
            ResponseStatusCode::ServiceUnavailable => 503,
        }
    }

    /// Reason phrase
    pub fn reason(&self) -> &'static str {
        match self {
            ResponseStatusCode::OK => "OK",
            ResponseStatusCode::Accepted => "Accepted",
            ResponseStatusCode::BadRequest => "Bad Request",
            ResponseStatusCode::Unauthorized => "Unauthorized",
            ResponseStatusCode::Forbidden => "Forbidden",
            ResponseStatusCode::NotFound => "Not Found",
            ResponseStatusCode::Conflict => "Conflict",
            ResponseStatusCode::UnprocessableEntity => "Unprocessable Entity",
            ResponseStatusCode::ServerError => "Server Error",
            ResponseStatusCode::NotImplemented => "Not Implemented",
            ResponseStatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }
}

impl fmt::Display for ResponseStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.http_code(), self.reason())
    }
}

impl From<&HolonError> for ResponseStatusCode {
    fn from(error: &HolonError) -> Self {
        match error {
            HolonError::HolonNotFound(_) => ResponseStatusCode::NotFound,

            HolonError::DuplicateError(..)
            | HolonError::DeletionNotAllowed(_)
            | HolonError::NotAccessible { .. }
            | HolonError::CrossTransactionReference { .. } => ResponseStatusCode::Conflict,

            HolonError::InvalidParameter(_)
            | HolonError::EmptyField(_)
            | HolonError::InvalidHolonReference(_)
            | HolonError::InvalidWireFormat(_) => ResponseStatusCode::BadRequest,

            HolonError::ValidationError(_) => ResponseStatusCode::UnprocessableEntity,
            HolonError::NotImplemented(_) => ResponseStatusCode::NotImplemented,
            HolonError::ServiceNotAvailable(_) => ResponseStatusCode::ServiceUnavailable,

            HolonError::InvalidTransition(_)
            | HolonError::CommitFailure(_)
            | HolonError::Misc(_) => ResponseStatusCode::ServerError,
        }
    }
}

/// Result payload of a dance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseBody {
    /// No payload
    None,
    /// One holon
    Holon(Holon),
    /// Several holons, e.g. the result of a commit
    Holons(Vec<Holon>),
    /// References, e.g. the result of a bulk read
    HolonCollection(HolonCollection),
    /// One reference, e.g. to a newly staged holon
    HolonReference(HolonReference),
    /// Result of a relationship query
    NodeCollection(NodeCollection),
}

impl ResponseBody {
    /// Variant name, for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseBody::None => "None",
            ResponseBody::Holon(_) => "Holon",
            ResponseBody::Holons(_) => "Holons",
            ResponseBody::HolonCollection(_) => "HolonCollection",
            ResponseBody::HolonReference(_) => "HolonReference",
            ResponseBody::NodeCollection(_) => "NodeCollection",
        }
    }

    /// Short description for logs
    pub fn summarize(&self) -> String {
        match self {
            ResponseBody::None => "None".to_string(),
            ResponseBody::Holon(holon) => holon.summarize(),
            ResponseBody::Holons(holons) => {
                let items: Vec<String> = holons.iter().map(Holon::summarize).collect();
                format!("Holons[{}]", items.join(", "))
            }
            ResponseBody::HolonCollection(collection) => {
                format!("HolonCollection({} members)", collection.len())
            }
            ResponseBody::HolonReference(reference) => format!("{:?}", reference),
            ResponseBody::NodeCollection(nodes) => {
                format!("NodeCollection({} members)", nodes.members.len())
            }
        }
    }
}

/// Inbound envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanceResponse {
    /// Space that answered
    pub space_id: SpaceId,
    /// Outcome
    pub status_code: ResponseStatusCode,
    /// Human-readable outcome
    pub description: MapString,
    /// Result payload
    pub body: ResponseBody,
    /// Descriptor of the dance that ran
    pub descriptor: Option<HolonReference>,
    /// Authoritative pools after the dance
    pub session_snapshot: Option<SessionState>,
}

impl DanceResponse {
    /// A successful response
    pub fn ok(space_id: SpaceId, body: ResponseBody, session_snapshot: SessionState) -> Self {
        DanceResponse {
            space_id,
            status_code: ResponseStatusCode::OK,
            description: MapString::from("Success"),
            body,
            descriptor: None,
            session_snapshot: Some(session_snapshot),
        }
    }

    /// A failed response carrying `error`'s status and message
    pub fn from_error(space_id: SpaceId, error: HolonError) -> Self {
        DanceResponse {
            space_id,
            status_code: ResponseStatusCode::from(&error),
            description: MapString(error.to_string()),
            body: ResponseBody::None,
            descriptor: None,
            session_snapshot: None,
        }
    }

    /// Overwrite status and description with `error`'s, keeping body and snapshot
    pub fn annotate_error(&mut self, error: HolonError) {
        self.status_code = ResponseStatusCode::from(&error);
        self.description = MapString(error.to_string());
    }

    /// One-line description for logs
    pub fn summarize(&self) -> String {
        format!(
            "DanceResponse {{ status: {}, description: {}, body: {}, snapshot: {} }}",
            self.status_code,
            self.description,
            self.body.summarize(),
            self.session_snapshot
                .as_ref()
                .map(SessionState::summarize)
                .unwrap_or_else(|| "None".to_string())
        )
    }
}
