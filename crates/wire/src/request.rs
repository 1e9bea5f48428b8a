//! Outbound dance envelope

use holons_core::{
    Holon, HolonId, HolonReference, LocalId, MapString, NodeCollection, PropertyMap,
    QueryExpression, RelationshipName, SessionState, SpaceId, StagedReference,
    TransientReference, TxId,
};
use serde::{Deserialize, Serialize};

/// How a dance relates to its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DanceType {
    /// No target holon ("get all", "commit all")
    Standalone,
    /// Read relationships from the given source nodes
    QueryMethod(NodeCollection),
    /// Mutate one staged holon
    CommandMethod(StagedReference),
    /// Stage a copy of the referenced holon
    CloneMethod(HolonReference),
    /// Stage a successor of a persisted holon
    NewVersionMethod(HolonId),
    /// Delete a persisted holon
    DeleteMethod(LocalId),
}

impl DanceType {
    /// Variant name, for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            DanceType::Standalone => "Standalone",
            DanceType::QueryMethod(_) => "QueryMethod",
            DanceType::CommandMethod(_) => "CommandMethod",
            DanceType::CloneMethod(_) => "CloneMethod",
            DanceType::NewVersionMethod(_) => "NewVersionMethod",
            DanceType::DeleteMethod(_) => "DeleteMethod",
        }
    }
}

/// One file of holon content to load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileData {
    /// Source file name
    pub filename: String,
    /// Raw file contents
    pub raw_contents: String,
}

/// Bulk holon content, validated against `schema` by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSet {
    /// Schema the files are validated against
    pub schema: Option<HolonReference>,
    /// Files to load
    pub files_to_load: Vec<FileData>,
}

/// Payload of a dance request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestBody {
    /// No payload
    None,
    /// A full holon
    Holon(Holon),
    /// Relationship and the references to add or remove
    TargetHolons(RelationshipName, Vec<HolonReference>),
    /// A transient pool member
    TransientReference(TransientReference),
    /// A persisted holon
    HolonId(HolonId),
    /// Property values
    ParameterValues(PropertyMap),
    /// A staged pool member
    StagedRef(StagedReference),
    /// Relationship to query
    QueryExpression(QueryExpression),
    /// Content to bulk-load
    LoadHolons(ContentSet),
}

impl RequestBody {
    /// Variant name, for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestBody::None => "None",
            RequestBody::Holon(_) => "Holon",
            RequestBody::TargetHolons(..) => "TargetHolons",
            RequestBody::TransientReference(_) => "TransientReference",
            RequestBody::HolonId(_) => "HolonId",
            RequestBody::ParameterValues(_) => "ParameterValues",
            RequestBody::StagedRef(_) => "StagedRef",
            RequestBody::QueryExpression(_) => "QueryExpression",
            RequestBody::LoadHolons(_) => "LoadHolons",
        }
    }
}

/// Transaction scope and pool snapshot a request runs against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Transaction
    pub tx_id: TxId,
    /// Space the dance targets
    pub space_reference: SpaceId,
    /// Pools as the client last saw them
    pub state: SessionState,
}

/// Immutable outbound envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanceRequest {
    /// Dance name, e.g. `"stage_new_holon"`
    pub name: MapString,
    /// Relation to the target
    pub operation_kind: DanceType,
    /// Payload
    pub body: RequestBody,
    /// Transaction scope
    pub session_context: SessionContext,
}

impl DanceRequest {
    /// Assemble a request against `state`
    pub fn new(
        name: impl Into<MapString>,
        operation_kind: DanceType,
        body: RequestBody,
        space_reference: SpaceId,
        state: SessionState,
    ) -> Self {
        DanceRequest {
            name: name.into(),
            operation_kind,
            body,
            session_context: SessionContext {
                tx_id: state.tx_id,
                space_reference,
                state,
            },
        }
    }

    /// One-line description for logs
    pub fn summarize(&self) -> String {
        format!(
            "DanceRequest {{ name: {}, kind: {}, body: {}, {} }}",
            self.name,
            self.operation_kind.as_str(),
            self.body.as_str(),
            self.session_context.state.summarize()
        )
    }
}
