use ghostmap_core::{
    GhostActivity, NewProject, NewRecommendation, NewStatus, ProjectSummary, ProjectTreeEntry,
    SessionSummary, StatusUpdate, TimelinePayload, VisualMap,
};

use crate::graph::model::EntityId;
use crate::net::http::FetchError;

/// One in-flight fetch per slot; a newer fetch supersedes the older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchSlot {
    Projects,
    VisualMap,
    Tree,
    Sessions,
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchKind {
    Projects,
    VisualMap(EntityId),
    Tree,
    Sessions(EntityId),
    Timeline(EntityId),
}

impl FetchKind {
    pub fn slot(&self) -> FetchSlot {
        match self {
            FetchKind::Projects => FetchSlot::Projects,
            FetchKind::VisualMap(_) => FetchSlot::VisualMap,
            FetchKind::Tree => FetchSlot::Tree,
            FetchKind::Sessions(_) => FetchSlot::Sessions,
            FetchKind::Timeline(_) => FetchSlot::Timeline,
        }
    }

    pub fn path(&self) -> String {
        match self {
            FetchKind::Projects => "/api/projects".to_string(),
            FetchKind::VisualMap(id) => format!("/api/projects/{id}/visual-map"),
            FetchKind::Tree => "/api/projects/tree".to_string(),
            FetchKind::Sessions(id) => format!("/api/projects/{id}/sessions"),
            FetchKind::Timeline(id) => format!("/api/sessions/{id}/timeline"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: u64,
    pub kind: FetchKind,
}

#[derive(Debug, Clone)]
pub enum FetchPayload {
    Projects(Vec<ProjectSummary>),
    VisualMap(VisualMap),
    Tree(Vec<ProjectTreeEntry>),
    Sessions(Vec<SessionSummary>),
    Timeline(TimelinePayload),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddStatus { endpoint: EntityId, body: NewStatus },
    UpdateStatus { status: EntityId, body: StatusUpdate },
    AddRecommendation { target: EntityId, body: NewRecommendation },
    CreateProject(NewProject),
}

impl Mutation {
    pub fn describe(&self) -> &'static str {
        match self {
            Mutation::AddStatus { .. } => "add status",
            Mutation::UpdateStatus { .. } => "update status",
            Mutation::AddRecommendation { .. } => "add recommendation",
            Mutation::CreateProject(_) => "create project",
        }
    }

    pub fn creates_project(&self) -> bool {
        matches!(self, Mutation::CreateProject(_))
    }
}

/// Work the controller asks the network side to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch(FetchRequest),
    Cancel(FetchSlot),
    Mutate(Mutation),
}

#[derive(Debug, Clone)]
pub enum Incoming {
    Fetched {
        slot: FetchSlot,
        ticket: u64,
        result: Result<FetchPayload, FetchError>,
    },
    Mutated {
        mutation: Mutation,
        result: Result<(), FetchError>,
    },
    Ghost(Result<GhostActivity, FetchError>),
    Tick {
        generation: u64,
    },
}

impl Incoming {
    pub fn fetched(req: &FetchRequest, result: Result<FetchPayload, FetchError>) -> Self {
        Self::Fetched {
            slot: req.kind.slot(),
            ticket: req.ticket,
            result,
        }
    }
}
