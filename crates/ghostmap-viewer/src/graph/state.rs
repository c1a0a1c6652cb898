use ghostmap_core::{GhostActivity, SessionSummary};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::graph::filter::{filter_tree, FilterCriteria, FilteredView, MethodFilter, StatusFilter};
use crate::graph::focus::FocusBridge;
use crate::graph::layout::{layout, Layout, LayoutStrategyKind};
use crate::graph::model::{CanonicalTree, Endpoint, EntityId, NodeKey, NodeKind, Project, Target};
use crate::graph::normalize::{
    method_options, normalize_project_tree, normalize_visual_map, project_summary,
    target_options, TargetOption,
};
use crate::graph::timeline::{Activity, PlaybackEngine, PlaybackSpeed, TickScheduler};
use crate::net::http::FetchError;
use crate::net::protocol::{Effect, FetchKind, FetchPayload, FetchRequest, FetchSlot, Incoming, Mutation};
use crate::util::config::ViewerConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub id: EntityId,
    pub label: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
}

impl SessionEntry {
    fn from_payload(raw: &SessionSummary, position: usize) -> Self {
        let id = raw
            .id
            .as_ref()
            .map(EntityId::from)
            .unwrap_or_else(|| EntityId(format!("s{position}")));
        let label = raw
            .label
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| format!("Session #{id}"));
        Self {
            id,
            label,
            started_at: raw.started_at.clone(),
            ended_at: raw.ended_at.clone(),
        }
    }
}

/// Last answer from the live ghost poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GhostStatus {
    pub activity: String,
    pub target: String,
    pub status: String,
}

impl Default for GhostStatus {
    fn default() -> Self {
        Self {
            activity: "Idle".to_string(),
            target: String::new(),
            status: "waiting".to_string(),
        }
    }
}

impl From<GhostActivity> for GhostStatus {
    fn from(raw: GhostActivity) -> Self {
        let fallback = GhostStatus::default();
        Self {
            activity: raw
                .activity
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback.activity),
            target: raw.target.unwrap_or_default(),
            status: raw
                .status
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback.status),
        }
    }
}

#[derive(Debug, Default)]
pub struct DataState {
    pub projects: Vec<Project>,
    /// Unfiltered visual map of the selected project.
    pub map: CanonicalTree,
    pub map_project: Option<EntityId>,
    /// Unfiltered tree of every project.
    pub scope: CanonicalTree,
    pub sessions: Vec<SessionEntry>,
    pub target_options: Vec<TargetOption>,
    pub method_options: Vec<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct UiState {
    pub project: Option<EntityId>,
    pub session: Option<EntityId>,
    pub criteria: FilterCriteria,
    pub strategy: LayoutStrategyKind,
    pub show_all_projects: bool,
}

#[derive(Debug, Default)]
pub struct ViewState {
    pub filtered: FilteredView,
    pub layout: Layout,
    /// Bumped whenever `layout` is rebuilt.
    pub revision: u64,
}

#[derive(Debug, Default)]
pub struct CfgState {
    pub auto_play: bool,
}

/// Per-slot fetch tickets. Only the most recent ticket of a slot is live.
#[derive(Debug, Default)]
pub struct Tickets {
    next: u64,
    live: HashMap<FetchSlot, u64>,
}

impl Tickets {
    pub fn issue(&mut self, slot: FetchSlot) -> u64 {
        self.next += 1;
        self.live.insert(slot, self.next);
        self.next
    }

    /// Consumes the live ticket when it matches.
    pub fn accept(&mut self, slot: FetchSlot, ticket: u64) -> bool {
        if self.live.get(&slot) == Some(&ticket) {
            self.live.remove(&slot);
            true
        } else {
            false
        }
    }

    pub fn revoke(&mut self, slot: FetchSlot) {
        self.live.remove(&slot);
    }

    pub fn in_flight(&self, slot: FetchSlot) -> bool {
        self.live.contains_key(&slot)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Refresh,
    SetProject(Option<EntityId>),
    SetSearch(String),
    SetTargetFilter(Option<EntityId>),
    SetMethodFilter(MethodFilter),
    SetStatusFilter(StatusFilter),
    SetStrategy(LayoutStrategyKind),
    ShowAllProjects(bool),
    SelectNode(Option<NodeKey>),
    ToggleExpanded(NodeKey),
    SelectSession(EntityId),
    Play,
    Pause,
    TogglePlay,
    SetSpeed(PlaybackSpeed),
    Seek(i64),
    SkipToFinding,
    Mutate(Mutation),
    Teardown,
}

/// The single owner of viewer state. Every change goes through `update` or
/// `apply`; both return the network work the change requires.
#[derive(Debug)]
pub struct AppState<S: TickScheduler> {
    pub data: DataState,
    pub ui: UiState,
    pub view: ViewState,
    pub playback: PlaybackEngine<S>,
    pub focus: FocusBridge,
    pub ghost: GhostStatus,
    pub cfg: CfgState,
    tickets: Tickets,
}

impl<S: TickScheduler> AppState<S> {
    pub fn new(scheduler: S) -> Self {
        let mut st = Self {
            data: DataState::default(),
            ui: UiState::default(),
            view: ViewState::default(),
            playback: PlaybackEngine::new(scheduler, PlaybackSpeed::default()),
            focus: FocusBridge::default(),
            ghost: GhostStatus::default(),
            cfg: CfgState::default(),
            tickets: Tickets::default(),
        };
        st.recompute();
        st
    }

    pub fn apply_viewer_config(&mut self, cfg: &ViewerConfig) {
        self.ui.strategy = cfg.default_strategy;
        self.playback.set_speed(cfg.default_speed);
        self.cfg.auto_play = cfg.auto_play;
        self.recompute();
    }

    pub fn tickets(&self) -> &Tickets {
        &self.tickets
    }

    pub fn is_loading(&self, slot: FetchSlot) -> bool {
        self.tickets.in_flight(slot)
    }

    /// Unfiltered tree the view is derived from.
    pub fn source_tree(&self) -> &CanonicalTree {
        if self.ui.show_all_projects {
            &self.data.scope
        } else {
            &self.data.map
        }
    }

    pub fn selected_endpoint(&self) -> Option<&Endpoint> {
        let key = self.focus.selected()?;
        let (_, id) = key.as_str().split_once(':')?;
        match key.kind()? {
            NodeKind::Endpoint => self.source_tree().find_endpoint(&EntityId::from(id)),
            _ => None,
        }
    }

    pub fn selected_target(&self) -> Option<&Target> {
        let key = self.focus.selected()?;
        let tree = self.source_tree();
        match key.kind()? {
            NodeKind::Target => tree.targets().find(|t| &t.key() == key),
            NodeKind::Endpoint => {
                let url = tree.index().parent(key)?;
                let target = tree.index().parent(url)?;
                tree.targets().find(|t| &t.key() == target)
            }
            NodeKind::Url => {
                let target = tree.index().parent(key)?;
                tree.targets().find(|t| &t.key() == target)
            }
            NodeKind::Project => None,
        }
    }

    /// Target whose hostname the live ghost reports.
    pub fn ghost_target(&self) -> Option<NodeKey> {
        let host = self.ghost.target.trim();
        if host.is_empty() {
            return None;
        }
        self.source_tree()
            .targets()
            .find(|t| t.hostname.eq_ignore_ascii_case(host))
            .map(Target::key)
    }

    fn fetch(&mut self, kind: FetchKind) -> Effect {
        let ticket = self.tickets.issue(kind.slot());
        Effect::Fetch(FetchRequest { ticket, kind })
    }

    fn cancel(&mut self, slot: FetchSlot) -> Effect {
        self.tickets.revoke(slot);
        Effect::Cancel(slot)
    }

    fn recompute(&mut self) {
        let source = if self.ui.show_all_projects {
            &self.data.scope
        } else {
            &self.data.map
        };
        self.view.filtered = filter_tree(source, &self.ui.criteria);
        self.view.layout = layout(&self.view.filtered.tree, self.ui.strategy);
        self.view.revision += 1;
        self.sync_focus();
    }

    fn refresh_options(&mut self) {
        let source = if self.ui.show_all_projects {
            &self.data.scope
        } else {
            &self.data.map
        };
        self.data.target_options = target_options(source);
        self.data.method_options = method_options(source);
    }

    /// Resolves the playback focus against what is on screen, so a filtered
    /// out entity falls back to the status line.
    fn sync_focus(&mut self) {
        self.focus
            .apply_activity(self.playback.current(), self.view.filtered.tree.index());
    }

    fn end_session(&mut self) {
        self.ui.session = None;
        self.playback.teardown();
        self.sync_focus();
    }

    pub fn update(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::Refresh => {
                let mut out = vec![self.fetch(FetchKind::Projects), self.fetch(FetchKind::Tree)];
                if let Some(id) = self.ui.project.clone() {
                    out.push(self.fetch(FetchKind::VisualMap(id.clone())));
                    out.push(self.fetch(FetchKind::Sessions(id)));
                }
                out
            }
            Action::SetProject(id) => self.set_project(id),
            Action::SetSearch(q) => {
                self.ui.criteria.search = q;
                self.recompute();
                Vec::new()
            }
            Action::SetTargetFilter(t) => {
                self.ui.criteria.target = t;
                self.recompute();
                Vec::new()
            }
            Action::SetMethodFilter(m) => {
                self.ui.criteria.method = m;
                self.recompute();
                Vec::new()
            }
            Action::SetStatusFilter(s) => {
                self.ui.criteria.status = s;
                self.recompute();
                Vec::new()
            }
            Action::SetStrategy(kind) => {
                if self.ui.strategy != kind {
                    self.ui.strategy = kind;
                    self.view.layout = layout(&self.view.filtered.tree, kind);
                    self.view.revision += 1;
                }
                Vec::new()
            }
            Action::ShowAllProjects(on) => {
                if self.ui.show_all_projects != on {
                    self.ui.show_all_projects = on;
                    self.ui.criteria.target = None;
                    self.refresh_options();
                    self.recompute();
                }
                Vec::new()
            }
            Action::SelectNode(key) => {
                self.focus.select(key);
                Vec::new()
            }
            Action::ToggleExpanded(key) => {
                self.focus.toggle_expanded(&key);
                Vec::new()
            }
            Action::SelectSession(id) => {
                if self.ui.session.as_ref() == Some(&id) && self.playback.session() == Some(&id) {
                    return Vec::new();
                }
                self.ui.session = Some(id.clone());
                self.playback.teardown();
                self.sync_focus();
                vec![self.fetch(FetchKind::Timeline(id))]
            }
            Action::Play => {
                self.playback.play();
                Vec::new()
            }
            Action::Pause => {
                self.playback.pause();
                Vec::new()
            }
            Action::TogglePlay => {
                self.playback.toggle();
                Vec::new()
            }
            Action::SetSpeed(speed) => {
                self.playback.set_speed(speed);
                Vec::new()
            }
            Action::Seek(i) => {
                if self.playback.seek(i).is_some() {
                    self.sync_focus();
                }
                Vec::new()
            }
            Action::SkipToFinding => {
                if self.playback.skip_to_next_finding().is_some() {
                    self.sync_focus();
                }
                Vec::new()
            }
            Action::Mutate(m) => vec![Effect::Mutate(m)],
            Action::Teardown => {
                self.playback.teardown();
                [
                    FetchSlot::Projects,
                    FetchSlot::VisualMap,
                    FetchSlot::Tree,
                    FetchSlot::Sessions,
                    FetchSlot::Timeline,
                ]
                .into_iter()
                .map(|slot| self.cancel(slot))
                .collect()
            }
        }
    }

    fn set_project(&mut self, id: Option<EntityId>) -> Vec<Effect> {
        if self.ui.project == id {
            return Vec::new();
        }
        info!(project = ?id.as_ref().map(EntityId::as_str), "project selected");
        self.ui.project = id.clone();
        self.ui.criteria.reset_selectors();
        self.focus.select(None);
        self.data.map = CanonicalTree::default();
        self.data.map_project = None;
        self.data.sessions.clear();
        self.end_session();
        self.refresh_options();
        self.recompute();

        match id {
            Some(id) => vec![
                self.cancel(FetchSlot::Timeline),
                self.fetch(FetchKind::VisualMap(id.clone())),
                self.fetch(FetchKind::Sessions(id)),
            ],
            None => vec![
                self.cancel(FetchSlot::VisualMap),
                self.cancel(FetchSlot::Sessions),
                self.cancel(FetchSlot::Timeline),
            ],
        }
    }

    pub fn apply(&mut self, inc: Incoming) -> Vec<Effect> {
        match inc {
            Incoming::Fetched {
                slot,
                ticket,
                result,
            } => {
                if !self.tickets.accept(slot, ticket) {
                    debug!(?slot, ticket, "dropping stale response");
                    return Vec::new();
                }
                match result {
                    Ok(payload) => {
                        self.data.last_error = None;
                        self.on_payload(payload)
                    }
                    Err(FetchError::Cancelled) => Vec::new(),
                    Err(e) => {
                        self.on_fetch_error(slot, e);
                        Vec::new()
                    }
                }
            }
            Incoming::Mutated { mutation, result } => match result {
                Ok(()) => {
                    info!(mutation = mutation.describe(), "mutation applied");
                    let mut out = vec![self.fetch(FetchKind::Tree)];
                    if let Some(id) = self.ui.project.clone() {
                        out.push(self.fetch(FetchKind::VisualMap(id)));
                    }
                    if mutation.creates_project() {
                        out.push(self.fetch(FetchKind::Projects));
                    }
                    out
                }
                Err(e) => {
                    warn!(mutation = mutation.describe(), error = %e, "mutation failed");
                    self.data.last_error = Some(format!("{} failed: {e}", mutation.describe()));
                    Vec::new()
                }
            },
            Incoming::Ghost(Ok(activity)) => {
                self.ghost = GhostStatus::from(activity);
                Vec::new()
            }
            Incoming::Ghost(Err(e)) => {
                debug!(error = %e, "ghost poll failed");
                Vec::new()
            }
            Incoming::Tick { generation } => {
                if self.playback.on_tick(generation).is_some() {
                    self.sync_focus();
                }
                Vec::new()
            }
        }
    }

    fn on_fetch_error(&mut self, slot: FetchSlot, e: FetchError) {
        warn!(?slot, error = %e, "fetch failed");
        self.data.last_error = Some(e.to_string());
        match slot {
            FetchSlot::VisualMap => {
                self.data.map = CanonicalTree::default();
                self.data.map_project = None;
                self.refresh_options();
                self.focus.retain_known(self.data.map.index());
                self.recompute();
            }
            FetchSlot::Sessions => {
                self.data.sessions.clear();
                self.end_session();
            }
            FetchSlot::Timeline => self.end_session(),
            FetchSlot::Projects | FetchSlot::Tree => {}
        }
    }

    fn on_payload(&mut self, payload: FetchPayload) -> Vec<Effect> {
        match payload {
            FetchPayload::Projects(list) => {
                self.data.projects = list
                    .iter()
                    .enumerate()
                    .map(|(i, p)| project_summary(p, i))
                    .collect();
                info!(count = self.data.projects.len(), "projects loaded");
                if self.ui.project.is_none() {
                    if let Some(id) = self.data.projects.first().map(|p| p.id.clone()) {
                        return self.set_project(Some(id));
                    }
                }
                Vec::new()
            }
            FetchPayload::VisualMap(map) => {
                let Some(project) = self.ui.project.clone() else {
                    return Vec::new();
                };
                if self.data.map_project.as_ref() != Some(&project) {
                    self.ui.criteria.reset_selectors();
                    self.focus.select(None);
                }
                self.data.map = normalize_visual_map(&map);
                self.data.map_project = Some(project);
                info!(
                    targets = self.data.map.targets().count(),
                    endpoints = self.data.map.endpoints().count(),
                    "visual map loaded"
                );
                self.after_tree_change();
                Vec::new()
            }
            FetchPayload::Tree(entries) => {
                self.data.scope = normalize_project_tree(&entries);
                if self.ui.show_all_projects {
                    self.after_tree_change();
                }
                Vec::new()
            }
            FetchPayload::Sessions(list) => {
                self.data.sessions = list
                    .iter()
                    .enumerate()
                    .map(|(i, s)| SessionEntry::from_payload(s, i))
                    .collect();
                let keep = self
                    .ui
                    .session
                    .as_ref()
                    .filter(|cur| self.data.sessions.iter().any(|s| &s.id == *cur))
                    .cloned();
                match keep.or_else(|| self.data.sessions.first().map(|s| s.id.clone())) {
                    Some(id) => self.update(Action::SelectSession(id)),
                    None => {
                        self.end_session();
                        Vec::new()
                    }
                }
            }
            FetchPayload::Timeline(timeline) => {
                let Some(session) = self.ui.session.clone() else {
                    return Vec::new();
                };
                let activities: Vec<Activity> =
                    timeline.activities.iter().map(Activity::from_payload).collect();
                info!(session = %session, activities = activities.len(), "timeline loaded");
                self.playback.load(session, activities);
                self.sync_focus();
                if self.cfg.auto_play {
                    self.playback.play();
                }
                Vec::new()
            }
        }
    }

    fn after_tree_change(&mut self) {
        self.refresh_options();
        if let Some(t) = self.ui.criteria.target.clone() {
            if !self.data.target_options.iter().any(|o| o.id == t) {
                self.ui.criteria.target = None;
            }
        }
        let source = if self.ui.show_all_projects {
            &self.data.scope
        } else {
            &self.data.map
        };
        self.focus.retain_known(source.index());
        self.recompute();
    }
}
