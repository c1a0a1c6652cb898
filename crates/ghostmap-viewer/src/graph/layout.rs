use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::graph::model::{
    CanonicalTree, Endpoint, EntityId, HttpSnapshot, NodeKey, Target, TestStatus,
};
use crate::graph::tree::{
    column_gap, fan_offset, get_endpoint_path, get_path_group, METHOD_GAP, METHOD_Y_OFFSET,
    ROOT_X, ROOT_Y, ROUTE_VERTICAL_GAP, ROUTE_Y_OFFSET, TARGET_GAP, TARGET_Y, URL_GAP,
};

pub const ROOT_ID: &str = "root";
pub const PLACEHOLDER_LABEL: &str = "Select a project";

/// Endpoint fill by latest status.
pub const STATUS_COLORS: [(TestStatus, u32); 5] = [
    (TestStatus::Tested, 0x22c55e),
    (TestStatus::Planned, 0xeab308),
    (TestStatus::Recommended, 0xf97316),
    (TestStatus::Finding, 0xef4444),
    (TestStatus::Untested, 0x94a3b8),
];

pub fn status_color(status: TestStatus) -> u32 {
    STATUS_COLORS
        .iter()
        .find(|(s, _)| *s == status)
        .map(|(_, c)| *c)
        .unwrap_or(0x94a3b8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStrategyKind {
    DirectTree,
    #[default]
    PathGrouped,
    GlobalPathGrouped,
}

impl LayoutStrategyKind {
    pub const ALL: [LayoutStrategyKind; 3] = [
        LayoutStrategyKind::DirectTree,
        LayoutStrategyKind::PathGrouped,
        LayoutStrategyKind::GlobalPathGrouped,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "direct-tree" | "direct" => Some(LayoutStrategyKind::DirectTree),
            "path-grouped" | "grouped" => Some(LayoutStrategyKind::PathGrouped),
            "global-path-grouped" | "global" => Some(LayoutStrategyKind::GlobalPathGrouped),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayoutStrategyKind::DirectTree => "Direct tree",
            LayoutStrategyKind::PathGrouped => "Grouped by path",
            LayoutStrategyKind::GlobalPathGrouped => "Global path columns",
        }
    }
}

impl fmt::Display for LayoutStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNodeKind {
    Root {
        placeholder: bool,
    },
    Target {
        target: EntityId,
    },
    Url {
        target: EntityId,
        url: String,
    },
    Route {
        target: EntityId,
        group: String,
    },
    Endpoint {
        target: EntityId,
        endpoint: EntityId,
        status: TestStatus,
        method: String,
        url: String,
        snapshot: HttpSnapshot,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStyle {
    pub fill: u32,
    pub stroke: u32,
    pub width: u16,
}

impl NodeStyle {
    fn for_kind(kind: &LayoutNodeKind) -> Self {
        match kind {
            LayoutNodeKind::Root { .. } => NodeStyle {
                fill: 0xffffff,
                stroke: 0x0f766e,
                width: 180,
            },
            LayoutNodeKind::Target { .. } => NodeStyle {
                fill: 0xdbeafe,
                stroke: 0x2563eb,
                width: 220,
            },
            LayoutNodeKind::Url { .. } | LayoutNodeKind::Route { .. } => NodeStyle {
                fill: 0xe0f2fe,
                stroke: 0x0284c7,
                width: 260,
            },
            LayoutNodeKind::Endpoint { status, .. } => NodeStyle {
                fill: status_color(*status),
                stroke: 0xffffff,
                width: 92,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: String,
    pub label: String,
    pub position: Point,
    pub kind: LayoutNodeKind,
    pub style: NodeStyle,
}

impl LayoutNode {
    /// Canonical entity behind this node, if any. Route nodes have none.
    pub fn source_key(&self) -> Option<NodeKey> {
        match &self.kind {
            LayoutNodeKind::Root { .. } | LayoutNodeKind::Route { .. } => None,
            LayoutNodeKind::Target { target } => Some(NodeKey::target(target)),
            LayoutNodeKind::Url { target, url } => Some(NodeKey::url(target, url)),
            LayoutNodeKind::Endpoint { endpoint, .. } => Some(NodeKey::endpoint(endpoint)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

impl Layout {
    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_for_key(&self, key: &NodeKey) -> Option<&LayoutNode> {
        self.nodes
            .iter()
            .find(|n| n.source_key().as_ref() == Some(key))
    }

    /// Node ids from `id` up to the root, `id` first.
    pub fn path_to(&self, id: &str) -> Vec<String> {
        let parents: HashMap<&str, &str> = self
            .edges
            .iter()
            .map(|e| (e.target.as_str(), e.source.as_str()))
            .collect();
        let mut out = Vec::new();
        let mut cursor = self.node(id).map(|n| n.id.as_str());
        while let Some(cur) = cursor {
            if out.iter().any(|o: &String| o == cur) {
                break;
            }
            out.push(cur.to_string());
            cursor = parents.get(cur).copied();
        }
        out
    }
}

/// Accumulates nodes and edges for one layout pass.
#[derive(Debug, Default)]
pub struct LayoutBuilder {
    out: Layout,
}

impl LayoutBuilder {
    pub fn push_node(&mut self, id: String, label: String, position: Point, kind: LayoutNodeKind) {
        let style = NodeStyle::for_kind(&kind);
        self.out.nodes.push(LayoutNode {
            id,
            label,
            position,
            kind,
            style,
        });
    }

    pub fn push_edge(&mut self, source: &str, target: &str) {
        self.out.edges.push(LayoutEdge {
            id: format!("edge:{source}->{target}"),
            source: source.to_string(),
            target: target.to_string(),
        });
    }

    /// Endpoints fanned horizontally beneath `parent`, input order kept.
    pub fn fan_endpoints<'a>(
        &mut self,
        parent_id: &str,
        parent: Point,
        target: &EntityId,
        endpoints: impl ExactSizeIterator<Item = &'a Endpoint>,
    ) {
        let count = endpoints.len();
        for (i, ep) in endpoints.enumerate() {
            let id = endpoint_node_id(ep);
            let position = Point::new(
                parent.x + fan_offset(i, count, METHOD_GAP),
                parent.y + METHOD_Y_OFFSET,
            );
            self.push_node(
                id.clone(),
                ep.method.clone(),
                position,
                LayoutNodeKind::Endpoint {
                    target: target.clone(),
                    endpoint: ep.id.clone(),
                    status: ep.current_status(),
                    method: ep.method.clone(),
                    url: ep.url.clone(),
                    snapshot: ep.snapshot.clone(),
                },
            );
            self.push_edge(parent_id, &id);
        }
    }

    fn finish(self) -> Layout {
        self.out
    }
}

pub fn target_node_id(target: &Target) -> String {
    format!("target:{}", target.id)
}

pub fn endpoint_node_id(ep: &Endpoint) -> String {
    format!("endpoint:{}", ep.id)
}

fn route_node_id(target: &EntityId, group: &str) -> String {
    format!("route:{target}:{group}")
}

/// Per-strategy placement under one already emitted target node.
pub trait LayoutStrategy {
    fn target_position(&self, index: usize, count: usize) -> Point {
        Point::new(ROOT_X + fan_offset(index, count, TARGET_GAP), TARGET_Y)
    }

    fn place_target(&self, out: &mut LayoutBuilder, target: &Target, node_id: &str, at: Point);
}

pub struct DirectTree;

impl LayoutStrategy for DirectTree {
    fn place_target(&self, out: &mut LayoutBuilder, target: &Target, node_id: &str, at: Point) {
        let widest = target
            .urls
            .iter()
            .map(|u| u.endpoints.len())
            .max()
            .unwrap_or(0);
        let gap = column_gap(widest, METHOD_GAP, URL_GAP);
        let count = target.urls.len();
        for (i, group) in target.urls.iter().enumerate() {
            let id = NodeKey::url(&target.id, &group.url).0;
            let position = Point::new(at.x + fan_offset(i, count, gap), at.y + ROUTE_Y_OFFSET);
            out.push_node(
                id.clone(),
                get_endpoint_path(Some(&group.url)),
                position,
                LayoutNodeKind::Url {
                    target: target.id.clone(),
                    url: group.url.clone(),
                },
            );
            out.push_edge(node_id, &id);
            out.fan_endpoints(&id, position, &target.id, group.endpoints.iter());
        }
    }
}

/// Endpoints of one target bucketed by path group, first-seen order.
fn group_endpoints(target: &Target) -> Vec<(String, Vec<&Endpoint>)> {
    let mut groups: Vec<(String, Vec<&Endpoint>)> = Vec::new();
    for url_group in &target.urls {
        for ep in &url_group.endpoints {
            let raw = if ep.url.is_empty() {
                url_group.url.as_str()
            } else {
                ep.url.as_str()
            };
            let key = get_path_group(Some(raw));
            match groups.iter_mut().find(|(g, _)| *g == key) {
                Some((_, eps)) => eps.push(ep),
                None => groups.push((key, vec![ep])),
            }
        }
    }
    groups
}

pub struct PathGrouped;

impl LayoutStrategy for PathGrouped {
    fn place_target(&self, out: &mut LayoutBuilder, target: &Target, node_id: &str, at: Point) {
        for (i, (group, eps)) in group_endpoints(target).into_iter().enumerate() {
            let id = route_node_id(&target.id, &group);
            let position = Point::new(
                at.x,
                at.y + ROUTE_Y_OFFSET + i as f32 * ROUTE_VERTICAL_GAP,
            );
            out.push_node(
                id.clone(),
                group.clone(),
                position,
                LayoutNodeKind::Route {
                    target: target.id.clone(),
                    group,
                },
            );
            out.push_edge(node_id, &id);
            out.fan_endpoints(&id, position, &target.id, eps.into_iter());
        }
    }
}

/// Groups shared across every target: one column per group, one row per target.
pub struct GlobalPathGrouped {
    columns: Vec<String>,
    column_gap: f32,
    row_height: f32,
}

impl GlobalPathGrouped {
    pub fn new(tree: &CanonicalTree) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut widest = 0;
        for target in tree.targets() {
            for (group, eps) in group_endpoints(target) {
                widest = widest.max(eps.len());
                if !columns.contains(&group) {
                    columns.push(group);
                }
            }
        }
        Self {
            columns,
            column_gap: column_gap(widest, METHOD_GAP, TARGET_GAP),
            row_height: ROUTE_Y_OFFSET + METHOD_Y_OFFSET + ROUTE_VERTICAL_GAP,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn column_x(&self, column: usize) -> f32 {
        ROOT_X + fan_offset(column, self.columns.len(), self.column_gap)
    }
}

impl LayoutStrategy for GlobalPathGrouped {
    fn target_position(&self, index: usize, _count: usize) -> Point {
        let left = self.column_x(0) - self.column_gap;
        Point::new(left, TARGET_Y + index as f32 * self.row_height)
    }

    fn place_target(&self, out: &mut LayoutBuilder, target: &Target, node_id: &str, at: Point) {
        for (group, eps) in group_endpoints(target) {
            let Some(column) = self.columns.iter().position(|c| *c == group) else {
                continue;
            };
            let id = route_node_id(&target.id, &group);
            let position = Point::new(self.column_x(column), at.y + ROUTE_Y_OFFSET);
            out.push_node(
                id.clone(),
                group.clone(),
                position,
                LayoutNodeKind::Route {
                    target: target.id.clone(),
                    group,
                },
            );
            out.push_edge(node_id, &id);
            out.fan_endpoints(&id, position, &target.id, eps.into_iter());
        }
    }
}

fn root_label(tree: &CanonicalTree) -> String {
    match tree.branches() {
        [only] if !only.project.name.is_empty() => only.project.name.clone(),
        [_] => "Project".to_string(),
        _ => "Scope".to_string(),
    }
}

/// Shared walk: root, then every target, then the strategy's subtree.
pub fn layout_with(tree: &CanonicalTree, strategy: &dyn LayoutStrategy) -> Layout {
    let mut out = LayoutBuilder::default();
    if tree.is_empty() {
        out.push_node(
            ROOT_ID.to_string(),
            PLACEHOLDER_LABEL.to_string(),
            Point::new(ROOT_X, ROOT_Y),
            LayoutNodeKind::Root { placeholder: true },
        );
        return out.finish();
    }

    out.push_node(
        ROOT_ID.to_string(),
        root_label(tree),
        Point::new(ROOT_X, ROOT_Y),
        LayoutNodeKind::Root { placeholder: false },
    );
    let count = tree.targets().count();
    for (i, target) in tree.targets().enumerate() {
        let id = target_node_id(target);
        let at = strategy.target_position(i, count);
        out.push_node(
            id.clone(),
            target.hostname.clone(),
            at,
            LayoutNodeKind::Target {
                target: target.id.clone(),
            },
        );
        out.push_edge(ROOT_ID, &id);
        strategy.place_target(&mut out, target, &id, at);
    }
    out.finish()
}

pub fn layout(tree: &CanonicalTree, kind: LayoutStrategyKind) -> Layout {
    match kind {
        LayoutStrategyKind::DirectTree => layout_with(tree, &DirectTree),
        LayoutStrategyKind::PathGrouped => layout_with(tree, &PathGrouped),
        LayoutStrategyKind::GlobalPathGrouped => {
            layout_with(tree, &GlobalPathGrouped::new(tree))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::normalize::{normalize, RawTree};
    use ghostmap_core::VisualMap;
    use serde_json::json;
    use std::collections::HashSet;

    fn tree(raw: serde_json::Value) -> CanonicalTree {
        let map: VisualMap = serde_json::from_value(raw).unwrap();
        normalize(RawTree::VisualMap(&map))
    }

    fn two_targets() -> CanonicalTree {
        tree(json!({
            "project": {"id": 1, "name": "acme"},
            "targets": [
                {"id": 1, "hostname": "api", "urls": [
                    {"url": "/api/users", "endpoints": [{"id": 1, "method": "GET", "url": "/api/users"}]},
                    {"url": "/login", "endpoints": [{"id": 2, "method": "POST", "url": "/login"}]}
                ]},
                {"id": 2, "hostname": "admin", "urls": [
                    {"url": "/login", "endpoints": [{"id": 3, "method": "GET", "url": "/login"}]},
                    {"url": "/api/keys", "endpoints": [{"id": 4, "method": "GET", "url": "/api/keys"}]}
                ]}
            ]
        }))
    }

    fn assert_well_formed(layout: &Layout) {
        let ids: HashSet<&str> = layout.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), layout.nodes.len(), "duplicate node ids");
        for edge in &layout.edges {
            assert!(ids.contains(edge.source.as_str()), "dangling {}", edge.id);
            assert!(ids.contains(edge.target.as_str()), "dangling {}", edge.id);
        }
        // strict tree: every non-root node has exactly one parent
        let mut parents: HashMap<&str, usize> = HashMap::new();
        for edge in &layout.edges {
            *parents.entry(edge.target.as_str()).or_default() += 1;
        }
        for node in &layout.nodes {
            let expected = usize::from(node.id != ROOT_ID);
            assert_eq!(parents.get(node.id.as_str()).copied().unwrap_or(0), expected);
        }
    }

    #[test]
    fn empty_tree_yields_placeholder_root() {
        let out = layout(&CanonicalTree::default(), LayoutStrategyKind::PathGrouped);
        assert_eq!(out.nodes.len(), 1);
        assert_eq!(out.nodes[0].label, PLACEHOLDER_LABEL);
        assert_eq!(out.nodes[0].kind, LayoutNodeKind::Root { placeholder: true });
        assert!(out.edges.is_empty());
    }

    #[test]
    fn path_grouped_scenario() {
        let t = tree(json!({
            "project": {"id": 1, "name": "acme"},
            "targets": [{"id": 7, "hostname": "h", "urls": [
                {"url": "https://h/api/users/1", "endpoints": [
                    {"id": 1, "method": "GET", "url": "https://h/api/users/1",
                     "statuses": [{"status": "finding"}]},
                    {"id": 2, "method": "DELETE", "url": "https://h/api/users/1"}
                ]},
                {"url": "/login", "endpoints": [{"id": 3, "method": "POST", "url": "/login"}]}
            ]}]
        }));
        let out = layout(&t, LayoutStrategyKind::PathGrouped);
        assert_well_formed(&out);

        let routes: Vec<&str> = out
            .nodes
            .iter()
            .filter(|n| matches!(n.kind, LayoutNodeKind::Route { .. }))
            .map(|n| n.label.as_str())
            .collect();
        assert_eq!(routes, vec!["/api", "/login"]);
        assert_eq!(out.nodes.len(), 1 + 1 + 2 + 3);

        let kind_of = |id: &str| out.node(id).map(|n| n.kind.clone()).unwrap();
        for edge in &out.edges {
            let ok = matches!(
                (kind_of(&edge.source), kind_of(&edge.target)),
                (LayoutNodeKind::Root { .. }, LayoutNodeKind::Target { .. })
                    | (LayoutNodeKind::Target { .. }, LayoutNodeKind::Route { .. })
                    | (LayoutNodeKind::Route { .. }, LayoutNodeKind::Endpoint { .. })
            );
            assert!(ok, "unexpected edge {}", edge.id);
        }

        let api = out.node("route:7:/api").unwrap().position;
        let first = out.node("endpoint:1").unwrap();
        let second = out.node("endpoint:2").unwrap().position;
        assert_eq!(first.position.x, api.x - METHOD_GAP / 2.0);
        assert_eq!(second.x, api.x + METHOD_GAP / 2.0);
        assert_eq!(first.position.y, api.y + METHOD_Y_OFFSET);
        assert_eq!(first.style.fill, 0xef4444);
        assert_eq!(out.node("root").unwrap().label, "acme");
    }

    #[test]
    fn login_and_users_make_two_routes() {
        let t = tree(json!({
            "project": {"id": 1, "name": "acme"},
            "targets": [{"id": 1, "hostname": "api.example.com", "urls": [
                {"url": "/login", "endpoints": [
                    {"id": 1, "method": "GET", "url": "/login"},
                    {"id": 2, "method": "POST", "url": "/login"}
                ]},
                {"url": "/users", "endpoints": [{"id": 3, "method": "GET", "url": "/users"}]}
            ]}]
        }));
        let out = layout(&t, LayoutStrategyKind::PathGrouped);
        assert_well_formed(&out);

        let count = |pred: fn(&LayoutNodeKind) -> bool| out.nodes.iter().filter(|n| pred(&n.kind)).count();
        assert_eq!(count(|k| matches!(k, LayoutNodeKind::Route { .. })), 2);
        assert_eq!(count(|k| matches!(k, LayoutNodeKind::Endpoint { .. })), 3);
        assert_eq!(count(|k| matches!(k, LayoutNodeKind::Url { .. })), 0);
        assert_eq!(out.node("target:1").unwrap().label, "api.example.com");

        let mut edges: Vec<(&str, &str)> = out
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        edges.sort();
        assert_eq!(
            edges,
            vec![
                ("root", "target:1"),
                ("route:1:/login", "endpoint:1"),
                ("route:1:/login", "endpoint:2"),
                ("route:1:/users", "endpoint:3"),
                ("target:1", "route:1:/login"),
                ("target:1", "route:1:/users"),
            ]
        );
    }

    #[test]
    fn repeated_url_entries_share_one_node() {
        let t = tree(json!({
            "project": {"id": 1},
            "targets": [{"id": 1, "hostname": "h", "urls": [
                {"url": "/a", "endpoints": [{"id": 1, "method": "GET", "url": "/a"}]},
                {"url": "/a", "endpoints": [{"id": 2, "method": "POST", "url": "/a"}]}
            ]}]
        }));
        for kind in LayoutStrategyKind::ALL {
            assert_well_formed(&layout(&t, kind));
        }
        let out = layout(&t, LayoutStrategyKind::DirectTree);
        let ids: Vec<&str> = out.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "target:1", "url:1:/a", "endpoint:1", "endpoint:2"]);
    }

    #[test]
    fn direct_tree_uses_url_nodes() {
        let out = layout(&two_targets(), LayoutStrategyKind::DirectTree);
        assert_well_formed(&out);
        let url = out.node("url:1:/login").unwrap();
        assert_eq!(url.source_key(), Some(NodeKey("url:1:/login".into())));
        assert_eq!(
            out.path_to("endpoint:2"),
            vec!["endpoint:2", "url:1:/login", "target:1", "root"]
        );
    }

    #[test]
    fn global_columns_are_shared_across_targets() {
        let t = two_targets();
        let strategy = GlobalPathGrouped::new(&t);
        assert_eq!(strategy.columns(), &["/api".to_string(), "/login".to_string()]);

        let out = layout(&t, LayoutStrategyKind::GlobalPathGrouped);
        assert_well_formed(&out);
        let x = |id: &str| out.node(id).unwrap().position.x;
        assert_eq!(x("route:1:/api"), x("route:2:/api"));
        assert_eq!(x("route:1:/login"), x("route:2:/login"));
        assert!(x("route:1:/api") < x("route:1:/login"));
        let y = |id: &str| out.node(id).unwrap().position.y;
        assert!(y("route:2:/api") > y("route:1:/api"));
    }

    #[test]
    fn layout_is_deterministic() {
        let t = two_targets();
        for kind in LayoutStrategyKind::ALL {
            assert_eq!(layout(&t, kind), layout(&t, kind));
        }
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!(
            LayoutStrategyKind::parse("global_path_grouped"),
            Some(LayoutStrategyKind::GlobalPathGrouped)
        );
        assert_eq!(LayoutStrategyKind::parse("direct"), Some(LayoutStrategyKind::DirectTree));
        assert_eq!(LayoutStrategyKind::parse("radial"), None);
    }
}
