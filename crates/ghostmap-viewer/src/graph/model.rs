use ghostmap_core::WireId;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Backend id in text form, whatever its wire representation was.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&WireId> for EntityId {
    fn from(id: &WireId) -> Self {
        EntityId(id.to_string())
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId(s.to_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Project,
    Target,
    Url,
    Endpoint,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Project => "project",
            NodeKind::Target => "target",
            NodeKind::Url => "url",
            NodeKind::Endpoint => "endpoint",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "project" => Some(NodeKind::Project),
            "target" => Some(NodeKind::Target),
            "url" => Some(NodeKind::Url),
            "endpoint" => Some(NodeKind::Endpoint),
            _ => None,
        }
    }
}

/// Composite `"<kind>:<id>"` lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub String);

impl NodeKey {
    pub fn project(id: &EntityId) -> Self {
        NodeKey(format!("project:{id}"))
    }

    pub fn target(id: &EntityId) -> Self {
        NodeKey(format!("target:{id}"))
    }

    pub fn url(target: &EntityId, url: &str) -> Self {
        NodeKey(format!("url:{target}:{url}"))
    }

    pub fn endpoint(id: &EntityId) -> Self {
        NodeKey(format!("endpoint:{id}"))
    }

    pub fn kind(&self) -> Option<NodeKind> {
        let (prefix, _) = self.0.split_once(':')?;
        NodeKind::parse(prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TestStatus {
    Tested,
    Planned,
    Recommended,
    Finding,
    #[default]
    Untested,
}

impl TestStatus {
    pub const ALL: [TestStatus; 5] = [
        TestStatus::Tested,
        TestStatus::Planned,
        TestStatus::Recommended,
        TestStatus::Finding,
        TestStatus::Untested,
    ];

    // finding > recommended > planned > tested
    const PRECEDENCE: [TestStatus; 4] = [
        TestStatus::Finding,
        TestStatus::Recommended,
        TestStatus::Planned,
        TestStatus::Tested,
    ];

    /// Unknown or empty values read as `Untested`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tested" => TestStatus::Tested,
            "planned" => TestStatus::Planned,
            "recommended" => TestStatus::Recommended,
            "finding" => TestStatus::Finding,
            _ => TestStatus::Untested,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Tested => "tested",
            TestStatus::Planned => "planned",
            TestStatus::Recommended => "recommended",
            TestStatus::Finding => "finding",
            TestStatus::Untested => "untested",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TestStatus::Tested => "Tested",
            TestStatus::Planned => "Planned",
            TestStatus::Recommended => "Recommended",
            TestStatus::Finding => "Finding",
            TestStatus::Untested => "Untested",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Status {
    pub id: Option<EntityId>,
    pub status: TestStatus,
    pub test_type: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Finding {
    pub id: Option<EntityId>,
    pub title: String,
    pub severity: String,
    pub status: String,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub text: String,
    /// Lower is more urgent.
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub headers: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseSnapshot {
    pub status_code: Option<i64>,
    pub headers: Option<String>,
    pub body: Option<String>,
}

/// Request/response capture attached to an endpoint, already rendered to text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpSnapshot {
    pub request: RequestSnapshot,
    pub response: ResponseSnapshot,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestingCoverage {
    pub tested: Vec<String>,
    pub planned: Vec<String>,
    pub recommended: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub id: EntityId,
    pub method: String,
    pub url: String,
    pub notes: Option<String>,
    /// Most recent first.
    pub statuses: Vec<Status>,
    pub findings: Vec<Finding>,
    pub snapshot: HttpSnapshot,
}

impl Endpoint {
    pub fn key(&self) -> NodeKey {
        NodeKey::endpoint(&self.id)
    }

    /// The latest status record, `Untested` when there is none.
    pub fn current_status(&self) -> TestStatus {
        self.statuses
            .first()
            .map(|s| s.status)
            .unwrap_or(TestStatus::Untested)
    }

    /// Highest-precedence status across the whole history.
    pub fn top_status(&self) -> Option<TestStatus> {
        let first = self.statuses.first()?;
        TestStatus::PRECEDENCE
            .into_iter()
            .find(|p| self.statuses.iter().any(|s| s.status == *p))
            .or(Some(first.status))
    }

    pub fn coverage(&self) -> TestingCoverage {
        let collect = |accept: &dyn Fn(TestStatus) -> bool| {
            let mut seen = HashSet::new();
            self.statuses
                .iter()
                .filter(|s| accept(s.status))
                .filter_map(|s| s.test_type.as_deref())
                .filter(|t| !t.is_empty())
                .filter(|t| seen.insert(t.to_string()))
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        TestingCoverage {
            tested: collect(&|s| matches!(s, TestStatus::Tested | TestStatus::Finding)),
            planned: collect(&|s| s == TestStatus::Planned),
            recommended: collect(&|s| s == TestStatus::Recommended),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UrlGroup {
    pub url: String,
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: EntityId,
    pub hostname: String,
    pub notes: Option<String>,
    pub urls: Vec<UrlGroup>,
    pub recommendations: Vec<Recommendation>,
}

impl Target {
    pub fn key(&self) -> NodeKey {
        NodeKey::target(&self.id)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.urls.iter().flat_map(|u| u.endpoints.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectBranch {
    pub project: Project,
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub kind: NodeKind,
    pub parent: Option<NodeKey>,
}

/// Flat key → entry lookup with parent back-references.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeIndex {
    entries: HashMap<NodeKey, IndexEntry>,
}

impl NodeIndex {
    fn build(branches: &[ProjectBranch]) -> Self {
        let mut entries = HashMap::new();
        for branch in branches {
            let pkey = NodeKey::project(&branch.project.id);
            entries.insert(
                pkey.clone(),
                IndexEntry {
                    kind: NodeKind::Project,
                    parent: None,
                },
            );
            for target in &branch.targets {
                let tkey = target.key();
                entries.insert(
                    tkey.clone(),
                    IndexEntry {
                        kind: NodeKind::Target,
                        parent: Some(pkey.clone()),
                    },
                );
                for group in &target.urls {
                    let ukey = NodeKey::url(&target.id, &group.url);
                    entries.insert(
                        ukey.clone(),
                        IndexEntry {
                            kind: NodeKind::Url,
                            parent: Some(tkey.clone()),
                        },
                    );
                    for ep in &group.endpoints {
                        entries.insert(
                            ep.key(),
                            IndexEntry {
                                kind: NodeKind::Endpoint,
                                parent: Some(ukey.clone()),
                            },
                        );
                    }
                }
            }
        }
        Self { entries }
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &NodeKey) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    pub fn parent(&self, key: &NodeKey) -> Option<&NodeKey> {
        self.entries.get(key)?.parent.as_ref()
    }

    /// Parent first, root last. Empty for unknown keys.
    pub fn ancestors(&self, key: &NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut cursor = self.parent(key);
        while let Some(p) = cursor {
            if out.contains(p) {
                break;
            }
            out.push(p.clone());
            cursor = self.parent(p);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalTree {
    branches: Vec<ProjectBranch>,
    index: NodeIndex,
}

impl CanonicalTree {
    pub fn new(branches: Vec<ProjectBranch>) -> Self {
        let index = NodeIndex::build(&branches);
        Self { branches, index }
    }

    pub fn branches(&self) -> &[ProjectBranch] {
        &self.branches
    }

    pub fn index(&self) -> &NodeIndex {
        &self.index
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.branches.iter().flat_map(|b| b.targets.iter())
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.targets().flat_map(Target::endpoints)
    }

    pub fn find_endpoint(&self, id: &EntityId) -> Option<&Endpoint> {
        self.endpoints().find(|ep| &ep.id == id)
    }

    pub fn find_target(&self, id: &EntityId) -> Option<&Target> {
        self.targets().find(|t| &t.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub targets: usize,
    pub urls: usize,
    pub endpoints: usize,
    pub findings: usize,
}

impl Stats {
    pub fn of(tree: &CanonicalTree) -> Self {
        let mut stats = Stats::default();
        for target in tree.targets() {
            stats.targets += 1;
            stats.urls += target.urls.len();
            for ep in target.endpoints() {
                stats.endpoints += 1;
                stats.findings += ep.findings.len();
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(s: TestStatus, test_type: &str) -> Status {
        Status {
            status: s,
            test_type: Some(test_type.to_string()),
            ..Status::default()
        }
    }

    fn endpoint(id: &str, statuses: Vec<Status>) -> Endpoint {
        Endpoint {
            id: EntityId::from(id),
            method: "GET".into(),
            url: "/x".into(),
            notes: None,
            statuses,
            findings: Vec::new(),
            snapshot: HttpSnapshot::default(),
        }
    }

    #[test]
    fn current_and_top_status_are_distinct() {
        let ep = endpoint(
            "1",
            vec![
                status(TestStatus::Tested, "xss"),
                status(TestStatus::Finding, "idor"),
            ],
        );
        assert_eq!(ep.current_status(), TestStatus::Tested);
        assert_eq!(ep.top_status(), Some(TestStatus::Finding));

        let empty = endpoint("2", Vec::new());
        assert_eq!(empty.current_status(), TestStatus::Untested);
        assert_eq!(empty.top_status(), None);
    }

    #[test]
    fn coverage_dedups_and_counts_findings_as_tested() {
        let ep = endpoint(
            "1",
            vec![
                status(TestStatus::Tested, "xss"),
                status(TestStatus::Finding, "xss"),
                status(TestStatus::Finding, "sqli"),
                status(TestStatus::Planned, "ssrf"),
            ],
        );
        let cov = ep.coverage();
        assert_eq!(cov.tested, vec!["xss".to_string(), "sqli".to_string()]);
        assert_eq!(cov.planned, vec!["ssrf".to_string()]);
        assert!(cov.recommended.is_empty());
    }

    #[test]
    fn index_walks_ancestors_upward() {
        let tree = CanonicalTree::new(vec![ProjectBranch {
            project: Project {
                id: EntityId::from("1"),
                name: "acme".into(),
            },
            targets: vec![Target {
                id: EntityId::from("7"),
                hostname: "h".into(),
                notes: None,
                urls: vec![UrlGroup {
                    url: "/login".into(),
                    endpoints: vec![endpoint("42", Vec::new())],
                }],
                recommendations: Vec::new(),
            }],
        }]);

        let key = NodeKey::endpoint(&EntityId::from("42"));
        assert_eq!(key.kind(), Some(NodeKind::Endpoint));
        assert_eq!(
            tree.index().ancestors(&key),
            vec![
                NodeKey("url:7:/login".into()),
                NodeKey("target:7".into()),
                NodeKey("project:1".into()),
            ]
        );
        assert!(tree.index().ancestors(&NodeKey("endpoint:nope".into())).is_empty());
    }

    #[test]
    fn status_parse_is_lenient() {
        assert_eq!(TestStatus::parse(" Finding "), TestStatus::Finding);
        assert_eq!(TestStatus::parse("blocked"), TestStatus::Untested);
    }
}
