use ghostmap_core::{
    EndpointPayload, FindingPayload, ProjectSummary, ProjectTreeEntry, RecommendationPayload,
    StatusPayload, TargetPayload, UrlPayload, VisualMap, WireId,
};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::graph::model::{
    CanonicalTree, Endpoint, EntityId, Finding, HttpSnapshot, Project, ProjectBranch,
    Recommendation, RequestSnapshot, ResponseSnapshot, Status, Target, TestStatus, UrlGroup,
};

pub const UNKNOWN: &str = "Unknown";
pub const DEFAULT_PRIORITY: i64 = 5;

/// Either API shape the normalizer accepts.
#[derive(Debug, Clone, Copy)]
pub enum RawTree<'a> {
    VisualMap(&'a VisualMap),
    ProjectTree(&'a [ProjectTreeEntry]),
}

pub fn normalize(raw: RawTree<'_>) -> CanonicalTree {
    match raw {
        RawTree::VisualMap(map) => normalize_visual_map(map),
        RawTree::ProjectTree(entries) => normalize_project_tree(entries),
    }
}

pub fn normalize_visual_map(map: &VisualMap) -> CanonicalTree {
    let project = map
        .project
        .as_ref()
        .map(|p| project_from(p.id.as_ref(), p.name.as_deref(), 0))
        .unwrap_or_else(|| project_from(None, None, 0));
    let targets = map
        .targets
        .iter()
        .enumerate()
        .map(|(i, t)| target_from(t, &project.id, i))
        .collect();
    CanonicalTree::new(vec![ProjectBranch { project, targets }])
}

pub fn normalize_project_tree(entries: &[ProjectTreeEntry]) -> CanonicalTree {
    let branches = entries
        .iter()
        .enumerate()
        .map(|(pi, entry)| {
            let project = project_from(entry.id.as_ref(), entry.name.as_deref(), pi);
            let targets = entry
                .targets
                .iter()
                .enumerate()
                .map(|(ti, t)| target_from(t, &project.id, ti))
                .collect();
            ProjectBranch { project, targets }
        })
        .collect();
    CanonicalTree::new(branches)
}

pub fn project_summary(summary: &ProjectSummary, position: usize) -> Project {
    project_from(summary.id.as_ref(), summary.name.as_deref(), position)
}

fn project_from(id: Option<&WireId>, name: Option<&str>, position: usize) -> Project {
    Project {
        id: id
            .map(EntityId::from)
            .unwrap_or_else(|| EntityId(format!("p{position}"))),
        name: non_empty(name).unwrap_or("").to_string(),
    }
}

fn target_from(raw: &TargetPayload, project: &EntityId, position: usize) -> Target {
    let id = raw
        .id
        .as_ref()
        .map(EntityId::from)
        .unwrap_or_else(|| EntityId(format!("{project}.t{position}")));
    let hostname = non_empty(raw.hostname.as_deref())
        .or_else(|| non_empty(raw.name.as_deref()))
        .unwrap_or(UNKNOWN)
        .to_string();

    // Positions count endpoints across the whole target so they survive regrouping.
    let mut position = 0usize;
    let mut next_endpoint = |ep: &EndpointPayload, fallback_url: &str| {
        let endpoint = endpoint_from(ep, &id, position, fallback_url);
        position += 1;
        endpoint
    };

    let urls = if raw.urls.is_empty() {
        group_flat_endpoints(&raw.endpoints, &mut next_endpoint)
    } else {
        let mut groups: Vec<UrlGroup> = Vec::new();
        for group in raw.urls.iter().map(|g| url_group_from(g, &mut next_endpoint)) {
            // equal url strings share one group, first-seen order
            match groups.iter_mut().find(|g| g.url == group.url) {
                Some(existing) => existing.endpoints.extend(group.endpoints),
                None => groups.push(group),
            }
        }
        groups
    };

    let mut recommendations: Vec<Recommendation> = raw
        .recommendations
        .iter()
        .filter(|r| r.is_completed != Some(true))
        .map(recommendation_from)
        .collect();
    recommendations.sort_by_key(|r| r.priority);

    Target {
        id,
        hostname,
        notes: raw.notes.clone(),
        urls,
        recommendations,
    }
}

fn url_group_from(
    raw: &UrlPayload,
    next_endpoint: &mut impl FnMut(&EndpointPayload, &str) -> Endpoint,
) -> UrlGroup {
    let url = raw.url.clone().unwrap_or_default();
    let endpoints = raw
        .endpoints
        .iter()
        .map(|ep| next_endpoint(ep, &url))
        .collect();
    UrlGroup { url, endpoints }
}

/// Buckets a flat endpoint list by exact url, first-seen order.
fn group_flat_endpoints(
    raw: &[EndpointPayload],
    next_endpoint: &mut impl FnMut(&EndpointPayload, &str) -> Endpoint,
) -> Vec<UrlGroup> {
    let mut groups: Vec<UrlGroup> = Vec::new();
    for ep in raw {
        let endpoint = next_endpoint(ep, "");
        match groups.iter_mut().find(|g| g.url == endpoint.url) {
            Some(group) => group.endpoints.push(endpoint),
            None => groups.push(UrlGroup {
                url: endpoint.url.clone(),
                endpoints: vec![endpoint],
            }),
        }
    }
    groups
}

fn endpoint_from(
    raw: &EndpointPayload,
    target: &EntityId,
    position: usize,
    fallback_url: &str,
) -> Endpoint {
    let id = raw
        .id
        .as_ref()
        .map(EntityId::from)
        .unwrap_or_else(|| EntityId(format!("{target}.e{position}")));
    let method = non_empty(raw.method.as_deref())
        .unwrap_or(UNKNOWN)
        .to_string();
    let url = non_empty(raw.url.as_deref())
        .unwrap_or(fallback_url)
        .to_string();

    let snapshot = HttpSnapshot {
        request: RequestSnapshot {
            method: method.clone(),
            url: url.clone(),
            headers: safe_json(raw.request_headers.as_ref().or(raw.headers.as_ref())),
            body: safe_json(raw.request_body.as_ref().or(raw.body.as_ref())),
        },
        response: ResponseSnapshot {
            status_code: raw.response_status_code.as_ref().and_then(status_code),
            headers: safe_json(raw.response_headers.as_ref()),
            body: safe_json(raw.response_body.as_ref()),
        },
    };

    Endpoint {
        id,
        method,
        url,
        notes: raw.notes.clone(),
        statuses: raw.statuses.iter().map(status_from).collect(),
        findings: raw.findings.iter().map(finding_from).collect(),
        snapshot,
    }
}

fn status_from(raw: &StatusPayload) -> Status {
    Status {
        id: raw.id.as_ref().map(EntityId::from),
        status: raw
            .status
            .as_deref()
            .map(TestStatus::parse)
            .unwrap_or_default(),
        test_type: raw.test_type.clone(),
        notes: raw.notes.clone(),
        created_at: raw.created_at.clone(),
        updated_at: raw.updated_at.clone(),
    }
}

fn finding_from(raw: &FindingPayload) -> Finding {
    Finding {
        id: raw.id.as_ref().map(EntityId::from),
        title: non_empty(raw.title.as_deref()).unwrap_or(UNKNOWN).to_string(),
        severity: non_empty(raw.severity.as_deref())
            .unwrap_or(UNKNOWN)
            .to_string(),
        status: non_empty(raw.status.as_deref()).unwrap_or(UNKNOWN).to_string(),
        description: raw.description.clone(),
        created_at: raw.created_at.clone(),
        updated_at: raw.updated_at.clone(),
    }
}

fn recommendation_from(raw: &RecommendationPayload) -> Recommendation {
    Recommendation {
        text: raw.recommendation_text.clone().unwrap_or_default(),
        priority: raw.priority.unwrap_or(DEFAULT_PRIORITY),
    }
}

fn status_code(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Renders an opaque payload for display: null → none, strings as-is,
/// anything else pretty-printed.
pub fn safe_json(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOption {
    pub id: EntityId,
    pub label: String,
}

/// Target choices for the filter bar, taken from the unfiltered tree.
pub fn target_options(tree: &CanonicalTree) -> Vec<TargetOption> {
    tree.targets()
        .map(|t| TargetOption {
            id: t.id.clone(),
            label: if t.hostname == UNKNOWN {
                format!("Target {}", t.id)
            } else {
                t.hostname.clone()
            },
        })
        .collect()
}

/// Distinct upper-cased methods, sorted.
pub fn method_options(tree: &CanonicalTree) -> Vec<String> {
    tree.endpoints()
        .map(|ep| ep.method.to_ascii_uppercase())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::NodeKey;
    use serde_json::json;

    fn visual_map(raw: Value) -> VisualMap {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn missing_fields_become_placeholders() {
        let map = visual_map(json!({
            "targets": [{"urls": [{"endpoints": [{}]}]}]
        }));
        let tree = normalize(RawTree::VisualMap(&map));

        let target = tree.targets().next().unwrap();
        assert_eq!(target.hostname, UNKNOWN);
        let ep = target.endpoints().next().unwrap();
        assert_eq!(ep.method, UNKNOWN);
        assert_eq!(ep.current_status(), TestStatus::Untested);
        assert!(ep.snapshot.request.headers.is_none());
        assert_eq!(tree.branches()[0].project.name, "");
    }

    #[test]
    fn endpoint_ids_are_stable_across_runs() {
        let map = visual_map(json!({
            "project": {"id": 1, "name": "acme"},
            "targets": [{"id": 3, "urls": [
                {"url": "/a", "endpoints": [{"method": "GET"}, {"id": 8, "method": "POST"}]},
                {"url": "/b", "endpoints": [{"method": "PUT"}]}
            ]}]
        }));
        let first = normalize(RawTree::VisualMap(&map));
        let second = normalize(RawTree::VisualMap(&map));
        assert_eq!(first, second);

        let ids: Vec<String> = first.endpoints().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["3.e0", "8", "3.e2"]);
        assert!(first.index().contains(&NodeKey("endpoint:3.e2".into())));
    }

    #[test]
    fn repeated_url_groups_merge_in_first_seen_order() {
        let map = visual_map(json!({
            "targets": [{"id": 1, "urls": [
                {"url": "/a", "endpoints": [{"id": 1, "method": "GET"}]},
                {"url": "/b", "endpoints": [{"id": 2, "method": "GET"}]},
                {"url": "/a", "endpoints": [{"id": 3, "method": "POST"}]}
            ]}]
        }));
        let tree = normalize_visual_map(&map);
        let target = tree.targets().next().unwrap();
        let groups: Vec<(&str, Vec<&str>)> = target
            .urls
            .iter()
            .map(|g| (g.url.as_str(), g.endpoints.iter().map(|e| e.id.as_str()).collect()))
            .collect();
        assert_eq!(groups, vec![("/a", vec!["1", "3"]), ("/b", vec!["2"])]);
        assert_eq!(tree.index().len(), 1 + 1 + 2 + 3);
    }

    #[test]
    fn project_tree_groups_flat_endpoints_by_url() {
        let entries: Vec<ProjectTreeEntry> = serde_json::from_value(json!([
            {"id": 1, "name": "acme", "targets": [{"id": 2, "hostname": "h", "endpoints": [
                {"id": 10, "method": "GET", "url": "/login"},
                {"id": 11, "method": "GET", "url": "/users"},
                {"id": 12, "method": "POST", "url": "/login"}
            ]}]},
            {"id": 5, "name": "other", "targets": null}
        ]))
        .unwrap();
        let tree = normalize(RawTree::ProjectTree(&entries));

        assert_eq!(tree.branches().len(), 2);
        let target = tree.find_target(&EntityId::from("2")).unwrap();
        let urls: Vec<(&str, usize)> = target
            .urls
            .iter()
            .map(|g| (g.url.as_str(), g.endpoints.len()))
            .collect();
        assert_eq!(urls, vec![("/login", 2), ("/users", 1)]);
        assert_eq!(target.urls[0].endpoints[1].id.as_str(), "12");
    }

    #[test]
    fn snapshot_prefers_request_fields_and_pretty_prints() {
        let map = visual_map(json!({
            "targets": [{"id": 1, "urls": [{"url": "/x", "endpoints": [{
                "id": 1,
                "headers": "fallback",
                "request_headers": {"a": 1},
                "body": "raw body",
                "response_status_code": "201"
            }]}]}]
        }));
        let tree = normalize(RawTree::VisualMap(&map));
        let snap = &tree.endpoints().next().unwrap().snapshot;
        assert_eq!(snap.request.headers.as_deref(), Some("{\n  \"a\": 1\n}"));
        assert_eq!(snap.request.body.as_deref(), Some("raw body"));
        assert_eq!(snap.request.url, "/x");
        assert_eq!(snap.response.status_code, Some(201));
        assert_eq!(safe_json(Some(&Value::Null)), None);
    }

    #[test]
    fn recommendations_default_priority_and_sort() {
        let map = visual_map(json!({
            "targets": [{"id": 1, "recommendations": [
                {"recommendation_text": "later"},
                {"recommendation_text": "now", "priority": 1},
                {"recommendation_text": "done", "priority": 0, "is_completed": true}
            ]}]
        }));
        let tree = normalize(RawTree::VisualMap(&map));
        let recs = &tree.targets().next().unwrap().recommendations;
        assert_eq!(
            recs,
            &vec![
                Recommendation { text: "now".into(), priority: 1 },
                Recommendation { text: "later".into(), priority: DEFAULT_PRIORITY },
            ]
        );
    }

    #[test]
    fn filter_options_from_unfiltered_tree() {
        let map = visual_map(json!({
            "targets": [
                {"id": 1, "hostname": "api", "urls": [{"url": "/", "endpoints": [
                    {"id": 1, "method": "post"}, {"id": 2, "method": "GET"}, {"id": 3, "method": "get"}
                ]}]},
                {"id": 2}
            ]
        }));
        let tree = normalize(RawTree::VisualMap(&map));
        let labels: Vec<String> = target_options(&tree).into_iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!["api".to_string(), "Target 2".to_string()]);
        assert_eq!(method_options(&tree), vec!["GET".to_string(), "POST".to_string()]);
    }
}
