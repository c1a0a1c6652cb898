use crate::graph::model::{
    CanonicalTree, Endpoint, EntityId, ProjectBranch, Stats, Target, TestStatus, UrlGroup,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MethodFilter {
    #[default]
    All,
    Only(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(TestStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub search: String,
    pub target: Option<EntityId>,
    pub method: MethodFilter,
    pub status: StatusFilter,
}

impl FilterCriteria {
    /// Everything except the free-text search goes back to "all".
    pub fn reset_selectors(&mut self) {
        self.target = None;
        self.method = MethodFilter::All;
        self.status = StatusFilter::All;
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.target.is_none()
            && self.method == MethodFilter::All
            && self.status == StatusFilter::All
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilteredView {
    pub tree: CanonicalTree,
    pub stats: Stats,
}

pub fn matches_endpoint(ep: &Endpoint, criteria: &FilterCriteria, query: &str) -> bool {
    if let MethodFilter::Only(m) = &criteria.method {
        if !ep.method.eq_ignore_ascii_case(m) {
            return false;
        }
    }
    if let StatusFilter::Only(s) = criteria.status {
        if ep.current_status() != s {
            return false;
        }
    }
    matches_search(ep, query)
}

/// `query` must already be trimmed and lower-cased.
fn matches_search(ep: &Endpoint, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    if ep.url.to_lowercase().contains(query) || ep.method.to_lowercase().contains(query) {
        return true;
    }
    status_text(ep).to_lowercase().contains(query)
}

/// Every status as `"{status} {test_type}"`, joined by single spaces.
fn status_text(ep: &Endpoint) -> String {
    ep.statuses
        .iter()
        .map(|s| {
            format!("{} {}", s.status.as_str(), s.test_type.as_deref().unwrap_or(""))
                .trim()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Top-down predicates, bottom-up pruning. Projects are kept even when all
/// of their targets are pruned.
pub fn filter_tree(tree: &CanonicalTree, criteria: &FilterCriteria) -> FilteredView {
    let query = criteria.search.trim().to_lowercase();

    let branches: Vec<ProjectBranch> = tree
        .branches()
        .iter()
        .map(|branch| ProjectBranch {
            project: branch.project.clone(),
            targets: branch
                .targets
                .iter()
                .filter(|t| criteria.target.as_ref().map_or(true, |id| &t.id == id))
                .filter_map(|t| filter_target(t, criteria, &query))
                .collect(),
        })
        .collect();

    let tree = CanonicalTree::new(branches);
    let stats = Stats::of(&tree);
    FilteredView { tree, stats }
}

fn filter_target(target: &Target, criteria: &FilterCriteria, query: &str) -> Option<Target> {
    let urls: Vec<UrlGroup> = target
        .urls
        .iter()
        .filter_map(|group| {
            let endpoints: Vec<Endpoint> = group
                .endpoints
                .iter()
                .filter(|ep| matches_endpoint(ep, criteria, query))
                .cloned()
                .collect();
            (!endpoints.is_empty()).then(|| UrlGroup {
                url: group.url.clone(),
                endpoints,
            })
        })
        .collect();
    if urls.is_empty() {
        return None;
    }
    Some(Target {
        urls,
        ..target.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::normalize::{normalize, RawTree};
    use ghostmap_core::VisualMap;
    use serde_json::json;

    fn fixture() -> CanonicalTree {
        let map: VisualMap = serde_json::from_value(json!({
            "project": {"id": 1, "name": "acme"},
            "targets": [
                {"id": 1, "hostname": "api.acme.test", "urls": [
                    {"url": "/api/users", "endpoints": [
                        {"id": 1, "method": "GET", "url": "/api/users",
                         "statuses": [{"status": "tested", "test_type": "idor"}],
                         "findings": [{"title": "leak"}, {"title": "enum"}]},
                        {"id": 2, "method": "POST", "url": "/api/users",
                         "statuses": [{"status": "planned", "test_type": "sqli"}]}
                    ]},
                    {"url": "/login", "endpoints": [
                        {"id": 3, "method": "post", "url": "/login"}
                    ]}
                ]},
                {"id": 2, "hostname": "cdn.acme.test", "urls": [
                    {"url": "/static", "endpoints": [
                        {"id": 4, "method": "GET", "url": "/static",
                         "statuses": [{"status": "finding", "test_type": "xss"}],
                         "findings": [{"title": "xss"}]}
                    ]}
                ]}
            ]
        }))
        .unwrap();
        normalize(RawTree::VisualMap(&map))
    }

    fn endpoint_ids(view: &FilteredView) -> Vec<String> {
        view.tree.endpoints().map(|e| e.id.to_string()).collect()
    }

    #[test]
    fn empty_criteria_keeps_everything() {
        let tree = fixture();
        let view = filter_tree(&tree, &FilterCriteria::default());
        assert_eq!(view.tree, tree);
        assert_eq!(
            view.stats,
            Stats {
                targets: 2,
                urls: 3,
                endpoints: 4,
                findings: 3
            }
        );
    }

    #[test]
    fn method_is_case_insensitive_and_prunes_upward() {
        let view = filter_tree(
            &fixture(),
            &FilterCriteria {
                method: MethodFilter::Only("POST".into()),
                ..FilterCriteria::default()
            },
        );
        assert_eq!(endpoint_ids(&view), vec!["2", "3"]);
        assert_eq!(view.stats.targets, 1);
        assert_eq!(view.stats.urls, 2);
        assert_eq!(view.stats.findings, 0);
    }

    #[test]
    fn status_uses_latest_record_with_untested_default() {
        let view = filter_tree(
            &fixture(),
            &FilterCriteria {
                status: StatusFilter::Only(TestStatus::Untested),
                ..FilterCriteria::default()
            },
        );
        assert_eq!(endpoint_ids(&view), vec!["3"]);
    }

    #[test]
    fn search_matches_status_and_test_type() {
        let tree = fixture();
        let search = |q: &str| {
            endpoint_ids(&filter_tree(
                &tree,
                &FilterCriteria {
                    search: q.into(),
                    ..FilterCriteria::default()
                },
            ))
        };
        assert_eq!(search("  SQLI "), vec!["2"]);
        assert_eq!(search("finding xss"), vec!["4"]);
        assert_eq!(search("/login"), vec!["3"]);
        assert!(search("nothing-here").is_empty());
    }

    #[test]
    fn search_spans_the_joined_status_history() {
        let map: VisualMap = serde_json::from_value(json!({
            "project": {"id": 1},
            "targets": [{"id": 1, "hostname": "h", "urls": [
                {"url": "/u", "endpoints": [
                    {"id": 9, "method": "GET", "url": "/u", "statuses": [
                        {"status": "tested", "test_type": "idor"},
                        {"status": "planned", "test_type": "sqli"}
                    ]},
                    {"id": 10, "method": "GET", "url": "/u", "statuses": [
                        {"status": "planned"},
                        {"status": "tested"}
                    ]}
                ]}
            ]}]
        }))
        .unwrap();
        let tree = normalize(RawTree::VisualMap(&map));
        let search = |q: &str| {
            endpoint_ids(&filter_tree(
                &tree,
                &FilterCriteria {
                    search: q.into(),
                    ..FilterCriteria::default()
                },
            ))
        };
        assert_eq!(search("idor planned"), vec!["9"]);
        assert_eq!(search("planned tested"), vec!["10"]);
        assert!(search("planned  tested").is_empty());
    }

    #[test]
    fn target_filter_keeps_project_branch() {
        let view = filter_tree(
            &fixture(),
            &FilterCriteria {
                target: Some(EntityId::from("2")),
                ..FilterCriteria::default()
            },
        );
        assert_eq!(endpoint_ids(&view), vec!["4"]);

        let none = filter_tree(
            &fixture(),
            &FilterCriteria {
                target: Some(EntityId::from("99")),
                ..FilterCriteria::default()
            },
        );
        assert_eq!(none.tree.branches().len(), 1);
        assert_eq!(none.stats, Stats::default());
    }

    #[test]
    fn filtering_is_idempotent() {
        let criteria = FilterCriteria {
            search: "api".into(),
            method: MethodFilter::Only("get".into()),
            ..FilterCriteria::default()
        };
        let once = filter_tree(&fixture(), &criteria);
        let twice = filter_tree(&once.tree, &criteria);
        assert_eq!(once, twice);
    }

    #[test]
    fn tightening_never_grows_the_result() {
        let tree = fixture();
        let loose = FilterCriteria {
            method: MethodFilter::Only("GET".into()),
            ..FilterCriteria::default()
        };
        let tight = FilterCriteria {
            status: StatusFilter::Only(TestStatus::Tested),
            ..loose.clone()
        };
        let a = filter_tree(&tree, &loose);
        let b = filter_tree(&tree, &tight);
        let a_ids = endpoint_ids(&a);
        assert!(endpoint_ids(&b).iter().all(|id| a_ids.contains(id)));
        assert!(b.stats.endpoints <= a.stats.endpoints);
        assert!(b.stats.findings <= a.stats.findings);
    }

    #[test]
    fn longer_search_never_grows_the_result() {
        let tree = fixture();
        let with = |q: &str| {
            filter_tree(
                &tree,
                &FilterCriteria {
                    search: q.into(),
                    ..FilterCriteria::default()
                },
            )
        };
        let mut prev = with("");
        for q in ["l", "lo", "log", "logi", "login"] {
            let next = with(q);
            let prev_ids = endpoint_ids(&prev);
            assert!(endpoint_ids(&next).iter().all(|id| prev_ids.contains(id)), "{q}");
            assert!(next.stats.endpoints <= prev.stats.endpoints);
            assert!(next.stats.targets <= prev.stats.targets);
            prev = next;
        }
        assert_eq!(endpoint_ids(&prev), vec!["3"]);
    }
}
