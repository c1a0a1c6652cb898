use std::collections::BTreeSet;

use crate::graph::model::{NodeIndex, NodeKey};
use crate::graph::timeline::Activity;

pub const WAITING_MESSAGE: &str = "Waiting for timeline data.";

/// Highlight state shared by playback focus and user selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FocusBridge {
    ghost: Option<NodeKey>,
    selected: Option<NodeKey>,
    expanded: BTreeSet<NodeKey>,
    status_line: String,
}

impl FocusBridge {
    pub fn ghost(&self) -> Option<&NodeKey> {
        self.ghost.as_ref()
    }

    pub fn selected(&self) -> Option<&NodeKey> {
        self.selected.as_ref()
    }

    pub fn expanded(&self) -> &BTreeSet<NodeKey> {
        &self.expanded
    }

    pub fn is_expanded(&self, key: &NodeKey) -> bool {
        self.expanded.contains(key)
    }

    pub fn status_line(&self) -> &str {
        if self.status_line.is_empty() {
            WAITING_MESSAGE
        } else {
            &self.status_line
        }
    }

    pub fn select(&mut self, key: Option<NodeKey>) {
        self.selected = key;
    }

    pub fn toggle_expanded(&mut self, key: &NodeKey) {
        if !self.expanded.remove(key) {
            self.expanded.insert(key.clone());
        }
    }

    /// Moves the ghost marker to `activity`. The previous marker is always
    /// cleared first.
    pub fn apply_activity(&mut self, activity: Option<&Activity>, index: &NodeIndex) {
        self.ghost = None;
        let Some(activity) = activity else {
            self.status_line = WAITING_MESSAGE.to_string();
            return;
        };

        // The endpoint id decides the key when present; a missing endpoint
        // does not fall back to its target.
        let resolved = match (&activity.endpoint_id, &activity.target_id) {
            (Some(ep), _) => Some(NodeKey::endpoint(ep)),
            (None, Some(t)) => Some(NodeKey::target(t)),
            (None, None) => None,
        }
        .filter(|k| index.contains(k));

        match resolved {
            Some(key) => {
                self.expanded.extend(index.ancestors(&key));
                self.ghost = Some(key);
                self.status_line = format!("{} @ {}", activity.action, activity.timestamp);
            }
            None => {
                self.status_line = format!("{} -> {}", activity.action, activity.result);
            }
        }
    }

    /// Drops highlight state pointing at keys the tree no longer has.
    pub fn retain_known(&mut self, index: &NodeIndex) {
        if self.ghost.as_ref().is_some_and(|k| !index.contains(k)) {
            self.ghost = None;
        }
        if self.selected.as_ref().is_some_and(|k| !index.contains(k)) {
            self.selected = None;
        }
        self.expanded.retain(|k| index.contains(k));
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{CanonicalTree, EntityId};
    use crate::graph::normalize::{normalize, RawTree};
    use ghostmap_core::VisualMap;
    use serde_json::json;

    fn tree() -> CanonicalTree {
        let map: VisualMap = serde_json::from_value(json!({
            "project": {"id": 1, "name": "acme"},
            "targets": [{"id": 7, "hostname": "h", "urls": [
                {"url": "/login", "endpoints": [{"id": 42, "method": "POST"}]}
            ]}]
        }))
        .unwrap();
        normalize(RawTree::VisualMap(&map))
    }

    fn activity(target: Option<&str>, endpoint: Option<&str>) -> Activity {
        Activity {
            action: "sqlmap".into(),
            result: "no injection".into(),
            timestamp: "12:00".into(),
            target_id: target.map(EntityId::from),
            endpoint_id: endpoint.map(EntityId::from),
            ..Activity::default()
        }
    }

    #[test]
    fn endpoint_wins_and_path_expands() {
        let tree = tree();
        let mut focus = FocusBridge::default();
        focus.apply_activity(Some(&activity(Some("7"), Some("42"))), tree.index());

        assert_eq!(focus.ghost(), Some(&NodeKey("endpoint:42".into())));
        assert!(focus.is_expanded(&NodeKey("url:7:/login".into())));
        assert!(focus.is_expanded(&NodeKey("target:7".into())));
        assert!(focus.is_expanded(&NodeKey("project:1".into())));
        assert_eq!(focus.status_line(), "sqlmap @ 12:00");
    }

    #[test]
    fn unknown_endpoint_degrades_to_status_line() {
        let tree = tree();
        let mut focus = FocusBridge::default();
        focus.apply_activity(Some(&activity(Some("7"), Some("999"))), tree.index());
        assert_eq!(focus.ghost(), None);
        assert_eq!(focus.status_line(), "sqlmap -> no injection");

        focus.apply_activity(Some(&activity(Some("7"), None)), tree.index());
        assert_eq!(focus.ghost(), Some(&NodeKey("target:7".into())));
    }

    #[test]
    fn id_less_activity_clears_marker() {
        let tree = tree();
        let mut focus = FocusBridge::default();
        focus.apply_activity(Some(&activity(None, Some("42"))), tree.index());
        assert!(focus.ghost().is_some());

        focus.apply_activity(Some(&activity(None, None)), tree.index());
        assert_eq!(focus.ghost(), None);
        assert_eq!(focus.status_line(), "sqlmap -> no injection");

        focus.apply_activity(None, tree.index());
        assert_eq!(focus.status_line(), WAITING_MESSAGE);
    }

    #[test]
    fn selection_is_independent_of_ghost() {
        let tree = tree();
        let mut focus = FocusBridge::default();
        focus.select(Some(NodeKey("target:7".into())));
        focus.apply_activity(Some(&activity(None, Some("42"))), tree.index());
        assert_eq!(focus.selected(), Some(&NodeKey("target:7".into())));

        focus.retain_known(CanonicalTree::default().index());
        assert_eq!(focus.selected(), None);
        assert_eq!(focus.ghost(), None);
        assert!(focus.expanded().is_empty());
    }
}
