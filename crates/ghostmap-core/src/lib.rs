use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Entity ids arrive either as JSON numbers or as strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum WireId {
    Num(i64),
    Text(String),
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireId::Num(n) => write!(f, "{n}"),
            WireId::Text(s) => f.write_str(s),
        }
    }
}

// Explicit `null` for a list is treated like an absent list.
fn nullable<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectSummary {
    pub id: Option<WireId>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatsPayload {
    pub targets: usize,
    pub urls: usize,
    pub endpoints: usize,
    pub findings: usize,
}

/// `GET /api/projects/:id/visual-map`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisualMap {
    pub project: Option<ProjectSummary>,
    #[serde(deserialize_with = "nullable")]
    pub targets: Vec<TargetPayload>,
    pub stats: Option<StatsPayload>,
}

/// One entry of `GET /api/projects/tree`: the project fields plus its targets,
/// whose endpoints are listed flat.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectTreeEntry {
    pub id: Option<WireId>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub targets: Vec<TargetPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TargetPayload {
    pub id: Option<WireId>,
    pub project_id: Option<WireId>,
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub notes: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub urls: Vec<UrlPayload>,
    #[serde(deserialize_with = "nullable")]
    pub endpoints: Vec<EndpointPayload>,
    #[serde(deserialize_with = "nullable")]
    pub recommendations: Vec<RecommendationPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UrlPayload {
    pub url: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub endpoints: Vec<EndpointPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointPayload {
    pub id: Option<WireId>,
    pub target_id: Option<WireId>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub statuses: Vec<StatusPayload>,
    #[serde(deserialize_with = "nullable")]
    pub findings: Vec<FindingPayload>,
    pub request_headers: Option<Value>,
    pub headers: Option<Value>,
    pub request_body: Option<Value>,
    pub body: Option<Value>,
    pub response_status_code: Option<Value>,
    pub response_headers: Option<Value>,
    pub response_body: Option<Value>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusPayload {
    pub id: Option<WireId>,
    pub status: Option<String>,
    pub test_type: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FindingPayload {
    pub id: Option<WireId>,
    pub title: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommendationPayload {
    pub id: Option<WireId>,
    #[serde(alias = "text")]
    pub recommendation_text: Option<String>,
    pub priority: Option<i64>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSummary {
    pub id: Option<WireId>,
    pub project_id: Option<WireId>,
    pub label: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
}

/// `GET /api/sessions/:id/timeline`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelinePayload {
    pub session: Option<SessionSummary>,
    #[serde(deserialize_with = "nullable")]
    pub activities: Vec<ActivityPayload>,
    pub total: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActivityPayload {
    pub id: Option<WireId>,
    pub event_type: Option<String>,
    pub message: Option<String>,
    pub action: Option<String>,
    pub result: Option<String>,
    pub timestamp: Option<String>,
    pub target_id: Option<WireId>,
    pub endpoint_id: Option<WireId>,
    pub severity: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub tools: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub is_finding: bool,
}

/// `GET /api/ghost-activity`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GhostActivity {
    pub activity: Option<String>,
    pub target: Option<String>,
    pub status: Option<String>,
}

/// Body of `POST /api/endpoints/:id/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of `PUT /api/status/:id`; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of `POST /api/targets/:id/recommendations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewRecommendation {
    pub recommendation_text: String,
    pub priority: i64,
}

/// Body of `POST /api/projects`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_accept_numbers_and_strings() {
        let n: WireId = serde_json::from_value(json!(42)).unwrap();
        let s: WireId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(n.to_string(), "42");
        assert_eq!(s.to_string(), "abc");
    }

    #[test]
    fn visual_map_tolerates_nulls_and_missing_fields() {
        let raw = json!({
            "project": {"id": 1, "name": "acme"},
            "targets": [
                {"id": 3, "hostname": "api.acme.test", "urls": null, "recommendations": null},
                {"id": 4, "urls": [{"url": "/login", "endpoints": [{"id": 9, "statuses": null}]}]}
            ]
        });
        let map: VisualMap = serde_json::from_value(raw).unwrap();
        assert_eq!(map.targets.len(), 2);
        assert!(map.targets[0].urls.is_empty());
        assert_eq!(map.targets[1].urls[0].endpoints[0].id, Some(WireId::Num(9)));
        assert!(map.targets[1].urls[0].endpoints[0].statuses.is_empty());
        assert!(map.stats.is_none());
    }

    #[test]
    fn recommendation_accepts_short_text_key() {
        let rec: RecommendationPayload =
            serde_json::from_value(json!({"text": "try idor", "priority": 2})).unwrap();
        assert_eq!(rec.recommendation_text.as_deref(), Some("try idor"));
        assert_eq!(rec.priority, Some(2));
    }

    #[test]
    fn status_update_omits_unset_fields() {
        let body = serde_json::to_value(StatusUpdate {
            notes: Some("retested".into()),
            ..StatusUpdate::default()
        })
        .unwrap();
        assert_eq!(body, json!({"notes": "retested"}));
    }
}
