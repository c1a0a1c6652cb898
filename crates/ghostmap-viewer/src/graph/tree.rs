use url::Url;

pub const ROOT_X: f32 = 0.0;
pub const ROOT_Y: f32 = 20.0;
pub const TARGET_Y: f32 = 170.0;
pub const TARGET_GAP: f32 = 340.0;
pub const ROUTE_Y_OFFSET: f32 = 120.0;
pub const ROUTE_VERTICAL_GAP: f32 = 190.0;
pub const METHOD_Y_OFFSET: f32 = 88.0;
pub const METHOD_GAP: f32 = 120.0;
pub const URL_GAP: f32 = 280.0;
const COLUMN_MARGIN: f32 = 60.0;

const PARSE_BASE: &str = "http://local";

/// Horizontal offset of child `index` of `count`, centred on the parent.
pub fn fan_offset(index: usize, count: usize, gap: f32) -> f32 {
    if count == 0 {
        return 0.0;
    }
    (index as f32 - (count as f32 - 1.0) / 2.0) * gap
}

/// Spacing that keeps `widest` children of neighbouring parents from overlapping.
pub fn column_gap(widest: usize, child_gap: f32, min_gap: f32) -> f32 {
    let needed = widest.saturating_sub(1) as f32 * child_gap + COLUMN_MARGIN + child_gap;
    needed.max(min_gap)
}

fn parse(raw: &str) -> Option<Url> {
    if raw.chars().any(char::is_whitespace) {
        return None;
    }
    Url::parse(PARSE_BASE).ok()?.join(raw).ok()
}

fn naive_path(raw: &str) -> &str {
    let no_fragment = raw.split('#').next().unwrap_or("");
    no_fragment.split('?').next().unwrap_or("")
}

/// First non-empty path segment as `"/seg"`, `"/"` when there is none.
pub fn get_path_group(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return "/".to_string();
    };
    let first = match parse(raw) {
        Some(url) => url
            .path_segments()
            .and_then(|mut segs| segs.find(|s| !s.is_empty()).map(str::to_string)),
        None => naive_path(raw)
            .split(|c: char| c == '/' || c.is_whitespace())
            .find(|s| !s.is_empty())
            .map(str::to_string),
    };
    match first {
        Some(seg) => format!("/{seg}"),
        None => "/".to_string(),
    }
}

/// Path plus query, `"/"` when empty.
pub fn get_endpoint_path(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return "/".to_string();
    };
    if let Some(url) = parse(raw) {
        let mut out = url.path().to_string();
        if out.is_empty() {
            out.push('/');
        }
        if let Some(q) = url.query() {
            out.push('?');
            out.push_str(q);
        }
        return out;
    }
    let clean = raw.split('#').next().unwrap_or("").trim();
    if clean.is_empty() {
        return "/".to_string();
    }
    if clean.starts_with('/') {
        return clean.to_string();
    }
    match clean.split('?').next() {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => "/".to_string(),
    }
}
