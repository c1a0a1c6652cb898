use anyhow::{Context, Result};
use std::ffi::OsString;
use url::Url;

use crate::graph::layout::LayoutStrategyKind;
use crate::util::config::ViewerConfig;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerArgs {
    pub api: Option<String>,
    pub project: Option<String>,
    pub strategy: Option<LayoutStrategyKind>,
}

impl ViewerArgs {
    /// Flags win over the config file.
    pub fn apply_to(&self, cfg: &mut ViewerConfig) {
        if let Some(api) = &self.api {
            cfg.api_base = api.clone();
        }
        if let Some(strategy) = self.strategy {
            cfg.default_strategy = strategy;
        }
    }
}

pub fn parse_args() -> Result<ViewerArgs> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<ViewerArgs>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out = ViewerArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--api" {
            let Some(value) = args.next() else {
                anyhow::bail!("--api expects a base url");
            };
            out.api = Some(value.to_string_lossy().into_owned());
        } else if arg == "--project" {
            let Some(value) = args.next() else {
                anyhow::bail!("--project expects a project id");
            };
            out.project = Some(value.to_string_lossy().into_owned());
        } else if arg == "--url" {
            let Some(value) = args.next() else {
                anyhow::bail!("--url expects a page url");
            };
            out.project = project_from_query(&value.to_string_lossy())?;
        } else if arg == "--strategy" {
            let Some(value) = args.next() else {
                anyhow::bail!("--strategy expects direct-tree|path-grouped|global-path-grouped");
            };
            let value = value.to_string_lossy();
            let Some(kind) = LayoutStrategyKind::parse(&value) else {
                anyhow::bail!(
                    "invalid strategy: {value} (expected direct-tree|path-grouped|global-path-grouped)"
                );
            };
            out.strategy = Some(kind);
        } else {
            anyhow::bail!("unknown argument: {:?}", arg);
        }
    }

    Ok(out)
}

/// Reads `?project=<id>` from a page url; empty values count as absent.
pub fn project_from_query(page: &str) -> Result<Option<String>> {
    let url = Url::parse(page)
        .or_else(|_| Url::parse("http://local/").and_then(|base| base.join(page)))
        .with_context(|| format!("invalid page url {page:?}"))?;
    Ok(url
        .query_pairs()
        .find(|(k, _)| k == "project")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn parses_all_flags() {
        let parsed = parse_args_from(args(&[
            "--api",
            "http://10.0.0.2:5000",
            "--project",
            "12",
            "--strategy",
            "global",
        ]))
        .expect("args parsed");
        assert_eq!(parsed.api.as_deref(), Some("http://10.0.0.2:5000"));
        assert_eq!(parsed.project.as_deref(), Some("12"));
        assert_eq!(parsed.strategy, Some(LayoutStrategyKind::GlobalPathGrouped));

        let mut cfg = ViewerConfig::default();
        parsed.apply_to(&mut cfg);
        assert_eq!(cfg.api_base, "http://10.0.0.2:5000");
        assert_eq!(cfg.default_strategy, LayoutStrategyKind::GlobalPathGrouped);
    }

    #[test]
    fn page_url_carries_project() {
        let parsed =
            parse_args_from(args(&["--url", "http://localhost:5000/visual?project=7&x=1"])).unwrap();
        assert_eq!(parsed.project.as_deref(), Some("7"));
        assert_eq!(project_from_query("/visual?project=").unwrap(), None);
        assert_eq!(project_from_query("/visual").unwrap(), None);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args_from(args(&["--strategy", "radial"])).is_err());
        assert!(parse_args_from(args(&["--project"])).is_err());
        assert!(parse_args_from(args(&["--verbose"])).is_err());
    }
}
