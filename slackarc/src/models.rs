pub mod slack;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::HashSet, path::PathBuf};

/// Time window of a run. A missing side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl Bounds {
    pub fn new(since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        Self { since, until }
    }

    pub fn oldest(&self) -> Option<String> {
        self.since.map(|since| since.timestamp().to_string())
    }

    pub fn latest(&self) -> Option<String> {
        self.until.map(|until| until.timestamp().to_string())
    }
}

/// Local copy of a remote attachment, valid while the collector that staged it is alive.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StagedFile {
    pub id: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

impl StagedFile {
    pub fn export_name(&self) -> String {
        export_file_name(&self.id, &self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputNode {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<StagedFile>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<OutputNode>,
}

/// Every staged file referenced by roots and replies, first reference wins.
pub fn staged_files(nodes: &[OutputNode]) -> Vec<&StagedFile> {
    let mut seen = HashSet::new();

    nodes
        .iter()
        .flat_map(|node| node.files.iter().chain(node.replies.iter().flat_map(|r| r.files.iter())))
        .filter(|file| seen.insert(file.id.as_str()))
        .collect()
}

/// Name used for an attachment in every export target.
pub fn export_file_name(id: &str, name: &str) -> String {
    format!("{}_{}", id, name.replace(['/', '\\'], "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn staged(id: &str) -> StagedFile {
        StagedFile {
            id: id.to_string(),
            path: PathBuf::from(format!("/tmp/{id}")),
            name: format!("{id}.png"),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    fn node(id: &str, files: Vec<StagedFile>, replies: Vec<OutputNode>) -> OutputNode {
        OutputNode {
            id: id.to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            author: "alice".to_string(),
            text: String::new(),
            files,
            replies,
        }
    }

    #[test]
    fn test_bounds_render_unix_seconds() {
        let bounds = Bounds::new(
            Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
            Some(Utc.timestamp_opt(1_700_003_600, 0).unwrap()),
        );

        assert_eq!(bounds.oldest().as_deref(), Some("1700000000"));
        assert_eq!(bounds.latest().as_deref(), Some("1700003600"));
        assert_eq!(Bounds::default().oldest(), None);
        assert_eq!(Bounds::default().latest(), None);
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("F01", "report.pdf"), "F01_report.pdf");
        assert_eq!(export_file_name("F02", "a/b\\c.txt"), "F02_a_b_c.txt");
    }

    #[test]
    fn test_staged_files_flattens_roots_and_replies() {
        let nodes = vec![
            node(
                "1.000001",
                vec![staged("F1")],
                vec![node("1.000002", vec![staged("F2"), staged("F1")], vec![])],
            ),
            node("2.000001", vec![staged("F3")], vec![]),
        ];

        let ids: Vec<_> = staged_files(&nodes).iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["F1", "F2", "F3"]);
    }

    #[test]
    fn test_output_node_json_omits_empty_lists() {
        let json = serde_json::to_value(node("1.000001", vec![], vec![])).unwrap();

        assert!(json.get("files").is_none());
        assert!(json.get("replies").is_none());
        assert_eq!(json["author"], "alice");
    }
}
