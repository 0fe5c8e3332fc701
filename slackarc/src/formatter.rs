use crate::models::{OutputNode, StagedFile};
use anyhow::Result;
use chrono::{DateTime, Local, Utc};

pub const DEFAULT_REPLY_INDENT: &str = " | ";

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formatter {
    /// One line per message, replies prefixed with `reply_indent`
    Text { reply_indent: String },
    Json,
}

impl Formatter {
    pub fn text() -> Self {
        Formatter::Text {
            reply_indent: DEFAULT_REPLY_INDENT.to_string(),
        }
    }

    pub fn format(&self, nodes: &[OutputNode]) -> Result<Vec<u8>> {
        let sorted = sorted_by_time(nodes.iter());

        match self {
            Formatter::Text { reply_indent } => Ok(format_text(&sorted, reply_indent).into_bytes()),
            Formatter::Json => {
                let sorted: Vec<OutputNode> = sorted
                    .into_iter()
                    .map(|node| OutputNode {
                        replies: sorted_by_time(node.replies.iter())
                            .into_iter()
                            .cloned()
                            .collect(),
                        ..node.clone()
                    })
                    .collect();
                Ok(serde_json::to_vec_pretty(&sorted)?)
            }
        }
    }

    pub fn write_file_name(&self, file: &StagedFile) -> String {
        file.export_name()
    }
}

fn sorted_by_time<'a>(nodes: impl Iterator<Item = &'a OutputNode>) -> Vec<&'a OutputNode> {
    let mut nodes: Vec<_> = nodes.collect();
    nodes.sort_by_key(|node| node.timestamp);
    nodes
}

fn local_time(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

fn format_text(nodes: &[&OutputNode], reply_indent: &str) -> String {
    let mut lines = Vec::new();

    for node in nodes {
        let mut line = format!(
            "[{}] [{}] {}",
            local_time(&node.timestamp),
            node.author,
            node.text
        );
        for file in &node.files {
            line.push_str(&format!("\n(file: {})", file.export_name()));
        }
        lines.push(line);

        let continuation = format!("\n{}", reply_indent);
        for reply in sorted_by_time(node.replies.iter()) {
            let mut line = format!(
                "{}[{}] [{}] {}",
                reply_indent,
                local_time(&reply.timestamp),
                reply.author,
                reply.text.replace('\n', &continuation)
            );
            for file in &reply.files {
                line.push_str(&format!("\n{}(file: {})", reply_indent, file.export_name()));
            }
            lines.push(line);
        }
    }

    lines.join("\n")
}
