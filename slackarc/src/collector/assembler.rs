use super::{Collected, identity::IdentityResolver, stager::FileStager};
use crate::models::{OutputNode, slack::Message};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use log::error;

/// Build the root/reply tree from collected messages.
///
/// Thread broadcasts are skipped since the same message is already part of
/// its thread. Replies keep the order the API returned them in.
pub fn assemble(
    collected: &Collected,
    identities: &IdentityResolver,
    stager: &FileStager,
) -> Vec<OutputNode> {
    let mut nodes = Vec::new();

    for message in &collected.messages {
        if message.is_thread_broadcast() {
            continue;
        }

        let mut node = match to_node(message, identities, stager) {
            Ok(node) => node,
            Err(e) => {
                error!("dropping message {:?}: {:#}", message.ts, e);
                continue;
            }
        };

        if let Some(replies) = collected.threads.get(&message.ts) {
            node.replies = replies
                .iter()
                // the replies listing starts with the parent itself
                .filter(|reply| reply.ts != message.ts)
                .filter_map(|reply| match to_node(reply, identities, stager) {
                    Ok(node) => Some(node),
                    Err(e) => {
                        error!("dropping reply {:?} of {}: {:#}", reply.ts, message.ts, e);
                        None
                    }
                })
                .collect();
        }

        nodes.push(node);
    }

    nodes
}

fn to_node(
    message: &Message,
    identities: &IdentityResolver,
    stager: &FileStager,
) -> Result<OutputNode> {
    let timestamp = parse_ts(&message.ts)?;

    let files = message
        .files
        .iter()
        .filter_map(|file| stager.get(&file.id))
        .cloned()
        .collect();

    Ok(OutputNode {
        id: message.ts.clone(),
        timestamp,
        author: identities.display_name(message),
        text: identities.rewrite(&message.text),
        files,
        replies: Vec::new(),
    })
}

/// Parse a message ts of the form `<seconds>.<microseconds>`.
pub fn parse_ts(ts: &str) -> Result<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, ""));

    if frac.len() > 6 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("malformed message timestamp {:?}", ts));
    }

    let secs: i64 = secs
        .parse()
        .with_context(|| format!("malformed message timestamp {:?}", ts))?;
    let micros: u32 = if frac.is_empty() {
        0
    } else {
        format!("{:0<6}", frac).parse()?
    };

    DateTime::from_timestamp(secs, micros * 1_000)
        .ok_or_else(|| anyhow!("message timestamp {:?} is out of range", ts))
}
