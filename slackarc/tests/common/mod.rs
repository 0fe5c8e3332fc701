#![allow(dead_code)]

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use slackarc::api::slack::SlackApi;
use slackarc::models::slack::{File, Message, MessagesPage, PageRequest, ResponseMetadata};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub history: Vec<PageRequest>,
    pub replies: Vec<PageRequest>,
    pub profiles: Vec<String>,
    pub downloads: Vec<String>,
}

/// In-memory Slack serving canned pages. Cursors are "page-N".
#[derive(Default)]
pub struct FakeSlack {
    pub history: Vec<MessagesPage>,
    pub replies: HashMap<String, Vec<MessagesPage>>,
    pub profiles: HashMap<String, String>,
    pub files: HashMap<String, Vec<u8>>,
    pub fail_history: Option<String>,
    pub endless_history: bool,
    pub calls: Mutex<Calls>,
}

impl FakeSlack {
    pub fn with_history(messages: Vec<Message>) -> Self {
        Self {
            history: pages(vec![messages]),
            ..Self::default()
        }
    }

    pub fn thread(mut self, parent_ts: &str, replies: Vec<Message>) -> Self {
        self.replies.insert(parent_ts.to_string(), pages(vec![replies]));
        self
    }

    pub fn profile(mut self, user_id: &str, name: &str) -> Self {
        self.profiles.insert(user_id.to_string(), name.to_string());
        self
    }

    pub fn file_body(mut self, file_id: &str, body: &[u8]) -> Self {
        self.files.insert(file_url(file_id), body.to_vec());
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }
}

fn page_index(request: &PageRequest) -> usize {
    request
        .cursor
        .as_deref()
        .and_then(|c| c.strip_prefix("page-"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn page_at(pages: &[MessagesPage], request: &PageRequest) -> Result<MessagesPage> {
    if pages.is_empty() {
        return Ok(page(Vec::new(), false, None));
    }
    pages
        .get(page_index(request))
        .cloned()
        .ok_or_else(|| anyhow!("invalid_cursor"))
}

#[async_trait]
impl SlackApi for FakeSlack {
    async fn conversations_history(&self, request: &PageRequest) -> Result<MessagesPage> {
        self.calls.lock().unwrap().history.push(request.clone());

        if let Some(error) = &self.fail_history {
            bail!("{}", error);
        }

        if self.endless_history {
            let n = page_index(request);
            return Ok(page(
                vec![msg(&format!("{}.000001", 1_700_000_000 + n), "U1", "more")],
                true,
                Some(format!("page-{}", n + 1)),
            ));
        }

        page_at(&self.history, request)
    }

    async fn conversations_replies(&self, request: &PageRequest) -> Result<MessagesPage> {
        self.calls.lock().unwrap().replies.push(request.clone());

        let ts = request.ts.clone().unwrap_or_default();
        match self.replies.get(&ts) {
            Some(pages) => page_at(pages, request),
            None => bail!("thread_not_found"),
        }
    }

    async fn user_display_name(&self, user_id: &str) -> Result<String> {
        self.calls.lock().unwrap().profiles.push(user_id.to_string());

        self.profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| anyhow!("user_not_found"))
    }

    async fn download_file(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64> {
        self.calls.lock().unwrap().downloads.push(url.to_string());

        let body = self
            .files
            .get(url)
            .ok_or_else(|| anyhow!("file_not_found"))?;
        sink.write_all(body).await?;
        sink.flush().await?;
        Ok(body.len() as u64)
    }
}

pub fn page(messages: Vec<Message>, has_more: bool, next_cursor: Option<String>) -> MessagesPage {
    MessagesPage {
        ok: true,
        error: None,
        messages,
        has_more,
        response_metadata: next_cursor.map(|next_cursor| ResponseMetadata { next_cursor }),
    }
}

/// Chain message batches into pages linked by "page-N" cursors.
pub fn pages(batches: Vec<Vec<Message>>) -> Vec<MessagesPage> {
    let count = batches.len();
    batches
        .into_iter()
        .enumerate()
        .map(|(i, messages)| {
            let has_more = i + 1 < count;
            page(messages, has_more, has_more.then(|| format!("page-{}", i + 1)))
        })
        .collect()
}

pub fn msg(ts: &str, user: &str, text: &str) -> Message {
    Message {
        ts: ts.to_string(),
        user: Some(user.to_string()),
        text: text.to_string(),
        ..Message::default()
    }
}

pub fn file_url(file_id: &str) -> String {
    format!("https://files.example.com/{}", file_id)
}

pub fn file(file_id: &str, size: u64) -> File {
    File {
        id: file_id.to_string(),
        name: format!("{}.bin", file_id.to_lowercase()),
        size,
        timestamp: 1_700_000_000,
        url_private: file_url(file_id),
    }
}
