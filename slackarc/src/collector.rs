pub mod assembler;
pub mod identity;
pub mod stager;

use crate::{
    api::slack::SlackApi,
    context::RunContext,
    models::{
        Bounds, OutputNode,
        slack::{Message, MessagesPage, PageRequest},
    },
};
use anyhow::{Context, Result};
use identity::IdentityResolver;
use log::{debug, info};
use stager::FileStager;
use std::{collections::HashMap, path::Path};

pub const DEFAULT_HISTORY_LIMIT: u32 = 200;
pub const DEFAULT_PAGE_CAP: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Messages requested per page
    pub history_limit: u32,
    /// Pages fetched per listing before truncating
    pub page_cap: u32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            page_cap: DEFAULT_PAGE_CAP,
        }
    }
}

/// Raw result of the pagination stage.
#[derive(Debug, Default)]
pub struct Collected {
    pub messages: Vec<Message>,
    /// Parent ts to the replies listing, parent included
    pub threads: HashMap<String, Vec<Message>>,
}

impl Collected {
    pub fn reply_count(&self) -> usize {
        self.threads.values().map(Vec::len).sum()
    }

    /// Top-level messages followed by every thread reply.
    pub fn all_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().chain(self.threads.values().flatten())
    }
}

#[derive(Debug, Clone, Copy)]
enum Listing {
    History,
    Replies,
}

impl Listing {
    fn method(self) -> &'static str {
        match self {
            Listing::History => "conversations.history",
            Listing::Replies => "conversations.replies",
        }
    }
}

/// Owns everything a run accumulates: identity cache, staged files and the
/// scratch directory holding them.
pub struct Collector<A> {
    api: A,
    config: CollectorConfig,
    identities: IdentityResolver,
    stager: FileStager,
}

impl<A: SlackApi> Collector<A> {
    pub fn new(api: A, config: CollectorConfig) -> Result<Self> {
        Ok(Self {
            api,
            config,
            identities: IdentityResolver::new(),
            stager: FileStager::new()?,
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn identities(&self) -> &IdentityResolver {
        &self.identities
    }

    pub fn stager(&self) -> &FileStager {
        &self.stager
    }

    pub fn scratch_dir(&self) -> &Path {
        self.stager.path()
    }

    /// Collect, resolve authors, stage attachments and assemble the tree.
    ///
    /// Staged file paths in the result point into the scratch directory and
    /// stay valid until the collector is closed or dropped.
    pub async fn execute(
        &mut self,
        ctx: &RunContext,
        bounds: &Bounds,
        channel: &str,
    ) -> Result<Vec<OutputNode>> {
        let collected = self.collect(ctx, bounds, channel).await?;

        let resolved = self
            .identities
            .resolve_all(ctx, &self.api, collected.all_messages())
            .await?;
        info!("resolved {} users", resolved);

        self.stager
            .stage_all(ctx, &self.api, collected.all_messages())
            .await?;

        let nodes = assembler::assemble(&collected, &self.identities, &self.stager);
        info!("assembled {} messages", nodes.len());

        Ok(nodes)
    }

    /// Fetch the channel history within `bounds` and every thread hanging off it.
    pub async fn collect(
        &self,
        ctx: &RunContext,
        bounds: &Bounds,
        channel: &str,
    ) -> Result<Collected> {
        let request = PageRequest {
            channel: channel.to_string(),
            oldest: bounds.oldest(),
            latest: bounds.latest(),
            limit: self.config.history_limit,
            ..PageRequest::default()
        };

        let messages = self
            .fetch_pages(ctx, Listing::History, &request)
            .await
            .with_context(|| format!("cannot read history of channel {}", channel))?;
        info!("fetched {} messages", messages.len());

        let mut threads: HashMap<String, Vec<Message>> = HashMap::new();
        for parent in messages.iter().filter(|m| m.has_replies()) {
            if threads.contains_key(&parent.ts) {
                continue;
            }

            let request = PageRequest {
                ts: Some(parent.ts.clone()),
                ..request.clone()
            };
            let replies = self
                .fetch_pages(ctx, Listing::Replies, &request)
                .await
                .with_context(|| format!("cannot read thread {} of channel {}", parent.ts, channel))?;

            threads.insert(parent.ts.clone(), replies);
        }

        let collected = Collected { messages, threads };
        info!("fetched {} replies", collected.reply_count());

        Ok(collected)
    }

    async fn fetch_pages(
        &self,
        ctx: &RunContext,
        listing: Listing,
        request: &PageRequest,
    ) -> Result<Vec<Message>> {
        let method = listing.method();
        let mut messages = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 1..=self.config.page_cap {
            let request = request.with_cursor(cursor.take());
            let page: MessagesPage = match listing {
                Listing::History => ctx.run(self.api.conversations_history(&request)).await,
                Listing::Replies => ctx.run(self.api.conversations_replies(&request)).await,
            }
            .with_context(|| format!("{} failed", method))?;

            debug!(
                "{} page {}: {} messages, has_more={}",
                method,
                page_number,
                page.messages.len(),
                page.has_more
            );

            let next = page.next_cursor().map(str::to_string);
            messages.extend(page.messages);

            match next {
                Some(next) if page.has_more => cursor = Some(next),
                _ => return Ok(messages),
            }
        }

        debug!(
            "{} stopped after {} pages, remaining pages are dropped",
            method, self.config.page_cap
        );
        Ok(messages)
    }

    /// Remove the scratch directory. Dropping the collector does the same,
    /// this only surfaces the error.
    pub fn close(self) -> Result<()> {
        self.stager.close()
    }
}
