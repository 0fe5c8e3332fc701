use crate::{api::slack::SlackApi, context::RunContext, models::slack::Message};
use anyhow::Result;
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};

/// Run-scoped cache of author id to display name.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    cache: HashMap<String, String>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Record a name unless the id already has one.
    pub fn insert(&mut self, user_id: &str, name: &str) {
        self.cache
            .entry(user_id.to_string())
            .or_insert_with(|| name.to_string());
    }

    pub fn name_of(&self, user_id: &str) -> Option<&str> {
        self.cache.get(user_id).map(String::as_str)
    }

    /// Look up every author id not already cached. Messages posted under an
    /// explicit name are skipped.
    pub async fn resolve_all<'a, A, I>(
        &mut self,
        ctx: &RunContext,
        api: &A,
        messages: I,
    ) -> Result<usize>
    where
        A: SlackApi,
        I: IntoIterator<Item = &'a Message>,
    {
        let pending: BTreeSet<String> = messages
            .into_iter()
            .filter(|message| message.author_name().is_none())
            .filter_map(Message::author_id)
            .filter(|user_id| !self.cache.contains_key(*user_id))
            .map(str::to_string)
            .collect();

        for user_id in &pending {
            self.resolve(ctx, api, user_id).await?;
        }

        Ok(pending.len())
    }

    /// Resolve a single id. A failed lookup caches the id as its own name;
    /// only an interrupted run turns it into an error.
    pub async fn resolve<A: SlackApi>(
        &mut self,
        ctx: &RunContext,
        api: &A,
        user_id: &str,
    ) -> Result<String> {
        if let Some(name) = self.cache.get(user_id) {
            return Ok(name.clone());
        }

        let name = match ctx.run(api.user_display_name(user_id)).await {
            Ok(name) => {
                debug!("resolved {} as {}", user_id, name);
                name
            }
            Err(e) if ctx.is_done() => {
                return Err(e.context(format!("users.profile.get failed for {}", user_id)));
            }
            Err(e) => {
                warn!("cannot resolve user {}, keeping the id: {:#}", user_id, e);
                user_id.to_string()
            }
        };

        self.insert(user_id, &name);
        Ok(name)
    }

    pub fn display_name(&self, message: &Message) -> String {
        if let Some(name) = message.author_name() {
            return name.to_string();
        }

        match message.author_id() {
            Some(user_id) => self.name_of(user_id).unwrap_or(user_id).to_string(),
            None => String::new(),
        }
    }

    /// Replace every literal occurrence of each cached id with its name.
    ///
    /// Plain substring substitution in no particular order: an id that is a
    /// substring of another id can clobber part of it.
    pub fn rewrite(&self, text: &str) -> String {
        self.cache
            .iter()
            .fold(text.to_string(), |acc, (user_id, name)| {
                acc.replace(user_id.as_str(), name)
            })
    }
}
