use crate::models::slack::{MessagesPage, PageRequest, ProfileResponse};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, header};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const DEFAULT_API_URL: &str = "https://slack.com/api";

#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn conversations_history(&self, request: &PageRequest) -> Result<MessagesPage>;
    async fn conversations_replies(&self, request: &PageRequest) -> Result<MessagesPage>;
    async fn user_display_name(&self, user_id: &str) -> Result<String>;
    /// Stream the body at `url` into `sink`, returning the number of bytes written.
    async fn download_file(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64>;
}

pub struct SlackClient {
    client: Client,
    base_url: String,
}

impl SlackClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Slack token contains invalid characters")?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_page(&self, method: &str, request: &PageRequest) -> Result<MessagesPage> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self.client.get(&url).query(request).send().await?;
        let response = ensure_success(method, response).await?;

        let page: MessagesPage = response.json().await?;
        if !page.ok {
            bail!(
                "{} returned error: {}",
                method,
                page.error.as_deref().unwrap_or("unknown_error")
            );
        }

        Ok(page)
    }
}

async fn ensure_success(method: &str, response: Response) -> Result<Response> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(anyhow!(
            "{} failed with status {}: {}",
            method,
            status,
            error_text
        ));
    }

    Ok(response)
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn conversations_history(&self, request: &PageRequest) -> Result<MessagesPage> {
        self.get_page("conversations.history", request).await
    }

    async fn conversations_replies(&self, request: &PageRequest) -> Result<MessagesPage> {
        if request.ts.is_none() {
            bail!("conversations.replies requires a parent timestamp");
        }
        self.get_page("conversations.replies", request).await
    }

    async fn user_display_name(&self, user_id: &str) -> Result<String> {
        let url = format!("{}/users.profile.get", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("user", user_id)])
            .send()
            .await?;
        let response = ensure_success("users.profile.get", response).await?;

        let profile: ProfileResponse = response.json().await?;
        if !profile.ok {
            bail!(
                "users.profile.get returned error for {}: {}",
                user_id,
                profile.error.as_deref().unwrap_or("unknown_error")
            );
        }

        profile
            .profile
            .and_then(|p| p.name())
            .ok_or_else(|| anyhow!("user {} has no display name", user_id))
    }

    async fn download_file(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64> {
        if url.is_empty() {
            bail!("attachment has no download url");
        }

        let response = self.client.get(url).send().await?;
        let response = ensure_success("file download", response).await?;

        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        Ok(written)
    }
}
