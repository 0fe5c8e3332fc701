use serde::{Deserialize, Serialize};

pub const THREAD_BROADCAST: &str = "thread_broadcast";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Message {
    #[serde(default)]
    pub ts: String,
    pub user: Option<String>,
    /// Set by bots and integrations that post under a custom name
    pub username: Option<String>,
    #[serde(default)]
    pub text: String,
    pub subtype: Option<String>,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub files: Vec<File>,
}

impl Message {
    pub fn author_id(&self) -> Option<&str> {
        self.user.as_deref().filter(|id| !id.is_empty())
    }

    pub fn author_name(&self) -> Option<&str> {
        self.username.as_deref().filter(|name| !name.is_empty())
    }

    pub fn is_thread_broadcast(&self) -> bool {
        self.subtype.as_deref() == Some(THREAD_BROADCAST)
    }

    pub fn has_replies(&self) -> bool {
        self.reply_count != 0
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct File {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
    /// Creation time in seconds since epoch
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub url_private: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

/// One page of `conversations.history` or `conversations.replies`
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MessagesPage {
    pub ok: bool,
    pub error: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub has_more: bool,
    pub response_metadata: Option<ResponseMetadata>,
}

impl MessagesPage {
    pub fn next_cursor(&self) -> Option<&str> {
        self.response_metadata
            .as_ref()
            .map(|meta| meta.next_cursor.as_str())
            .filter(|cursor| !cursor.is_empty())
    }
}

/// Query parameters shared by the history and replies listings.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct PageRequest {
    pub channel: String,
    /// Thread parent, only set for `conversations.replies`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    pub limit: u32,
}

impl PageRequest {
    pub fn with_cursor(&self, cursor: Option<String>) -> Self {
        Self {
            cursor,
            ..self.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileResponse {
    pub ok: bool,
    pub error: Option<String>,
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub real_name: String,
}

impl Profile {
    pub fn name(self) -> Option<String> {
        if !self.display_name.is_empty() {
            Some(self.display_name)
        } else if !self.real_name.is_empty() {
            Some(self.real_name)
        } else {
            None
        }
    }
}
