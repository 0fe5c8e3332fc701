use crate::{
    api::slack::SlackApi,
    context::RunContext,
    models::{
        StagedFile,
        slack::{File, Message},
    },
};
use anyhow::{Context, Result, bail};
use chrono::DateTime;
use log::{debug, error, info, warn};
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Downloads attachments into a scratch directory, once per remote id.
///
/// The directory is removed when the stager is dropped or closed, so staged
/// paths are only valid while it is alive.
#[derive(Debug)]
pub struct FileStager {
    dir: TempDir,
    staged: HashMap<String, StagedFile>,
    /// Ids whose download failed, never retried within the run
    failed: HashSet<String>,
}

impl FileStager {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("slackarc_")
            .tempdir()
            .context("cannot create scratch directory")?;
        debug!("scratch directory {}", dir.path().display());

        Ok(Self {
            dir,
            staged: HashMap::new(),
            failed: HashSet::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn get(&self, file_id: &str) -> Option<&StagedFile> {
        self.staged.get(file_id)
    }

    /// Stage every non-empty attachment of `messages`.
    ///
    /// A failed download drops that attachment from the archive instead of
    /// failing the run. Only an interrupted run is fatal here.
    pub async fn stage_all<'a, A, I>(
        &mut self,
        ctx: &RunContext,
        api: &A,
        messages: I,
    ) -> Result<usize>
    where
        A: SlackApi,
        I: IntoIterator<Item = &'a Message>,
    {
        // Slack reports spurious zero-byte file records
        let files = messages
            .into_iter()
            .flat_map(|message| message.files.iter())
            .filter(|file| file.size > 0);

        for file in files {
            if self.failed.contains(&file.id) {
                continue;
            }

            match self.stage(ctx, api, file).await {
                Ok(_) => {}
                Err(e) if ctx.is_done() => return Err(e),
                Err(e) => warn!("skipping attachment {} ({}): {:#}", file.id, file.name, e),
            }
        }

        info!("staged {} files", self.staged.len());
        Ok(self.staged.len())
    }

    pub async fn stage<A: SlackApi>(
        &mut self,
        ctx: &RunContext,
        api: &A,
        file: &File,
    ) -> Result<PathBuf> {
        if let Some(staged) = self.staged.get(&file.id) {
            return Ok(staged.path.clone());
        }
        if self.failed.contains(&file.id) {
            bail!("download of attachment {} already failed", file.id);
        }

        if file.id.is_empty() || file.id.contains(['/', '\\']) || file.id.starts_with('.') {
            bail!("refusing to stage attachment with id {:?}", file.id);
        }

        let path = self.dir.path().join(&file.id);
        let mut sink = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("cannot create {}", path.display()))?;

        let downloaded = ctx.run(api.download_file(&file.url_private, &mut sink)).await;
        drop(sink);

        let bytes = match downloaded {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    error!("cannot remove partial file {}: {}", path.display(), remove_err);
                }
                self.failed.insert(file.id.clone());
                return Err(e.context(format!("download of attachment {} failed", file.id)));
            }
        };

        debug!("staged {} ({} bytes) at {}", file.id, bytes, path.display());

        self.staged.insert(
            file.id.clone(),
            StagedFile {
                id: file.id.clone(),
                path: path.clone(),
                name: file.name.clone(),
                timestamp: DateTime::from_timestamp(file.timestamp, 0).unwrap_or_default(),
            },
        );

        Ok(path)
    }

    /// Remove the scratch directory now instead of on drop.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("cannot remove scratch directory {}", path.display()))
    }
}
