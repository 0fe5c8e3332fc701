use crate::{formatter::Formatter, models::StagedFile};
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exporter {
    /// Discard everything, useful to dry-run a collection
    None,
    /// Write the archive to `log_file` (stdout when unset) and copy
    /// attachments into `file_dir`
    Local {
        log_file: Option<PathBuf>,
        file_dir: PathBuf,
    },
}

impl Exporter {
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        match self {
            Exporter::None => Ok(()),
            Exporter::Local {
                log_file: Some(log_file),
                ..
            } => {
                if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("cannot create {}", parent.display()))?;
                }
                tokio::fs::write(log_file, data)
                    .await
                    .with_context(|| format!("cannot write archive to {}", log_file.display()))?;
                info!("archive written to {}", log_file.display());
                Ok(())
            }
            Exporter::Local { log_file: None, .. } => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(data).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
                Ok(())
            }
        }
    }

    /// Copy staged files out of the scratch directory under their export names.
    pub async fn write_files(&self, files: &[&StagedFile], formatter: &Formatter) -> Result<usize> {
        let file_dir = match self {
            Exporter::None => return Ok(0),
            Exporter::Local { file_dir, .. } => file_dir,
        };

        tokio::fs::create_dir_all(file_dir)
            .await
            .with_context(|| format!("cannot create {}", file_dir.display()))?;

        for file in files {
            let destination = file_dir.join(formatter.write_file_name(file));
            debug!("copy {} -> {}", file.path.display(), destination.display());
            tokio::fs::copy(&file.path, &destination)
                .await
                .with_context(|| {
                    format!(
                        "cannot copy {} to {}",
                        file.path.display(),
                        destination.display()
                    )
                })?;
        }

        info!("exported {} files to {}", files.len(), file_dir.display());
        Ok(files.len())
    }
}
