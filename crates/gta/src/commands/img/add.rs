use clap::Args;
use gta_img::{ImgSession, RebuildOptions};
use miette::{miette, Context, IntoDiagnostic, Result};
use std::path::PathBuf;
use tracing::info;
use walkdir::WalkDir;

#[derive(Args)]
pub struct AddArgs {
    /// The IMG archive to modify
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Files to add; each is stored under its file name
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Add every file found under this directory
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Replace entries that already exist instead of failing
    #[arg(long, default_value_t = false)]
    replace: bool,

    /// Copy the original archive to a .bak sibling before replacing it
    #[arg(long, default_value_t = false)]
    backup: bool,

    /// Re-read the rebuilt archive before renaming it into place
    #[arg(long, default_value_t = true)]
    verify: bool,
}

impl AddArgs {
    pub fn handle(&self) -> Result<()> {
        let mut session = ImgSession::open(&self.file)?;

        let mut inputs = self.inputs.clone();
        if let Some(directory) = &self.directory {
            inputs.extend(
                WalkDir::new(directory)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .map(|e| e.into_path()),
            );
        }

        if inputs.is_empty() {
            return Err(miette!("nothing to add"));
        }

        for input in &inputs {
            let name = input
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| miette!("cannot derive an entry name from {}", input.display()))?
                .to_string();
            let data = std::fs::read(input)
                .into_diagnostic()
                .context(format!("reading {}", input.display()))?;

            info!("staging {} ({} bytes)", name, data.len());
            let exists = session
                .entries()
                .iter()
                .any(|e| e.matches_name(&name));
            if exists && self.replace {
                session.stage_replace(name, data);
            } else {
                session.stage_add(name, data);
            }
        }

        let result = session.commit(
            RebuildOptions::builder()
                .create_backup(self.backup)
                .verify_after_write(self.verify)
                .build(),
        )?;

        info!("archive now holds {} entries", result.entries.len());
        Ok(())
    }
}
