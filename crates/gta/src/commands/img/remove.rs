use clap::Args;
use gta_img::{ImgSession, RebuildOptions};
use miette::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct RemoveArgs {
    /// The IMG archive to modify
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Entry names to remove, matched case-insensitively
    #[arg(value_name = "NAME", required = true)]
    names: Vec<String>,

    /// Copy the original archive to a .bak sibling before replacing it
    #[arg(long, default_value_t = false)]
    backup: bool,

    /// Re-read the rebuilt archive before renaming it into place
    #[arg(long, default_value_t = true)]
    verify: bool,
}

impl RemoveArgs {
    pub fn handle(&self) -> Result<()> {
        let mut session = ImgSession::open(&self.file)?;

        for name in &self.names {
            session.stage_remove(name.clone());
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
