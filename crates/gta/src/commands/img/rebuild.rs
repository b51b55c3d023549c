use clap::Args;
use gta_img::{ImgSession, RebuildOptions};
use miette::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct RebuildArgs {
    /// The IMG archive to rewrite
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Copy the original archive to a .bak sibling before replacing it
    #[arg(long, default_value_t = false)]
    backup: bool,

    /// Re-read the rebuilt archive before renaming it into place
    #[arg(long, default_value_t = true)]
    verify: bool,
}

impl RebuildArgs {
    /// A commit with an empty queue repacks the payload region with fresh
    /// sequential offsets, squeezing out holes left by older tooling.
    pub fn handle(&self) -> Result<()> {
        let mut session = ImgSession::open(&self.file)?;

        let result = session.commit(
            RebuildOptions::builder()
                .create_backup(self.backup)
                .verify_after_write(self.verify)
                .build(),
        )?;

        info!(
            "repacked {} entries into {}",
            result.entries.len(),
            self.file.display()
        );
        Ok(())
    }
}
