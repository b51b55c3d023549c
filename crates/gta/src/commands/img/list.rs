use clap::Args;
use gta_img::ImgSession;
use miette::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// An input IMG archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let session = ImgSession::open(&self.file)?;

        println!(
            "{:<24} {:>12} {:>12}  {}",
            "name".bold(),
            "offset".bold(),
            "size".bold(),
            "kind".bold()
        );
        for entry in session.entries() {
            println!(
                "{:<24} {:>12} {:>12}  {}",
                entry.name,
                entry.offset,
                entry.size,
                entry.kind()
            );
        }

        for warning in session.warnings() {
            eprintln!("{} {}", "warning:".yellow().bold(), warning);
        }

        Ok(())
    }
}
