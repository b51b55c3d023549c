use clap::Args;
use gta_img::{EntryKind, ImgSession, ImgVersion};
use gta_txd::detect_sub_format;
use miette::{IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::io::Read;
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// An input IMG archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let mut session = ImgSession::open(&self.file)?;

        let version = match session.version() {
            ImgVersion::V1 => "V1 (.dir/.img pair)",
            ImgVersion::V2 => "V2 (single file)",
            ImgVersion::Unknown => "unknown",
        };
        println!("{} {}", "format:".bold(), version);
        println!("{} {}", "entries:".bold(), session.entries().len());

        for warning in session.warnings().to_vec() {
            eprintln!("{} {}", "warning:".yellow().bold(), warning);
        }

        // RenderWare payloads carry a version stamp in their leading chunk
        // header; report it for model and texture entries.
        let count = session.entries().len();
        for i in 0..count {
            let entry = &session.entries()[i];
            let kind = entry.kind();
            let name = entry.name.to_string();
            if !matches!(kind, EntryKind::Model | EntryKind::Texture) {
                continue;
            }

            let mut header = [0u8; 12];
            let mut file = session.by_index(i)?;
            let read = file.read(&mut header).into_diagnostic()?;
            let (raw, label) = detect_sub_format(&header[..read]);

            println!("{name:<24} {kind:<10} RenderWare {label} (0x{raw:08X})");
        }

        Ok(())
    }
}
