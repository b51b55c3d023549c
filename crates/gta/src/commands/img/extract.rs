use clap::Args;
use gta_img::ImgSession;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{fs::File, path::PathBuf};
use tracing::info;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input IMG archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let mut session = ImgSession::open(&self.file)?;

        let count = session.entries().len();
        for i in 0..count {
            let mut f_img = session.by_index(i)?;

            // Entry names come from the archive; never let one escape the
            // target directory.
            let name = f_img.name().to_string();
            if name.contains(['/', '\\']) || name == ".." {
                return Err(miette!("entry name {name:?} is not a plain file name"));
            }

            let p = self.directory.join(&name);
            info!("writing {}", p.display());

            std::fs::create_dir_all(&self.directory).into_diagnostic()?;
            let mut out = if !self.overwrite {
                File::create_new(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            } else {
                File::create(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            };

            std::io::copy(&mut f_img, &mut out).into_diagnostic()?;
        }
        Ok(())
    }
}
