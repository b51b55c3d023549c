pub mod add;
pub mod extract;
pub mod info;
pub mod list;
pub mod rebuild;
pub mod remove;

#[derive(clap::Subcommand)]
pub enum ImgCommands {
    /// List the entries of an IMG archive
    List(list::ListArgs),
    /// Extract an IMG archive into a directory
    Extract(extract::ExtractArgs),
    /// Add files to an IMG archive
    Add(add::AddArgs),
    /// Remove entries from an IMG archive
    Remove(remove::RemoveArgs),
    /// Rewrite an IMG archive, repacking its payload region
    Rebuild(rebuild::RebuildArgs),
    /// Show format details of an IMG archive
    Info(info::InfoArgs),
}

impl ImgCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            ImgCommands::List(list) => list.handle(),
            ImgCommands::Extract(extract) => extract.handle(),
            ImgCommands::Add(add) => add.handle(),
            ImgCommands::Remove(remove) => remove.handle(),
            ImgCommands::Rebuild(rebuild) => rebuild.handle(),
            ImgCommands::Info(info) => info.handle(),
        }
    }
}
