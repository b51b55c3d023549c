pub mod img;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle IMG archives
    Img {
        #[command(subcommand)]
        command: img::ImgCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Img { command } => command.handle(),
        }
    }
}
