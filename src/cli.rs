use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "importbox")]
#[command(about = "Import remote media into object storage", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to IMPORTBOX_CONFIG or config/importbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a single media URL or a playlist
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Media or playlist reference
    pub reference: String,

    /// Destination folder inside the bucket
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_command() {
        let cli = Cli::parse_from([
            "importbox",
            "--config",
            "custom.toml",
            "import",
            "https://example.com/list.m3u",
            "--prefix",
            "podcasts",
            "--json",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        let Commands::Import(args) = cli.command;
        assert_eq!(args.reference, "https://example.com/list.m3u");
        assert_eq!(args.prefix, "podcasts");
        assert!(args.json);
    }
}
