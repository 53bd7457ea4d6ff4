use bible_commentary::cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("bible_commentary=debug,info")
    } else {
        EnvFilter::new("bible_commentary=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let settings = cli.settings();

    match cli.command {
        cli::Commands::Query(args) => {
            cli::query::run(args, &settings, cli.format, cli.verbose)?;
        }
        cli::Commands::Index(args) => {
            cli::index::run(args, &settings, cli.format, cli.verbose)?;
        }
        cli::Commands::Parse(args) => {
            cli::parse::run(args, &settings, cli.format, cli.verbose)?;
        }
        cli::Commands::Status(args) => {
            cli::status::run(args, &settings, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
