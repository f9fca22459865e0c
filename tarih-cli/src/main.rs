use anyhow::Result;
use clap::Parser;
use tarih_cli::{Cli, Command, commands, providers, repl, telemetry};
use tarih_rag::RagConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init(cli.log_format);

    let config = cli.resolve_config(RagConfig::from_env()?)?;

    match &cli.command {
        Command::Build(_) => {
            let embedder = providers::embedder(cli.embedder)?;
            let report = commands::build(&config, embedder).await?;
            print!("{}", commands::render_build_report(&report, &config));
        }
        Command::Query(args) => {
            let embedder = providers::embedder(cli.embedder)?;
            let generator = providers::generator(cli.generator)?;
            let system = commands::open_system(config, embedder, generator).await?;
            let response = system.query(&args.question()).await;
            println!("{}", commands::format_response(&response, args.options.json)?);
        }
        Command::Repl(options) => {
            let embedder = providers::embedder(cli.embedder)?;
            let generator = providers::generator(cli.generator)?;
            let system = commands::open_system(config, embedder, generator).await?;
            repl::run(&system, options.json).await?;
        }
        Command::Stats => print!("{}", commands::stats(&config).await?),
    }
    Ok(())
}
