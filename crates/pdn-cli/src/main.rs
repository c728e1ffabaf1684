use clap::Parser;
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

use pdn_cli::{Cli, Commands, ConfigCommands, PdnConfig};

mod commands;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging disabled: {err}");
    }

    if let Err(err) = run(&cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    // The settings file may not exist yet
    if let Commands::Config {
        command: ConfigCommands::Init { force },
    } = &cli.command
    {
        return commands::config::init(cli.config.as_deref(), *force);
    }

    let config = PdnConfig::resolve(cli.config.as_deref())?;
    debug!(?config, "settings loaded");

    match &cli.command {
        Commands::Compute(args) => commands::compute::handle(args, &config),
        Commands::Aggregate(args) => commands::aggregate::handle(args, &config),
        Commands::Efficiency {
            model,
            iout,
            vout,
            pout,
            phases,
            format,
        } => commands::efficiency::handle(
            model,
            commands::efficiency::point(*iout, *vout, *pout, *phases),
            &config.engine,
            format.unwrap_or(config.output.format),
        ),
        Commands::Config { .. } => commands::config::show(&config),
    }
}
