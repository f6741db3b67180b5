use clap::Parser;
use flagtrail::cli::{Cli, Commands};
use flagtrail::types::config::Config;
use flagtrail::FlagResult;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> FlagResult<()> {
    let cli = Cli::parse();

    // Load configuration first (no logging yet). A broken file is fatal
    // except for `doctor`, which reports the problem itself.
    let config = if cli.config.exists() {
        match Config::load(&cli.config) {
            Ok(config) => config,
            Err(_) if matches!(cli.command, Commands::Doctor) => Config::default_config(),
            Err(e) => {
                eprintln!("Error: {}: {}", cli.config.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default_config()
    };

    // CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("flagtrail={}", log_level)
            .parse()
            .unwrap_or_else(|_| "flagtrail=info".parse().expect("fallback directive is valid")),
    );

    let json_layer = (config.general.log_format == "json")
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (config.general.log_format != "json")
        .then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(filter)
        .init();

    tracing::debug!("Configuration loaded from: {}", cli.config.display());

    flagtrail::scope::init(&config.flags)?;

    match cli.command {
        Commands::Init { path } => {
            flagtrail::cli::commands::init(path).await?;
        }
        Commands::Config => {
            flagtrail::cli::commands::config_cmd(&cli.config, &config).await?;
        }
        Commands::Doctor => {
            flagtrail::cli::commands::doctor(&cli.config).await?;
        }
        Commands::Record { flags, message } => {
            flagtrail::cli::commands::record(&flags, &message, &config).await?;
        }
        Commands::Simulate {
            writes,
            snapshots,
            capacity,
        } => {
            flagtrail::cli::commands::simulate(writes, snapshots, capacity, &config).await?;
        }
        Commands::Version => {
            flagtrail::cli::commands::version();
        }
    }

    Ok(())
}
