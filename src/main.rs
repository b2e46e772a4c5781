use clap::Parser;
use color_eyre::Result;
use gdpdash::dashboard::{build_report, render_text, ViewConfig};
use gdpdash::error_display::{user_message_from_load, user_message_from_report};
use gdpdash::export::{write_csv_file, ExportMode};
use gdpdash::{AppConfig, Args, ConfigManager, Loader, APP_NAME};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging(debug: bool) {
    let env = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(APP_NAME) {
            Ok(manager) => match manager.write_default_config(args.force) {
                Ok(path) => {
                    println!("Wrote default configuration to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing config: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

fn run(args: &Args) -> Result<()> {
    let mut config = AppConfig::load(APP_NAME)?;
    config.apply_args(args);
    config.validate()?;

    let options = config.source.load_options()?;
    let table = match Loader::shared().load(&config.source.url, &options) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("{}", user_message_from_load(&e));
            std::process::exit(1);
        }
    };

    if let Some(path) = &args.export {
        let mode = if args.simplified {
            ExportMode::Simplified
        } else {
            ExportMode::Full
        };
        let target = match &config.export.directory {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.clone(),
        };
        let written = write_csv_file(&table, mode, &target)?;
        info!(path = %written.display(), "export written");
    }

    let view = ViewConfig::from_args(&config, args);
    let report = build_report(&table, &view);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    init_logging(args.debug);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", user_message_from_report(&e));
        std::process::exit(1);
    }
    Ok(())
}
