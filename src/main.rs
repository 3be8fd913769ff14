use clap::Parser;

use squat_coach::app::{self, AppError};
use squat_coach::cli::{self, Args, Command};
use squat_coach::config::Config;

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(mut args: Args) -> Result<(), AppError> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply_to(&mut config);

    match args.command.take().unwrap_or(Command::Train) {
        Command::ListCameras => cli::list_cameras()?,
        Command::Config { action } => {
            cli::handle_config_action(action, &config, args.config.as_deref())?
        }
        Command::Train => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(app::train(config))?;
        }
    }
    Ok(())
}

fn main() {
    // Load .env file before anything else; a missing file is fine
    let _ = dotenv::dotenv();

    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
