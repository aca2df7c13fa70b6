use std::process::ExitCode;

use c2md_app::logging::{self, LogDestination};
use c2md_app::{run, AppError, Cli, Outcome, Settings};
use c2md_core::parse_page_ref;
use c2md_engine::{ClientSettings, ConfluenceClient};
use c2md_logging::c2md_debug;
use chrono::Utc;
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let destination = LogDestination::from_log_file(cli.log_file.as_deref());
    if let Err(err) = logging::initialize(cli.verbose, &destination) {
        eprintln!("Warning: {err:#}");
    }

    match execute(&cli).await {
        Ok(Outcome::Json(json)) => println!("{json}"),
        Ok(Outcome::Written(path)) => eprintln!("Written to {}", path.display()),
        Ok(Outcome::Markdown(markdown)) => print!("{markdown}"),
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

async fn execute(cli: &Cli) -> Result<Outcome, AppError> {
    let settings = Settings::load(&cli.overrides())?;
    let page_ref = parse_page_ref(&cli.url)?;
    let settings = settings.apply_page_base(&page_ref, cli.base_url.is_some());
    settings.validate()?;
    c2md_debug!("Using {} as site root", settings.base_url);

    let client = ConfluenceClient::new(ClientSettings::new(&settings.base_url, settings.auth()))
        .map_err(AppError::Fetch)?;
    let fetched_utc = Utc::now().to_rfc3339();
    run(&client, &page_ref, &cli.run_options(), &fetched_utc).await
}
