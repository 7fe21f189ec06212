mod display;

use display::display_report;
use prdups::{NixResolver, build_report, parse_args};

fn handle_clap_help_version(clap_err: &clap::Error) -> ! {
    use clap::error::ErrorKind;
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{clap_err}");
            std::process::exit(0);
        }
        _ => {
            eprint!("{clap_err}");
            std::process::exit(2);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let (config, display_mode) = match parse_args(std::env::args_os()) {
        Ok(result) => result,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                handle_clap_help_version(clap_err);
            } else {
                return Err(err);
            }
        }
    };

    let resolver = NixResolver::new(config.resolver.clone());
    let report = build_report(&config, &resolver).await?;

    if report.stats.off_branch > 0 {
        tracing::info!(
            skipped = report.stats.off_branch,
            base = %config.base_label,
            "Ignored PRs targeting other branches"
        );
    }

    let mut stdout = std::io::stdout();
    display_report(&report, &display_mode, &mut stdout)?;

    Ok(())
}
