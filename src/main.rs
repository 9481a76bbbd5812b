use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tracing_subscriber::{fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tallpdf::cdp::CdpRenderer;
use tallpdf::cli::{Cli, Command, RenderOnceArgs};
use tallpdf::filename::report_filename;
use tallpdf::server::PdfServer;
use tallpdf::PdfService;

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            layer()
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(false),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let service = PdfService::new(
        CdpRenderer::new(),
        cli.render.render_request()?,
        cli.render.render_config(),
    )
    .context("invalid render configuration")?;

    match cli.command {
        Some(Command::Render(args)) => render_once(&service, args).await,
        Some(Command::Serve) | None => serve(service, &cli.serve.bind_addr()).await,
    }
}

async fn serve(service: PdfService<CdpRenderer>, addr: &str) -> Result<()> {
    let server = PdfServer::bind(addr, service)?;
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            shutdown.shutdown();
        }
    });

    server.run().await?;
    Ok(())
}

async fn render_once(service: &PdfService<CdpRenderer>, args: RenderOnceArgs) -> Result<()> {
    let output = args
        .output
        .unwrap_or_else(|| report_filename(&args.locality).into());

    let pdf = service.render().await?;
    std::fs::write(&output, &pdf)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!("wrote {} ({} bytes)", output.display(), pdf.len());
    Ok(())
}
