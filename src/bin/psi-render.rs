use std::path::PathBuf;

use clap::Parser;
use psi_report::ReportRenderer;

#[derive(Parser)]
#[command(name = "psi-render", about = "Render a PSI service report to PDF")]
struct Cli {
    /// Report record as JSON
    input: PathBuf,
    /// Directory the PDF is written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Write JSON-lines render events to this file
    #[arg(long)]
    debug_log: Option<PathBuf>,
    /// PDF document title (defaults to "PSI <numero>")
    #[arg(long)]
    title: Option<String>,
    /// Also write the archival upload manifest for this report id
    #[arg(long)]
    archive_id: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut builder = ReportRenderer::builder();
    if let Some(path) = cli.debug_log {
        builder = builder.debug_log(path);
    }
    if let Some(title) = cli.title {
        builder = builder.document_title(title);
    }
    let renderer = builder.build()?;

    let data = std::fs::read(&cli.input)?;
    let report = renderer.render_json(&data)?;

    match cli.archive_id {
        Some(report_id) => {
            let payload = report.archive_payload(report_id)?;
            std::fs::create_dir_all(&cli.out_dir)?;
            let pdf_path = cli.out_dir.join(&payload.filename);
            std::fs::write(&pdf_path, &payload.bytes)?;
            let manifest_path = pdf_path.with_extension("json");
            std::fs::write(&manifest_path, payload.manifest_json()?)?;
            println!(
                "{} ({} pages, sha256 {})",
                pdf_path.display(),
                payload.page_count,
                payload.sha256
            );
            println!("{}", manifest_path.display());
        }
        None => {
            let path = report.save_to_dir(&cli.out_dir)?;
            println!("{} ({} pages)", path.display(), report.page_count());
        }
    }
    Ok(())
}
