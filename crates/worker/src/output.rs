use anyhow::Context;
use overnight_core::pipeline::RunReport;
use std::io::Write;
use std::path::Path;

pub fn write_report(report: &RunReport, path: Option<&Path>, pretty: bool) -> anyhow::Result<()> {
    let body = render(report, pretty)?;

    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, body)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(body.as_bytes())
                .context("failed to write report to stdout")?;
        }
    }
    Ok(())
}

fn render(report: &RunReport, pretty: bool) -> anyhow::Result<String> {
    let mut body = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
    .context("failed to serialize run report")?;
    body.push('\n');
    Ok(body)
}
