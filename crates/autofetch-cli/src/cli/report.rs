//! Console summary of a run.

use autofetch_core::run::RunReport;

pub fn print(report: &RunReport) {
    for line in lines(report) {
        println!("{line}");
    }
}

fn lines(report: &RunReport) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(status) = report.status {
        out.push(format!("HTTP Status: {status}"));
    }
    let name = report
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| report.path.display().to_string());
    match &report.sha256 {
        Some(digest) => out.push(format!(
            "Saved {} bytes to {} (sha256 {})",
            report.bytes_written, name, digest
        )),
        None => out.push(format!("Saved {} bytes to {}", report.bytes_written, name)),
    }
    match &report.autostart {
        Ok(command) => out.push(format!("Added startup entry: {command}")),
        Err(e) => out.push(format!("Failed to add startup entry: {e}")),
    }
    out
}
