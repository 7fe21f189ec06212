use std::io::Write;

use anyhow::Result;
use prdups::{DisplayMode, Report, ReportEntry, ReportGroup};

const SATISFIED_MARK: &str = "✓";
const UNSATISFIED_MARK: &str = "✗";

fn satisfaction_mark(entry: &ReportEntry) -> &'static str {
    if entry.satisfied {
        SATISFIED_MARK
    } else {
        UNSATISFIED_MARK
    }
}

fn display_entry<W: Write>(entry: &ReportEntry, writer: &mut W) -> Result<()> {
    let package = &entry.item.package;
    writeln!(
        writer,
        "- {} | {} -> {} ( {} )",
        package.kind(),
        package.from_version,
        package.to_version,
        entry.item.pr.url
    )?;
    writeln!(
        writer,
        "-- nixpkgs >= PR | {} >= {} {}",
        entry.local_version,
        package.to_version,
        satisfaction_mark(entry)
    )?;
    Ok(())
}

fn display_group<W: Write>(group: &ReportGroup, writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", group.package)?;
    for entry in &group.entries {
        display_entry(entry, writer)?;
    }
    Ok(())
}

fn display_report_grouped<W: Write>(report: &Report, writer: &mut W) -> Result<()> {
    for group in &report.groups {
        display_group(group, writer)?;
    }
    Ok(())
}

fn display_report_quiet<W: Write>(report: &Report, writer: &mut W) -> Result<()> {
    for entry in report.groups.iter().flat_map(|group| &group.entries) {
        writeln!(writer, "{}", entry.item.pr.url)?;
    }
    Ok(())
}

/// Writes the report in the requested display mode.
pub fn display_report<W: Write>(report: &Report, mode: &DisplayMode, writer: &mut W) -> Result<()> {
    match mode {
        DisplayMode::Quiet => display_report_quiet(report, writer),
        DisplayMode::Normal => display_report_grouped(report, writer),
    }
}
