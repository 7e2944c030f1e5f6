use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;

use bss_map_helper::cli::Cli;
use bss_map_helper::report::{self, ReportOptions};
use bss_map_helper::{parse_map_file, MapReport};

fn main() -> Result<()> {
    let args = Cli::parse();

    let log_spec = if args.debug { "debug" } else { "warn" };
    let _logger = flexi_logger::Logger::try_with_env_or_str(log_spec)?.start()?;

    // Parser errors are fatal: diagnostic on stderr, non-zero exit.
    let mut report = parse_map_file(&args.input)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.json {
        return dump_json(&mut out, &mut report);
    }

    if report.symbols.is_empty() {
        if report.total_bss_size == 0 {
            writeln!(
                out,
                "No BSS symbols found and BSS section is empty or not properly parsed."
            )?;
        } else {
            writeln!(
                out,
                "BSS section has a total size of {} bytes, but no individual symbols were extracted.",
                report.total_bss_size
            )?;
            writeln!(
                out,
                "This might indicate that the symbol parsing patterns need further refinement for your specific map file format."
            )?;
        }
        return Ok(());
    }

    report::print_summary(&mut out, report.total_bss_size, args.hexa)?;
    report::print_symbols(
        &mut out,
        &mut report,
        &ReportOptions {
            min_size: args.min,
            with_sdk: args.sdk,
            with_hex: args.hexa,
        },
    )?;
    Ok(())
}

fn dump_json(out: &mut impl Write, report: &mut MapReport) -> Result<()> {
    // Same display order as the table.
    report.symbols.sort_by(|a, b| b.size.cmp(&a.size));
    serde_json::to_writer_pretty(&mut *out, &*report)?;
    writeln!(out)?;
    Ok(())
}
