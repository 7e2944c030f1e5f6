// Copyright (c) 2026 BSS Map Helper Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Text report over a parsed symbol table: a summary block, the
//! size-sorted symbol table, and the accounting footer. The two padding
//! figures in the footer are deliberately distinct: "explicit padding"
//! comes from address-gap reconstruction, "alignment padding" from the
//! declared total minus the observed sum. When parsing or attribution is
//! incomplete they disagree, and that disagreement is diagnostic output.

use std::io::{self, Write};

use crate::map_parser::MapReport;

/// Display-only knobs; the parsed data is never affected by these.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    /// Rows with a size below this are hidden (still counted in totals).
    pub min_size: u64,
    /// When false, rows whose object file lives under the SDK tree are hidden.
    pub with_sdk: bool,
    /// Append a hex rendering to every size.
    pub with_hex: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            min_size: 0,
            with_sdk: true,
            with_hex: false,
        }
    }
}

/// Path segment marking a symbol as SDK-owned.
const SDK_PATH_MARKER: &str = "/obj/sdk/";

const HEADERS: [&str; 4] = ["Symbol Name", "Size (B)", "% of BSS", "Object File"];

fn format_size(size: u64, with_hex: bool) -> String {
    if with_hex {
        format!("{} (0x{:X})", size, size)
    } else {
        size.to_string()
    }
}

fn percent_of(size: u64, total: u64) -> f64 {
    if total > 0 {
        (size as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Print the summary block with the declared `.bss` size.
pub fn print_summary(out: &mut impl Write, total_bss_size: u64, with_hex: bool) -> io::Result<()> {
    writeln!(out, "--- BSS Section Summary ---")?;
    writeln!(
        out,
        "Total BSS Size: {} Bytes",
        format_size(total_bss_size, with_hex)
    )?;
    Ok(())
}

/// Print the symbol table sorted descending by size, then the accounting
/// footer. Re-sorts `report.symbols` in place; display order is the report's
/// final order.
pub fn print_symbols(
    out: &mut impl Write,
    report: &mut MapReport,
    opts: &ReportOptions,
) -> io::Result<()> {
    let total_bss_size = report.total_bss_size;
    // Stable sort keeps the address order among equal sizes.
    report.symbols.sort_by(|a, b| b.size.cmp(&a.size));

    writeln!(out, "--- BSS Symbols ---")?;

    // Column widths start at the header widths and grow with the data.
    let mut name_w = HEADERS[0].len();
    let mut size_w = HEADERS[1].len();
    let mut pct_w = HEADERS[2].len();
    let mut obj_w = HEADERS[3].len();
    for s in &report.symbols {
        name_w = name_w.max(s.name.len());
        size_w = size_w.max(format_size(s.size, opts.with_hex).len());
        pct_w = pct_w.max(format!("{:.2}%", percent_of(s.size, total_bss_size)).len());
        obj_w = obj_w.max(s.object_file.len());
    }

    let header_line = format!(
        "{:<name_w$} | {:>size_w$} | {:>pct_w$} | {:<obj_w$}",
        HEADERS[0], HEADERS[1], HEADERS[2], HEADERS[3]
    );
    writeln!(out, "{}", header_line)?;
    writeln!(out, "{}", "-".repeat(header_line.len()))?;

    let mut shown = 0usize;
    let mut shown_size = 0u64;
    let mut symbol_size = 0u64;
    for s in &report.symbols {
        symbol_size = symbol_size.saturating_add(s.size);
        if s.size < opts.min_size {
            continue;
        }
        if !opts.with_sdk && s.object_file.contains(SDK_PATH_MARKER) {
            continue;
        }

        let pct = format!("{:.2}%", percent_of(s.size, total_bss_size));
        writeln!(
            out,
            "{:<name_w$} | {:>size_w$} | {:>pct_w$} | {:<obj_w$}",
            s.name,
            format_size(s.size, opts.with_hex),
            pct,
            s.object_file
        )?;
        shown += 1;
        shown_size = shown_size.saturating_add(s.size);
    }
    writeln!(out, "{}", "-".repeat(header_line.len()))?;

    let filtered = opts.min_size != 0 || !opts.with_sdk;
    if filtered {
        writeln!(
            out,
            "Total BSS Symbols found: {} / {}",
            shown,
            report.symbols.len()
        )?;
        writeln!(
            out,
            "Total accumulated size: {} / {} Bytes",
            shown_size, symbol_size
        )?;
    } else {
        writeln!(out, "Total BSS Symbols found: {}", shown)?;
        writeln!(out, "Total accumulated size: {} Bytes", symbol_size)?;
    }

    writeln!(out, "Total explicit padding: {} Bytes", report.total_padding)?;
    let accounted = symbol_size.saturating_add(report.total_padding);
    if total_bss_size > accounted {
        writeln!(
            out,
            "Additional unaccounted space: {} Bytes",
            total_bss_size - accounted
        )?;
    }

    let padding_size = total_bss_size.saturating_sub(symbol_size);
    writeln!(
        out,
        "Alignment padding: {} Bytes ({:.2}%)",
        format_size(padding_size, opts.with_hex),
        percent_of(padding_size, total_bss_size)
    )?;
    writeln!(out, "Total BSS size: {} Bytes", total_bss_size)?;
    Ok(())
}
