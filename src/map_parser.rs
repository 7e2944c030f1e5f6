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

//! Linker-map scanner for the `.bss` section.
//!
//! A GCC linker map is line oriented: a section header line declares the
//! section's address and total size, and the lines that follow describe the
//! symbols placed inside it. Object-file attribution is stated once on a
//! `path.o:(.bss.symbol)` line and then left implicit for the plain symbol
//! lines that follow, so the scanner carries a sticky "current object file"
//! across lines. Toolchains disagree on how the end of `.bss` is signalled
//! (next section header, `_ebss`-style marker, or a stray section tag), so
//! three independent exit checks run on every line.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::{debug, info};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Errors that abort a map-file scan. Anything short of these (bad hex
/// fields, unrecognized line shapes) is skipped silently.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("map file '{path}' not found or not readable: {source}")]
    FileAccess {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error while reading map file: {0}")]
    ParseIo(#[from] io::Error),
}

/// One symbol recovered from the `.bss` section of the map file.
#[derive(Debug, Clone, Serialize)]
pub struct BssSymbol {
    pub name: String,
    /// Size in bytes, decoded from the hex size field.
    pub size: u64,
    /// VMA the symbol is placed at.
    pub address: u64,
    /// Contributing object/archive, or "unknown" when the map never said.
    pub object_file: String,
    /// Alignment gap between the previous symbol's end and this one's start,
    /// filled in after the scan. Zero for the first symbol.
    pub padding_before: u64,
}

/// Result of one scan: the symbol table plus the two totals the report needs.
#[derive(Debug, Default, Serialize)]
pub struct MapReport {
    /// Symbols in address order (the order padding was derived in).
    pub symbols: Vec<BssSymbol>,
    /// Declared size from the `.bss` section header, 0 if none was seen.
    pub total_bss_size: u64,
    /// Sum of all per-symbol `padding_before` gaps.
    pub total_padding: u64,
}

/// Extensions that qualify the path part of a `path:(section)` line as an
/// object file worth remembering as attribution context.
const OBJECT_FILE_EXTS: [&str; 6] = [".o", ".obj", ".a", ".lib", ".elf", ".s"];

/// Compiled line patterns, built once per scan.
struct LinePatterns {
    /// `.bss` section header: `da7a0000 da7a0000 7480 8 .bss`.
    /// Group 1 is the hex size.
    bss_header: Regex,
    /// Generic record: VMA, LMA, size, alignment, then a free-form remainder.
    /// Groups 1/3 are the hex VMA and size, group 5 the remainder.
    record: Regex,
    /// `path : (content)` remainder shape.
    obj_section: Regex,
    /// `.bss.name` or `.bssname` suffix inside the parenthesized content.
    bss_name_suffix: Regex,
    /// Remainder that is exactly one identifier.
    plain_symbol: Regex,
    /// Header of another well-known section, meaning `.bss` is over.
    other_section_header: Regex,
    /// End-of-bss marker symbols in the usual four-field position.
    end_marker: Regex,
    /// Any dotted section-like tag followed by whitespace.
    dotted_tag: Regex,
}

impl LinePatterns {
    fn new() -> Self {
        Self {
            bss_header: Regex::new(r"^[0-9a-fA-F]+\s+[0-9a-fA-F]+\s+([0-9a-fA-F]+)\s+\S+\s+\.bss$")
                .unwrap(),
            record: Regex::new(
                r"^([0-9a-fA-F]+)\s+([0-9a-fA-F]+)\s+([0-9a-fA-F]+)\s+([0-9a-fA-F]+)\s*(.*)$",
            )
            .unwrap(),
            obj_section: Regex::new(r"^(.*?)\s*:\s*\((.*?)\)$").unwrap(),
            bss_name_suffix: Regex::new(r"\.bss\.?([a-zA-Z_][a-zA-Z0-9_$.@*]*)$").unwrap(),
            plain_symbol: Regex::new(r"^([a-zA-Z_][a-zA-Z0-9_$.@*]*)$").unwrap(),
            other_section_header: Regex::new(
                r"(?i)^[0-9a-fA-F]+\s+[0-9a-fA-F]+\s+[0-9a-fA-F]+\s+\S+\s+(\.text|\.data|\.rodata|\.stack|\.heap|\.common|DEBUG|\.ARM\.exidx)$",
            )
            .unwrap(),
            end_marker: Regex::new(
                r"(?i)^[0-9a-fA-F]+\s+[0-9a-fA-F]+\s+\S+\s+\S+\s+(_ebss|_end|__bss_end__|COMMON)\b",
            )
            .unwrap(),
            dotted_tag: Regex::new(r"\.\w+\s+").unwrap(),
        }
    }
}

/// Parse the linker map at `path` and extract the `.bss` symbol table.
///
/// Opens the file, scans it once, and derives per-symbol padding from the
/// address deltas. Fails only on I/O problems; content that does not match
/// the expected line shapes is skipped.
pub fn parse_map_file(path: &Path) -> Result<MapReport, MapError> {
    let file = File::open(path).map_err(|source| MapError::FileAccess {
        path: path.display().to_string(),
        source,
    })?;
    let report = scan_bss(BufReader::new(file))?;
    info!(
        "{}: {} bss symbols, declared size {} bytes, {} bytes padding",
        path.display(),
        report.symbols.len(),
        report.total_bss_size,
        report.total_padding
    );
    Ok(report)
}

/// Scan map-file text for the `.bss` section.
///
/// Two-state machine: outside the section every line is tested against the
/// `.bss` header pattern; inside it, each line first runs the three exit
/// checks (in order, first hit ends the scan), then is parsed as a symbol
/// record.
pub fn scan_bss<R: BufRead>(reader: R) -> Result<MapReport, MapError> {
    let pat = LinePatterns::new();
    let mut symbols: Vec<BssSymbol> = Vec::new();
    // Dedup key: maps repeat a symbol's definition line and its plain echo.
    let mut seen: HashSet<(String, String, u64)> = HashSet::new();
    let mut total_bss_size = 0u64;
    let mut in_bss_section = false;
    let mut current_object_file = String::from("unknown");

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if !in_bss_section {
            if let Some(caps) = pat.bss_header.captures(line) {
                // Header size that fails to decode means this wasn't the
                // real header; keep looking.
                if let Ok(size) = u64::from_str_radix(&caps[1], 16) {
                    total_bss_size = size;
                    in_bss_section = true;
                    debug!("entered .bss, declared size 0x{:x}", size);
                }
            }
            continue;
        }

        // Exit checks, in order. Any hit terminates the scan outright.
        if pat.other_section_header.is_match(line) {
            debug!("left .bss at section header: {}", line);
            break;
        }
        if pat.end_marker.is_match(line) || line.contains("_ebss") {
            debug!("left .bss at end marker: {}", line);
            break;
        }
        if pat.dotted_tag.is_match(line) && !line.contains(".bss") {
            debug!("left .bss at foreign section tag: {}", line);
            break;
        }

        let Some(caps) = pat.record.captures(line) else {
            continue;
        };
        let Ok(size) = u64::from_str_radix(&caps[3], 16) else {
            continue;
        };
        let remainder = caps[5].trim();

        let name = if let Some(obj) = pat.obj_section.captures(remainder) {
            let path_field = obj[1].trim();
            let content = obj[2].trim();
            // Only a recognized object/archive path updates the sticky
            // context; a bare section tag in path position does not.
            if OBJECT_FILE_EXTS.iter().any(|ext| path_field.ends_with(ext)) {
                current_object_file = path_field.to_string();
            }
            pat.bss_name_suffix
                .captures(content)
                .map(|c| c[1].to_string())
        } else {
            // Plain symbol line; attribution comes from the last object
            // file stated above it.
            pat.plain_symbol
                .captures(remainder)
                .map(|c| c[1].to_string())
        };
        let Some(name) = name else {
            continue;
        };

        // Zero-size _bss/_ebss rows are linker bookkeeping, not data.
        if size == 0 && (name == "_bss" || name == "_ebss") {
            continue;
        }

        let Ok(address) = u64::from_str_radix(&caps[1], 16) else {
            continue;
        };

        if !seen.insert((name.clone(), current_object_file.clone(), size)) {
            debug!("duplicate symbol dropped: {}", name);
            continue;
        }
        symbols.push(BssSymbol {
            name,
            size,
            address,
            object_file: current_object_file.clone(),
            padding_before: 0,
        });
    }

    let total_padding = compute_padding(&mut symbols);
    Ok(MapReport {
        symbols,
        total_bss_size,
        total_padding,
    })
}

/// Sort symbols by address and derive each symbol's `padding_before` from
/// the gap to the previous symbol's end. Returns the summed padding.
/// Overlapping symbols produce a gap of zero, never a negative value, and
/// ranges butting against the top of the address space saturate rather
/// than wrap.
fn compute_padding(symbols: &mut [BssSymbol]) -> u64 {
    symbols.sort_by_key(|s| s.address);
    let mut total = 0u64;
    let mut previous_end: Option<u64> = None;
    for sym in symbols.iter_mut() {
        sym.padding_before = match previous_end {
            Some(end) => sym.address.saturating_sub(end),
            None => 0,
        };
        total = total.saturating_add(sym.padding_before);
        previous_end = Some(sym.address.saturating_add(sym.size));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan(text: &str) -> MapReport {
        scan_bss(Cursor::new(text)).expect("scan failed")
    }

    #[test]
    fn header_sets_total_size() {
        let report = scan("da7a0000 da7a0000 7480 8 .bss\n");
        assert_eq!(report.total_bss_size, 0x7480);
        assert_eq!(report.total_bss_size, 29824);
        assert!(report.symbols.is_empty());
    }

    #[test]
    fn oversized_header_size_is_ignored() {
        // A size field too wide for u64 fails to decode; the header is
        // ignored and the scan keeps looking for a valid one.
        let text = "\
da7a0000 da7a0000 11112222333344445555 8 .bss
c0de0010 c0de0010 4 4 G_skipped
da7a0000 da7a0000 100 8 .bss
c0de0020 c0de0020 4 4 G_x
";
        let report = scan(text);
        assert_eq!(report.total_bss_size, 0x100);
        assert_eq!(report.symbols.len(), 1);
        assert_eq!(report.symbols[0].name, "G_x");
    }

    #[test]
    fn no_header_means_no_symbols() {
        // BSS-shaped lines without a prior header must not be collected.
        let text = "\
c0de0010 c0de0010 4 4 build/obj/app/foo.o:(.bss.G_x)
c0de0014 c0de0014 8 4 G_y
";
        let report = scan(text);
        assert_eq!(report.total_bss_size, 0);
        assert!(report.symbols.is_empty());
    }

    #[test]
    fn object_file_context_is_sticky() {
        let text = "\
da7a0000 da7a0000 7480 8 .bss
c0de0010 c0de0010 4 4 build/obj/app/foo.o:(.bss.G_x)
c0de0014 c0de0014 8 4 G_y
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 2);
        let g_x = &report.symbols[0];
        assert_eq!(g_x.name, "G_x");
        assert_eq!(g_x.size, 4);
        assert_eq!(g_x.object_file, "build/obj/app/foo.o");
        let g_y = &report.symbols[1];
        assert_eq!(g_y.name, "G_y");
        assert_eq!(g_y.size, 8);
        assert_eq!(g_y.object_file, "build/obj/app/foo.o");
    }

    #[test]
    fn symbol_without_prior_object_file_is_unknown() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
da7a0000 da7a0000 1 1 G_swap_mode
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 1);
        assert_eq!(report.symbols[0].object_file, "unknown");
    }

    #[test]
    fn duplicate_triple_is_dropped() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
c0de0010 c0de0010 4 4 build/obj/app/foo.o:(.bss.G_x)
c0de0010 c0de0010 4 4 G_x
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 1);
        assert_eq!(report.symbols[0].name, "G_x");
    }

    #[test]
    fn same_name_different_size_is_kept() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
c0de0010 c0de0010 4 4 build/obj/app/foo.o:(.bss.G_x)
c0de0020 c0de0020 8 4 G_x
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 2);
    }

    #[test]
    fn padding_from_address_gap() {
        let text = "\
da7a0000 da7a0000 200 8 .bss
00000100 00000100 4 4 build/obj/app/foo.o:(.bss.G_a)
00000108 00000108 4 4 G_b
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 2);
        assert_eq!(report.symbols[0].padding_before, 0);
        assert_eq!(report.symbols[1].padding_before, 4);
        assert_eq!(report.total_padding, 4);
    }

    #[test]
    fn padding_never_negative_on_overlap() {
        // Overlapping ranges (previous end past next start) clamp to zero.
        let text = "\
da7a0000 da7a0000 200 8 .bss
00000100 00000100 10 4 build/obj/app/foo.o:(.bss.G_a)
00000104 00000104 4 4 G_b
";
        let report = scan(text);
        assert_eq!(report.symbols[1].padding_before, 0);
        assert_eq!(report.total_padding, 0);
    }

    #[test]
    fn symbol_at_top_of_address_space_does_not_wrap() {
        // A record whose end extends past u64::MAX must not panic or
        // corrupt the padding of anything that follows.
        let text = "\
da7a0000 da7a0000 200 8 .bss
00000100 00000100 4 4 build/obj/app/foo.o:(.bss.G_a)
fffffffffffffff0 fffffffffffffff0 100 4 G_huge
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 2);
        let huge = &report.symbols[1];
        assert_eq!(huge.name, "G_huge");
        assert_eq!(huge.padding_before, 0xfffffffffffffff0 - 0x104);
        assert_eq!(report.total_padding, huge.padding_before);
    }

    #[test]
    fn zero_size_ebss_is_discarded() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
c0de0010 c0de0010 4 4 build/obj/app/foo.o:(.bss.G_x)
";
        // _ebss as a plain name would also trip the exit check; feed it
        // through the object-file form to isolate the artifact filter.
        let with_artifact = format!("{}c0de0014 c0de0014 0 1 lib/crt0.o:(.bss._bss)\n", text);
        let report = scan(&with_artifact);
        assert_eq!(report.symbols.len(), 1);
        assert_eq!(report.symbols[0].name, "G_x");
    }

    #[test]
    fn exit_on_other_section_header() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
c0de0010 c0de0010 4 4 build/obj/app/foo.o:(.bss.G_x)
d0000000 d0000000 10 4 DEBUG
c0de0020 c0de0020 8 4 G_after
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 1);
        assert_eq!(report.symbols[0].name, "G_x");
    }

    #[test]
    fn exit_on_text_section_header() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
c0de0010 c0de0010 4 4 G_x
c0de0000 c0de0000 2c346 8 .text
c0de0020 c0de0020 8 4 G_after
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 1);
    }

    #[test]
    fn exit_on_ebss_marker() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
c0de0010 c0de0010 4 4 G_x
c0de0014 c0de0014 0 1 _ebss
c0de0020 c0de0020 8 4 G_after
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 1);
    }

    #[test]
    fn exit_on_foreign_section_tag() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
c0de0010 c0de0010 4 4 G_x
.heap          0x20010000      0x1000
c0de0020 c0de0020 8 4 G_after
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 1);
    }

    #[test]
    fn malformed_hex_size_skips_line() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
c0de0010 c0de0010 zz 4 G_x
c0de0014 c0de0014 8 4 G_y
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 1);
        assert_eq!(report.symbols[0].name, "G_y");
    }

    #[test]
    fn non_object_path_does_not_update_context() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
c0de0000 c0de0000 4 4 build/obj/app/foo.o:(.bss.G_a)
c0de0010 c0de0010 4 4 something.bin:(.bss.G_b)
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 2);
        // .bin is not an object-file extension; sticky context survives.
        assert_eq!(report.symbols[1].object_file, "build/obj/app/foo.o");
    }

    #[test]
    fn idempotent_across_scans() {
        let text = "\
da7a0000 da7a0000 200 8 .bss
00000108 00000108 4 4 build/obj/app/foo.o:(.bss.G_b)
00000100 00000100 4 4 build/obj/app/bar.o:(.bss.G_a)
";
        let first = scan(text);
        let second = scan(text);
        assert_eq!(first.total_bss_size, second.total_bss_size);
        assert_eq!(first.total_padding, second.total_padding);
        let names: Vec<_> = first.symbols.iter().map(|s| &s.name).collect();
        let names2: Vec<_> = second.symbols.iter().map(|s| &s.name).collect();
        assert_eq!(names, names2);
        // Address order after the padding pass, regardless of input order.
        assert_eq!(names, ["G_a", "G_b"]);
    }

    #[test]
    fn bss_suffix_without_dot_separator() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
c0de0010 c0de0010 4 4 build/obj/app/foo.o:(.bssG_x)
";
        let report = scan(text);
        assert_eq!(report.symbols.len(), 1);
        assert_eq!(report.symbols[0].name, "G_x");
    }

    #[test]
    fn object_line_without_bss_name_records_nothing() {
        let text = "\
da7a0000 da7a0000 100 8 .bss
c0de0010 c0de0010 4 4 build/obj/app/foo.o:(.bss)
c0de0014 c0de0014 8 4 G_y
";
        let report = scan(text);
        // First line only updates the context; the plain line inherits it.
        assert_eq!(report.symbols.len(), 1);
        assert_eq!(report.symbols[0].name, "G_y");
        assert_eq!(report.symbols[0].object_file, "build/obj/app/foo.o");
    }
}
