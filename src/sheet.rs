//! Spreadsheet input: ordered (row, cell text) pairs for the batch runner.
//!
//! Two input shapes are supported: a single column from the first worksheet
//! of an `.xlsx` workbook, and a plain text file with one part number per
//! line. Cell text is returned raw (embedded tabs and newlines intact); the
//! pipeline owns cleanup.

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::Path;

/// Maximum cells taken from a worksheet column.
const XLSX_MAX_CELLS: usize = 100_000;
/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// One input cell: 1-based row position plus its raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetCell {
    pub row: usize,
    pub text: String,
}

/// Load the part-number column from `path`.
///
/// `.xlsx` files are read as a workbook (first worksheet, the given column
/// letter); anything else is treated as a plain text list, one part per
/// line, where the line number is the row position.
pub fn load_cells(path: &Path, column: &str) -> Result<Vec<SheetCell>> {
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);

    if is_xlsx {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read workbook: {}", path.display()))?;
        read_xlsx_column(&bytes, column)
    } else {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read part list: {}", path.display()))?;
        Ok(content
            .lines()
            .enumerate()
            .map(|(i, line)| SheetCell {
                row: i + 1,
                text: line.to_string(),
            })
            .collect())
    }
}

/// Read one column of the first worksheet, rows in sheet order.
pub fn read_xlsx_column(bytes: &[u8], column: &str) -> Result<Vec<SheetCell>> {
    let column = column.trim().to_ascii_uppercase();
    if column.is_empty() || !column.chars().all(|c| c.is_ascii_uppercase()) {
        bail!("invalid column letter: '{}'", column);
    }

    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).context("not a valid xlsx archive")?;

    let shared_strings = read_shared_strings(&mut archive)?;

    let sheet_name = first_worksheet_name(&mut archive)?;
    let sheet_xml = read_zip_entry_bounded(&mut archive, &sheet_name, MAX_XML_ENTRY_BYTES)?;

    parse_column_cells(&sheet_xml, &shared_strings, &column)
}

fn first_worksheet_name(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("workbook contains no worksheets"))
}

fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>> {
    // Workbooks without text cells have no sharedStrings part at all.
    if !archive.file_names().any(|n| n == "xl/sharedStrings.xml") {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;

    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut current = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"si" {
                    in_si = true;
                    current.clear();
                } else if in_si && e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        current.push_str(&te.unescape().unwrap_or_default());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"si" {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("sharedStrings.xml parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>> {
    let entry = archive
        .by_name(name)
        .with_context(|| format!("missing ZIP entry: {}", name))?;
    let mut out = Vec::new();
    entry.take(max_bytes).read_to_end(&mut out)?;
    if out.len() as u64 >= max_bytes {
        bail!("ZIP entry {} exceeds size limit ({} bytes)", name, max_bytes);
    }
    Ok(out)
}

/// Walk the worksheet XML and collect cells whose reference matches the
/// requested column. Handles shared strings (`t="s"`), inline strings
/// (`t="inlineStr"`), and literal values.
fn parse_column_cells(
    xml: &[u8],
    shared_strings: &[String],
    column: &str,
) -> Result<Vec<SheetCell>> {
    #[derive(PartialEq)]
    enum CellKind {
        Literal,
        Shared,
        Inline,
    }

    let mut cells = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut in_target_cell = false;
    let mut kind = CellKind::Literal;
    let mut row = 0usize;
    let mut in_value = false;

    loop {
        if cells.len() >= XLSX_MAX_CELLS {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"c" => {
                    in_target_cell = false;
                    kind = CellKind::Literal;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => {
                                let cell_ref = String::from_utf8_lossy(&attr.value).to_string();
                                if let Some((col, r)) = split_cell_ref(&cell_ref) {
                                    if col == column {
                                        in_target_cell = true;
                                        row = r;
                                    }
                                }
                            }
                            b"t" => {
                                kind = match attr.value.as_ref() {
                                    b"s" => CellKind::Shared,
                                    b"inlineStr" => CellKind::Inline,
                                    _ => CellKind::Literal,
                                };
                            }
                            _ => {}
                        }
                    }
                }
                b"v" if in_target_cell => in_value = true,
                b"t" if in_target_cell && kind == CellKind::Inline => in_value = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_value => {
                let raw = te.unescape().unwrap_or_default().into_owned();
                let text = match kind {
                    CellKind::Shared => raw
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| shared_strings.get(i).cloned())
                        .unwrap_or_default(),
                    _ => raw,
                };
                if !text.is_empty() {
                    cells.push(SheetCell { row, text });
                }
                in_value = false;
                in_target_cell = false;
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => in_target_cell = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("worksheet parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}

/// Split "B17" into ("B", 17). `None` for malformed references.
fn split_cell_ref(cell_ref: &str) -> Option<(String, usize)> {
    let letters: String = cell_ref.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits: &str = &cell_ref[letters.len()..];
    if letters.is_empty() || digits.is_empty() {
        return None;
    }
    let row = digits.parse::<usize>().ok()?;
    Some((letters.to_ascii_uppercase(), row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_cell_refs() {
        assert_eq!(split_cell_ref("A1"), Some(("A".to_string(), 1)));
        assert_eq!(split_cell_ref("BC204"), Some(("BC".to_string(), 204)));
        assert_eq!(split_cell_ref("17"), None);
        assert_eq!(split_cell_ref("XYZ"), None);
    }

    #[test]
    fn parse_shared_and_inline_cells() {
        let shared = vec!["LM358N".to_string(), "NE555".to_string()];
        let xml = br#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1"><v>12</v></c></row>
    <row r="2"><c r="A2" t="s"><v>1</v></c></row>
    <row r="3"><c r="A3" t="inlineStr"><is><t>AD620AR</t></is></c></row>
    <row r="4"><c r="A4"><v>4700</v></c></row>
  </sheetData>
</worksheet>"#;

        let cells = parse_column_cells(xml, &shared, "A").unwrap();
        assert_eq!(
            cells,
            vec![
                SheetCell { row: 1, text: "LM358N".to_string() },
                SheetCell { row: 2, text: "NE555".to_string() },
                SheetCell { row: 3, text: "AD620AR".to_string() },
                SheetCell { row: 4, text: "4700".to_string() },
            ]
        );
    }

    #[test]
    fn other_columns_ignored() {
        let xml = br#"<worksheet><sheetData>
    <row r="1"><c r="B1"><v>skip</v></c><c r="C1"><v>keep</v></c></row>
</sheetData></worksheet>"#;
        let cells = parse_column_cells(xml, &[], "C").unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].text, "keep");
        assert_eq!(cells[0].row, 1);
    }
}
