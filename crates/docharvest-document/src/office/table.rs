// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table reader shared by WordprocessingML (`w:tbl`) and DrawingML (`a:tbl`).
//
// Both dialects use the local names tbl/tr/tc/p/t. They differ only in how a
// cell spans columns: Word omits the covered cells and records
// `w:tcPr/w:gridSpan`, DrawingML keeps the covered cells and marks them
// `hMerge="1"`. Either way the spanning value is repeated across the columns.

use docharvest_core::error::{HarvestError, Result};
use docharvest_core::types::{ArtifactKind, Table};
use quick_xml::events::{BytesStart, Event};

use super::xml;

/// Widest column span a single cell may claim.
const MAX_SPAN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableDialect {
    Word,
    Drawing,
}

#[derive(Default)]
struct CellBuilder {
    paragraphs: Vec<String>,
    current: Option<String>,
    span: usize,
    merged: bool,
}

impl CellBuilder {
    fn finish(self) -> String {
        let mut paragraphs = self.paragraphs;
        if let Some(open) = self.current {
            paragraphs.push(open);
        }
        paragraphs
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct TableBuilder {
    /// Position by start tag, so nested tables keep document order.
    slot: usize,
    rows: Table,
    row: Option<Vec<String>>,
    cell: Option<CellBuilder>,
}

/// Read every table in `raw`, in the order their start tags appear.
///
/// Structural errors (a row outside a table, a cell outside a row, an
/// unclosed table) fail the whole part.
pub(crate) fn read_tables(raw: &[u8], dialect: TableDialect) -> Result<Vec<Table>> {
    let mut reader = xml::reader(raw);
    let mut open: Vec<TableBuilder> = Vec::new();
    let mut finished: Vec<(usize, Table)> = Vec::new();
    let mut next_slot = 0;
    let mut in_text = false;

    loop {
        let event = reader.read_event().map_err(|err| malformed(format!("{err}")))?;
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"tbl" => {
                    open.push(TableBuilder {
                        slot: next_slot,
                        rows: Vec::new(),
                        row: None,
                        cell: None,
                    });
                    next_slot += 1;
                }
                b"tr" => start_row(&mut open)?,
                b"tc" => start_cell(&mut open, &e, dialect)?,
                b"p" => {
                    if let Some(cell) = open_cell(&mut open) {
                        cell.current = Some(String::new());
                    }
                }
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tc" => {
                    start_cell(&mut open, &e, dialect)?;
                    end_cell(&mut open)?;
                }
                b"gridSpan" if dialect == TableDialect::Word => {
                    if let Some(cell) = open_cell(&mut open) {
                        cell.span = span_value(&e, b"val")?;
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(paragraph) = open_cell(&mut open).and_then(|c| c.current.as_mut()) {
                    paragraph.push_str(&xml::text(&t));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"tbl" => {
                    let table = open
                        .pop()
                        .ok_or_else(|| malformed("table end without a table"))?;
                    if table.row.is_some() {
                        return Err(malformed("table closed inside an open row"));
                    }
                    finished.push((table.slot, table.rows));
                }
                b"tr" => end_row(&mut open)?,
                b"tc" => end_cell(&mut open)?,
                b"p" => {
                    if let Some(cell) = open_cell(&mut open) {
                        if let Some(paragraph) = cell.current.take() {
                            cell.paragraphs.push(paragraph);
                        }
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !open.is_empty() {
        return Err(malformed("unclosed table"));
    }
    finished.sort_by_key(|(slot, _)| *slot);
    Ok(finished.into_iter().map(|(_, rows)| rows).collect())
}

fn malformed(reason: impl std::fmt::Display) -> HarvestError {
    HarvestError::partial(ArtifactKind::Table, format!("malformed table: {reason}"))
}

fn open_cell(open: &mut [TableBuilder]) -> Option<&mut CellBuilder> {
    open.last_mut().and_then(|table| table.cell.as_mut())
}

fn start_row(open: &mut [TableBuilder]) -> Result<()> {
    let table = open
        .last_mut()
        .ok_or_else(|| malformed("row outside a table"))?;
    if table.row.is_some() {
        return Err(malformed("row inside an open row"));
    }
    table.row = Some(Vec::new());
    Ok(())
}

fn end_row(open: &mut [TableBuilder]) -> Result<()> {
    let table = open
        .last_mut()
        .ok_or_else(|| malformed("row end outside a table"))?;
    let row = table
        .row
        .take()
        .ok_or_else(|| malformed("row end without a row"))?;
    table.rows.push(row);
    Ok(())
}

fn start_cell(open: &mut [TableBuilder], e: &BytesStart<'_>, dialect: TableDialect) -> Result<()> {
    let table = open
        .last_mut()
        .ok_or_else(|| malformed("cell outside a table"))?;
    if table.row.is_none() {
        return Err(malformed("cell outside a row"));
    }
    let mut cell = CellBuilder {
        span: 1,
        ..CellBuilder::default()
    };
    if dialect == TableDialect::Drawing {
        cell.merged = xml::attr(e, b"hMerge").is_some_and(|v| v == "1" || v == "true");
    }
    table.cell = Some(cell);
    Ok(())
}

fn end_cell(open: &mut [TableBuilder]) -> Result<()> {
    let table = open
        .last_mut()
        .ok_or_else(|| malformed("cell end outside a table"))?;
    let cell = table
        .cell
        .take()
        .ok_or_else(|| malformed("cell end without a cell"))?;
    let row = table
        .row
        .as_mut()
        .ok_or_else(|| malformed("cell outside a row"))?;

    let span = cell.span.max(1);
    let value = if cell.merged {
        row.last().cloned().unwrap_or_default()
    } else {
        cell.finish()
    };
    row.extend(std::iter::repeat_n(value, span));
    Ok(())
}

/// An absent span counts as one column.
fn span_value(e: &BytesStart<'_>, attr: &[u8]) -> Result<usize> {
    let Some(raw) = xml::attr(e, attr) else {
        return Ok(1);
    };
    match raw.trim().parse::<usize>() {
        Ok(span) if span <= MAX_SPAN => Ok(span),
        _ => Err(malformed(format!(
            "gridSpan {raw:?} is not a column count up to {MAX_SPAN}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_word_table_in_row_order() {
        let xml = br#"<w:body>
  <w:tbl>
    <w:tr><w:tc><w:p><w:r><w:t>a</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc></w:tr>
    <w:tr><w:tc><w:p><w:r><w:t>1</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>2</w:t></w:r></w:p></w:tc></w:tr>
  </w:tbl>
</w:body>"#;
        let tables = read_tables(xml, TableDialect::Word).unwrap();
        assert_eq!(tables, vec![vec![vec!["a", "b"], vec!["1", "2"]]]);
    }

    #[test]
    fn word_grid_span_repeats_value() {
        let xml = br#"<w:tbl><w:tr>
  <w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr><w:p><w:r><w:t>wide</w:t></w:r></w:p></w:tc>
  <w:tc><w:p><w:r><w:t>x</w:t></w:r></w:p></w:tc>
</w:tr></w:tbl>"#;
        let tables = read_tables(xml, TableDialect::Word).unwrap();
        assert_eq!(tables[0][0], vec!["wide", "wide", "x"]);
    }

    #[test]
    fn drawing_hmerge_copies_left_neighbour() {
        let xml = br#"<a:tbl><a:tr>
  <a:tc gridSpan="2"><a:txBody><a:p><a:r><a:t>head</a:t></a:r></a:p></a:txBody></a:tc>
  <a:tc hMerge="1"><a:txBody><a:p/></a:txBody></a:tc>
</a:tr></a:tbl>"#;
        let tables = read_tables(xml, TableDialect::Drawing).unwrap();
        assert_eq!(tables[0][0], vec!["head", "head"]);
    }

    #[test]
    fn multi_paragraph_cells_join_with_newline() {
        let xml = br#"<w:tbl><w:tr><w:tc>
  <w:p><w:r><w:t>line one</w:t></w:r></w:p>
  <w:p><w:r><w:t>line two</w:t></w:r></w:p>
</w:tc></w:tr></w:tbl>"#;
        let tables = read_tables(xml, TableDialect::Word).unwrap();
        assert_eq!(tables[0][0][0], "line one\nline two");
    }

    #[test]
    fn nested_tables_keep_start_order() {
        let xml = br#"<w:tbl><w:tr><w:tc>
  <w:p><w:r><w:t>outer</w:t></w:r></w:p>
  <w:tbl><w:tr><w:tc><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:tc></w:tr></w:tbl>"#;
        let tables = read_tables(xml, TableDialect::Word).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0], vec![vec!["outer"]]);
        assert_eq!(tables[1], vec![vec!["inner"]]);
    }

    #[test]
    fn numeric_cells_stay_strings() {
        let xml = br#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>007</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#;
        let tables = read_tables(xml, TableDialect::Word).unwrap();
        assert_eq!(tables[0][0][0], "007");
    }

    #[test]
    fn oversized_grid_span_is_rejected() {
        let xml = br#"<w:tbl><w:tr>
  <w:tc><w:tcPr><w:gridSpan w:val="18446744073709551615"/></w:tcPr><w:p/></w:tc>
</w:tr></w:tbl>"#;
        let err = read_tables(xml, TableDialect::Word).unwrap_err();
        assert_eq!(err.kind(), docharvest_core::ErrorKind::PartialExtractionFailure);
        assert!(err.to_string().contains("gridSpan"));
    }

    #[test]
    fn row_outside_table_is_rejected() {
        let xml = br#"<w:body><w:tr><w:tc><w:p/></w:tc></w:tr></w:body>"#;
        let err = read_tables(xml, TableDialect::Word).unwrap_err();
        assert_eq!(err.kind(), docharvest_core::ErrorKind::PartialExtractionFailure);
        assert!(err.to_string().contains("row outside a table"));
    }
}
