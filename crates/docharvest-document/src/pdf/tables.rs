// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table inference from PDF text layout.
//
// PDF has no table structure, so tables are recovered from where text is
// placed: fragments sharing a baseline form a row, and two or more
// consecutive rows with the same number (at least two) of column-aligned
// fragments form a table.

use docharvest_core::error::{HarvestError, Result};
use docharvest_core::types::{ArtifactKind, Table};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};

use super::objects::{decode_text_string, number};

/// Fragments whose baselines differ by at most this much share a row.
const ROW_TOLERANCE: f32 = 2.0;
/// Cells whose left edges differ by at most this much share a column.
const COLUMN_TOLERANCE: f32 = 5.0;
/// A `TJ` adjustment at or below this (thousandths of em) reads as a space.
const TJ_SPACE_THRESHOLD: f32 = -250.0;

/// A run of text placed at one position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fragment {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// Text-positioning state for one content stream. Only translation is
/// tracked; scaling and rotation are ignored.
#[derive(Default)]
struct TextState {
    line_x: f32,
    line_y: f32,
    leading: f32,
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_x += tx;
        self.line_y += ty;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }
}

fn operand(op: &Operation, index: usize) -> f32 {
    op.operands.get(index).and_then(number).unwrap_or(0.0)
}

fn shown_text(object: &Object) -> String {
    match object {
        Object::String(bytes, _) => decode_text_string(bytes),
        Object::Array(items) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&decode_text_string(bytes)),
                    other => {
                        if number(other).is_some_and(|adjust| adjust <= TJ_SPACE_THRESHOLD) {
                            text.push(' ');
                        }
                    }
                }
            }
            text
        }
        _ => String::new(),
    }
}

/// Positioned text fragments of a content stream, in stream order.
pub(crate) fn fragments(content: &Content) -> Vec<Fragment> {
    let mut state = TextState::default();
    let mut out = Vec::new();

    for op in &content.operations {
        let shown = match op.operator.as_str() {
            "BT" => {
                state = TextState {
                    leading: state.leading,
                    ..TextState::default()
                };
                None
            }
            "Tm" => {
                state.line_x = operand(op, 4);
                state.line_y = operand(op, 5);
                None
            }
            "Td" => {
                state.move_line(operand(op, 0), operand(op, 1));
                None
            }
            "TD" => {
                state.leading = -operand(op, 1);
                state.move_line(operand(op, 0), operand(op, 1));
                None
            }
            "TL" => {
                state.leading = operand(op, 0);
                None
            }
            "T*" => {
                state.next_line();
                None
            }
            "Tj" | "TJ" => op.operands.first().map(shown_text),
            "'" => {
                state.next_line();
                op.operands.first().map(shown_text)
            }
            "\"" => {
                state.next_line();
                op.operands.get(2).map(shown_text)
            }
            _ => None,
        };

        if let Some(text) = shown {
            let text = text.trim().to_string();
            if !text.is_empty() {
                out.push(Fragment {
                    x: state.line_x,
                    y: state.line_y,
                    text,
                });
            }
        }
    }
    out
}

/// Group fragments into rows, top of the page first, cells left to right.
fn rows(mut fragments: Vec<Fragment>) -> Vec<Vec<Fragment>> {
    fragments.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));
    let mut rows: Vec<Vec<Fragment>> = Vec::new();
    for fragment in fragments {
        match rows.last_mut() {
            Some(row) if (row[0].y - fragment.y).abs() <= ROW_TOLERANCE => row.push(fragment),
            _ => rows.push(vec![fragment]),
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    rows
}

fn aligned(a: &[Fragment], b: &[Fragment]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(left, right)| (left.x - right.x).abs() <= COLUMN_TOLERANCE)
}

/// Infer tables from positioned fragments.
pub(crate) fn infer_tables(fragments: Vec<Fragment>) -> Vec<Table> {
    let rows = rows(fragments);
    let mut tables = Vec::new();
    let mut start = 0;
    while start < rows.len() {
        let mut end = start + 1;
        if rows[start].len() >= 2 {
            while end < rows.len() && aligned(&rows[start], &rows[end]) {
                end += 1;
            }
        }
        if end - start >= 2 {
            tables.push(
                rows[start..end]
                    .iter()
                    .map(|row| row.iter().map(|cell| cell.text.clone()).collect())
                    .collect(),
            );
        }
        start = end;
    }
    tables
}

/// Tables laid out on one page.
pub(crate) fn page_tables(doc: &Document, page_id: ObjectId) -> Result<Vec<Table>> {
    let raw = doc.get_page_content(page_id).map_err(|err| {
        HarvestError::partial(ArtifactKind::Table, format!("page content unreadable: {err}"))
    })?;
    let content = Content::decode(&raw).map_err(|err| {
        HarvestError::partial(ArtifactKind::Table, format!("content stream unreadable: {err}"))
    })?;
    Ok(infer_tables(fragments(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32, text: &str) -> Fragment {
        Fragment {
            x,
            y,
            text: text.to_string(),
        }
    }

    #[test]
    fn aligned_rows_form_a_table() {
        let tables = infer_tables(vec![
            at(72.0, 760.0, "Quarterly numbers"),
            at(72.0, 700.0, "a"),
            at(200.0, 700.0, "b"),
            at(72.0, 680.0, "1"),
            at(200.0, 680.5, "2"),
        ]);
        assert_eq!(tables, vec![vec![vec!["a", "b"], vec!["1", "2"]]]);
    }

    #[test]
    fn prose_is_not_a_table() {
        let tables = infer_tables(vec![
            at(72.0, 700.0, "first line"),
            at(72.0, 686.0, "second line"),
            at(72.0, 672.0, "third line"),
        ]);
        assert!(tables.is_empty());
    }

    #[test]
    fn misaligned_columns_split_tables() {
        let tables = infer_tables(vec![
            at(72.0, 700.0, "a"),
            at(200.0, 700.0, "b"),
            at(72.0, 680.0, "c"),
            at(300.0, 680.0, "d"),
        ]);
        assert!(tables.is_empty());
    }

    #[test]
    fn positioning_operators_are_tracked() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tm",
                    vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), 700.into()],
                ),
                Operation::new("Tj", vec![Object::string_literal("left")]),
                Operation::new("Td", vec![128.into(), 0.into()]),
                Operation::new("Tj", vec![Object::string_literal("right")]),
                Operation::new("TL", vec![20.into()]),
                Operation::new("T*", vec![]),
                Operation::new(
                    "TJ",
                    vec![Object::Array(vec![
                        Object::string_literal("spa"),
                        (-300).into(),
                        Object::string_literal("ced"),
                    ])],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let found = fragments(&content);
        assert_eq!(found[0], at(72.0, 700.0, "left"));
        assert_eq!(found[1], at(200.0, 700.0, "right"));
        assert_eq!(found[2], at(200.0, 680.0, "spa ced"));
    }
}
