// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document information dictionary (`/Info`).

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate, TimeZone};
use lopdf::{Document, Object};

use super::objects::{self, get_dict};

/// `/Info` keys and the metadata names they are stored under.
const INFO_KEYS: [(&[u8], &str); 8] = [
    (b"Title", "title"),
    (b"Author", "author"),
    (b"Subject", "subject"),
    (b"Keywords", "keywords"),
    (b"Creator", "creator"),
    (b"Producer", "producer"),
    (b"CreationDate", "created"),
    (b"ModDate", "modified"),
];

/// Read the document information dictionary. Dates are normalised to
/// RFC 3339 when they parse; other values are kept as written.
pub(crate) fn document_info(doc: &Document) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    let Some(info) = get_dict(doc, &doc.trailer, b"Info") else {
        return metadata;
    };

    for (key, name) in INFO_KEYS {
        let Some(value) = objects::get(doc, info, key).and_then(|object| match object {
            Object::String(..) => objects::text(object),
            Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
            _ => None,
        }) else {
            continue;
        };
        let value = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        if value.is_empty() {
            continue;
        }
        let value = if name == "created" || name == "modified" {
            parse_pdf_date(value).unwrap_or_else(|| value.to_string())
        } else {
            value.to_string()
        };
        metadata.insert(name.to_string(), value);
    }
    metadata
}

/// Convert `D:YYYYMMDDHHmmSSOHH'mm'` into RFC 3339. Every field after the
/// year is optional; a missing offset means UTC.
pub(crate) fn parse_pdf_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let body = raw.strip_prefix("D:").unwrap_or(raw);
    let digits_end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let digits = &body[..digits_end];
    if digits.len() < 4 {
        return None;
    }

    let field = |from: usize, default: u32| -> u32 {
        digits
            .get(from..from + 2)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    };
    let year: i32 = digits[..4].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(4, 1), field(6, 1))?;
    let naive = date.and_hms_opt(field(8, 0), field(10, 0), field(12, 0))?;

    let zone = &body[digits_end..];
    let offset_seconds = match zone.chars().next() {
        Some(sign @ ('+' | '-')) => {
            let tz: String = zone[1..].chars().filter(char::is_ascii_digit).collect();
            let hours: i32 = tz.get(0..2).and_then(|v| v.parse().ok()).unwrap_or(0);
            let minutes: i32 = tz.get(2..4).and_then(|v| v.parse().ok()).unwrap_or(0);
            let seconds = hours * 3600 + minutes * 60;
            if sign == '-' { -seconds } else { seconds }
        }
        _ => 0,
    };
    let offset = FixedOffset::east_opt(offset_seconds)?;
    let timestamp = offset.from_local_datetime(&naive).single()?;
    Some(timestamp.to_rfc3339())
}
