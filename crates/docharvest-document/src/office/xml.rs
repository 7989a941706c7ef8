// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Small helpers over quick-xml for reading OOXML parts.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText};

/// A streaming reader over one part. Whitespace is significant in `w:t`.
pub(crate) fn reader(xml: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    reader
}

/// Value of the attribute whose local name is `local`, ignoring any prefix.
pub(crate) fn attr(element: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// The relationship id on an element, i.e. a prefixed `id` attribute such as
/// `r:id`. An unprefixed `id` is a plain element id.
pub(crate) fn relationship_id(element: &BytesStart<'_>) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == b"id")
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
        .filter(|id| !id.is_empty())
}

/// Unescaped character data. Malformed entities are kept raw.
pub(crate) fn text(event: &BytesText<'_>) -> String {
    match event.unescape() {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(event.as_ref()).into_owned(),
    }
}
