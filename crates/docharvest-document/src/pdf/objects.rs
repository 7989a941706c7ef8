// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Object-graph helpers over `lopdf`: reference resolution, inherited page
// attributes, text strings, and link annotations.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Reference chains longer than this are treated as broken.
const MAX_REFERENCE_DEPTH: usize = 16;

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, mut object: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_REFERENCE_DEPTH {
        match object {
            Object::Reference(id) => object = doc.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

/// `dict[key]`, with references resolved.
pub(crate) fn get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    resolve(doc, dict.get(key).ok()?)
}

/// `dict[key]` as a dictionary. Stream values yield their stream dictionary.
pub(crate) fn get_dict<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    match get(doc, dict, key)? {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

pub(crate) fn name(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

pub(crate) fn number(object: &Object) -> Option<f32> {
    object.as_float().ok()
}

/// Decode a PDF text string: UTF-16BE or UTF-8 when marked by a byte order
/// mark, PDFDocEncoding (approximated as Latin-1) otherwise.
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// A string object's decoded text.
pub(crate) fn text(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

/// The page's `Resources`, inherited from ancestor page-tree nodes if absent.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_REFERENCE_DEPTH {
        if let Some(resources) = get_dict(doc, node, b"Resources") {
            return Some(resources);
        }
        node = get_dict(doc, node, b"Parent")?;
    }
    None
}

/// URIs of `Link` annotations with a `URI` action, in annotation order.
pub(crate) fn page_link_uris(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let Some(Object::Array(annotations)) = get(doc, page, b"Annots") else {
        return Vec::new();
    };

    annotations
        .iter()
        .filter_map(|annot| match resolve(doc, annot)? {
            Object::Dictionary(d) => Some(d),
            _ => None,
        })
        .filter(|annot| {
            get(doc, annot, b"Subtype").and_then(name) == Some(b"Link".as_slice())
        })
        .filter_map(|annot| {
            let action = get_dict(doc, annot, b"A")?;
            if get(doc, action, b"S").and_then(name) != Some(b"URI".as_slice()) {
                return None;
            }
            get(doc, action, b"URI").and_then(text)
        })
        .map(|uri| uri.trim().to_string())
        .filter(|uri| !uri.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf16_text_strings() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69, 0x20, 0xAC];
        assert_eq!(decode_text_string(&bytes), "Hi€");
    }

    #[test]
    fn plain_bytes_decode_as_latin1() {
        assert_eq!(decode_text_string(b"caf\xe9"), "café");
    }

    #[test]
    fn resolve_follows_references() {
        let mut doc = Document::with_version("1.5");
        let inner = doc.add_object(Object::Integer(7));
        let outer = doc.add_object(Object::Reference(inner));
        let reference = Object::Reference(outer);
        assert!(matches!(resolve(&doc, &reference), Some(Object::Integer(7))));
    }

    #[test]
    fn reference_cycle_is_broken() {
        let mut doc = Document::with_version("1.5");
        let id = doc.new_object_id();
        doc.objects.insert(id, Object::Reference(id));
        assert!(resolve(&doc, &Object::Reference(id)).is_none());
    }
}
