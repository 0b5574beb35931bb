//! Structural PDF editing on top of `lopdf`.
//!
//! Split, delete and merge all end in the same place: a flat page tree whose
//! root `Pages` node lists the surviving pages directly. Before a page is
//! re-parented, the attributes it used to inherit from its ancestors
//! (`MediaBox`, `CropBox`, `Resources`, `Rotate`) are copied onto the page
//! itself, so dropping or replacing the old intermediate nodes never changes
//! how a page looks. Unreachable objects are pruned afterwards.

use super::PdfDocumentModel;
use crate::error::ConvertError;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use tracing::debug;

const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against malformed page trees whose `Parent` links form a cycle.
const MAX_TREE_DEPTH: usize = 64;

/// [`PdfDocumentModel`] backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfModel;

impl PdfDocumentModel for LopdfModel {
    type Handle = Document;

    fn load(&self, bytes: &[u8]) -> Result<Document, ConvertError> {
        let doc = Document::load_mem(bytes).map_err(|e| ConvertError::pdf("Failed to load PDF", e))?;
        debug!("Loaded PDF: {} pages, {} objects", doc.get_pages().len(), doc.objects.len());
        Ok(doc)
    }

    fn page_count(&self, doc: &Document) -> usize {
        doc.get_pages().len()
    }

    fn select_pages(&self, doc: &Document, pages: &[usize]) -> Result<Document, ConvertError> {
        let ids = page_ids(doc);
        let mut wanted: Vec<usize> = pages.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let keep = wanted
            .iter()
            .map(|&i| {
                ids.get(i).copied().ok_or_else(|| {
                    ConvertError::pdf("Failed to select pages", format!("no page {}", i + 1))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = doc.clone();
        rebuild_page_tree(&mut out, keep)?;
        Ok(out)
    }

    fn merge(&self, docs: Vec<Document>) -> Result<Document, ConvertError> {
        let mut docs = docs.into_iter();
        let mut dest = docs
            .next()
            .ok_or_else(|| ConvertError::pdf("Failed to merge PDFs", "no documents"))?;
        let mut page_refs = page_ids(&dest);
        let mut max_id = dest.max_id;

        for source in docs {
            let source_pages = page_ids(&source);
            let offset = max_id;

            for (old_id, object) in source.objects {
                dest.objects
                    .insert((old_id.0 + offset, old_id.1), remap_refs(object, offset));
            }
            page_refs.extend(source_pages.into_iter().map(|(n, g)| (n + offset, g)));
            max_id = max_id.max(source.max_id + offset);
        }

        dest.max_id = max_id;
        rebuild_page_tree(&mut dest, page_refs)?;
        Ok(dest)
    }

    fn rotate_all(&self, doc: &mut Document, delta: i64) -> Result<(), ConvertError> {
        for id in page_ids(doc) {
            let current = inherited(doc, id, b"Rotate")
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0);
            let next = (current + delta).rem_euclid(360);
            page_dict_mut(doc, id)?.set("Rotate", next);
        }
        Ok(())
    }

    fn rotation(&self, doc: &Document, index: usize) -> Result<i64, ConvertError> {
        let id = page_ids(doc)
            .get(index)
            .copied()
            .ok_or_else(|| ConvertError::pdf("Failed to read rotation", format!("no page {}", index + 1)))?;
        Ok(inherited(doc, id, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .rem_euclid(360))
    }

    fn save(&self, mut doc: Document) -> Result<Vec<u8>, ConvertError> {
        doc.compress();
        let mut buf = Vec::new();
        doc.save_to(&mut buf)
            .map_err(|e| ConvertError::pdf("Failed to save PDF", e))?;
        Ok(buf)
    }
}

/// Page object IDs in page order.
fn page_ids(doc: &Document) -> Vec<ObjectId> {
    let pages: BTreeMap<u32, ObjectId> = doc.get_pages();
    pages.into_values().collect()
}

/// Value of `key` on a page or its nearest ancestor.
fn inherited(doc: &Document, page: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_dictionary(page).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(v) = node.get(key) {
            return Some(v.clone());
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn page_dict_mut(doc: &mut Document, id: ObjectId) -> Result<&mut lopdf::Dictionary, ConvertError> {
    doc.get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| ConvertError::pdf("Invalid page object", e))
}

fn pages_root(doc: &Document) -> Result<ObjectId, ConvertError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|e| ConvertError::pdf("No document catalog", e))?;
    doc.get_dictionary(catalog_id)
        .and_then(|c| c.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| ConvertError::pdf("No page tree", e))
}

/// Make `pages` the complete, flat page list of `doc`.
fn rebuild_page_tree(doc: &mut Document, pages: Vec<ObjectId>) -> Result<(), ConvertError> {
    let root = pages_root(doc)?;

    for &id in &pages {
        let missing: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter(|key| doc.get_dictionary(id).map(|d| !d.has(key)).unwrap_or(false))
            .filter_map(|key| inherited(doc, id, key).map(|v| (*key, v)))
            .collect();
        let page = page_dict_mut(doc, id)?;
        for (key, value) in missing {
            page.set(key, value);
        }
        page.set("Parent", root);
    }

    let root_dict = page_dict_mut(doc, root)?;
    root_dict.set("Kids", pages.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>());
    root_dict.set("Count", pages.len() as i64);
    root_dict.remove(b"Parent");

    let pruned = doc.prune_objects();
    debug!("Page tree rebuilt: {} pages, {} objects pruned", pages.len(), pruned.len());
    Ok(())
}

/// Shift every indirect reference inside `obj` by `offset`.
fn remap_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(items) => {
            Object::Array(items.into_iter().map(|o| remap_refs(o, offset)).collect())
        }
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    /// Document whose pages inherit MediaBox and Rotate from an intermediate
    /// `Pages` node, to exercise flattening.
    fn nested_pdf(pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let root_id = doc.new_object_id();
        let mid_id = doc.new_object_id();

        let mut kids = Vec::new();
        for n in 0..pages {
            let content = doc.add_object(Stream::new(
                dictionary! {},
                format!("BT /F1 12 Tf 50 700 Td (Page {}) Tj ET", n + 1).into_bytes(),
            ));
            let page = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => mid_id,
                "Contents" => content,
            });
            kids.push(Object::Reference(page));
        }

        doc.objects.insert(
            mid_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Parent" => root_id,
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
                "Rotate" => 90i64,
            }),
        );
        doc.objects.insert(
            root_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(mid_id)],
                "Count" => pages as i64,
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => root_id });
        doc.trailer.set("Root", catalog);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn select_keeps_inherited_attributes() {
        let m = LopdfModel;
        let doc = m.load(&nested_pdf(4)).unwrap();
        let picked = m.select_pages(&doc, &[3, 1]).unwrap();
        assert_eq!(m.page_count(&picked), 2);
        assert_eq!(m.rotation(&picked, 0).unwrap(), 90);

        let id = page_ids(&picked)[0];
        assert!(picked.get_dictionary(id).unwrap().has(b"MediaBox"));
    }

    #[test]
    fn selected_document_survives_save_and_reload() {
        let m = LopdfModel;
        let doc = m.load(&nested_pdf(5)).unwrap();
        let picked = m.select_pages(&doc, &[0, 2, 4]).unwrap();
        let bytes = m.save(picked).unwrap();
        let back = m.load(&bytes).unwrap();
        assert_eq!(m.page_count(&back), 3);
    }

    #[test]
    fn rotation_is_additive_and_wraps() {
        let m = LopdfModel;
        let mut doc = m.load(&nested_pdf(2)).unwrap();
        m.rotate_all(&mut doc, 270).unwrap();
        assert_eq!(m.rotation(&doc, 0).unwrap(), 0);
        m.rotate_all(&mut doc, 180).unwrap();
        assert_eq!(m.rotation(&doc, 1).unwrap(), 180);
    }

    #[test]
    fn merge_counts_all_pages() {
        let m = LopdfModel;
        let a = m.load(&nested_pdf(2)).unwrap();
        let b = m.load(&nested_pdf(3)).unwrap();
        let merged = m.merge(vec![a, b]).unwrap();
        let bytes = m.save(merged).unwrap();
        assert_eq!(m.page_count(&m.load(&bytes).unwrap()), 5);
    }

    #[test]
    fn garbage_is_a_pdf_error() {
        let err = LopdfModel.load(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, ConvertError::Pdf { .. }));
    }
}
