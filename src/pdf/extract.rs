//! Page-range extraction into a fresh document.
//!
//! Pages in the window are deep-copied along with everything they reference
//! (content streams, fonts, images, annotations). References that lead out
//! of the window are cut: other pages, the page tree and the catalog become
//! `null`, as do dangling references. Inheritable page attributes are
//! resolved from the source page tree so each copied page stands alone.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{HashMap, HashSet, VecDeque};

use super::window::PageWindow;
use crate::error::RenderError;

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Bound on page-tree depth when resolving inherited attributes
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when neither a page nor its ancestors declare a MediaBox
const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// A document holding only the extracted pages
pub struct ExtractedDocument {
    pub document: Document,
    /// Page object ids in output order
    pub page_ids: Vec<ObjectId>,
    pub window: PageWindow,
}

/// Copies the pages of `window` out of `source`.
///
/// A page that cannot be copied fails the whole extraction.
pub fn extract_pages(source: &Document, window: PageWindow) -> Result<ExtractedDocument, RenderError> {
    let source_pages = source.get_pages();
    let all_pages: HashSet<ObjectId> = source_pages.values().copied().collect();
    let selected: Vec<(u32, ObjectId)> = source_pages
        .range(window.start..=window.end)
        .map(|(number, id)| (*number, *id))
        .collect();

    if selected.len() != window.len() as usize {
        return Err(RenderError::Processing(format!(
            "Page tree is inconsistent: expected {} pages in {}-{}, found {}",
            window.len(),
            window.start,
            window.end,
            selected.len()
        )));
    }

    let mut target = Document::with_version(source.version.clone());
    let pages_id = target.new_object_id();

    let mut copier = ObjectCopier::new(source, &mut target, all_pages);
    let page_ids: Vec<ObjectId> = selected
        .iter()
        .map(|(_, source_id)| copier.reserve(*source_id))
        .collect();

    for ((number, source_id), target_id) in selected.iter().zip(&page_ids) {
        copier
            .copy_page(*source_id, *target_id, pages_id)
            .map_err(|reason| {
                RenderError::Processing(format!("Failed to copy page {}: {}", number, reason))
            })?;
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    target.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );
    let catalog_id = target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    target.trailer.set("Root", catalog_id);

    tracing::debug!(
        start = window.start,
        end = window.end,
        pages = page_ids.len(),
        objects = target.objects.len(),
        "Extracted page window"
    );

    Ok(ExtractedDocument {
        document: target,
        page_ids,
        window,
    })
}

struct ObjectCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    /// Every page of the source, in or out of the window
    source_pages: HashSet<ObjectId>,
    id_map: HashMap<ObjectId, ObjectId>,
    pending: VecDeque<ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, target: &'a mut Document, source_pages: HashSet<ObjectId>) -> Self {
        Self {
            source,
            target,
            source_pages,
            id_map: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// Allocates the target id for a window page up front, so references
    /// between pages in the window survive the copy.
    fn reserve(&mut self, source_id: ObjectId) -> ObjectId {
        let target_id = self.target.new_object_id();
        self.id_map.insert(source_id, target_id);
        target_id
    }

    fn copy_page(
        &mut self,
        source_id: ObjectId,
        target_id: ObjectId,
        parent_id: ObjectId,
    ) -> Result<(), String> {
        let page = flatten_page(self.source, source_id)?;
        let mut copied = self.copy_dictionary(&page);
        copied.set("Parent", parent_id);
        self.target.objects.insert(target_id, Object::Dictionary(copied));
        self.drain()
    }

    /// Copies every object queued by reference rewriting.
    fn drain(&mut self) -> Result<(), String> {
        let source = self.source;
        while let Some(source_id) = self.pending.pop_front() {
            let object = source
                .get_object(source_id)
                .map_err(|e| format!("object {} {}: {}", source_id.0, source_id.1, e))?;
            let copied = self.copy_object(object);
            if let Some(target_id) = self.id_map.get(&source_id).copied() {
                self.target.objects.insert(target_id, copied);
            }
        }
        Ok(())
    }

    fn copy_object(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.map_reference(*id),
            Object::Array(items) => Object::Array(items.iter().map(|o| self.copy_object(o)).collect()),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict)),
            Object::Stream(stream) => {
                let mut copied = Stream::new(self.copy_dictionary(&stream.dict), stream.content.clone());
                copied.allows_compression = stream.allows_compression;
                Object::Stream(copied)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, dict: &Dictionary) -> Dictionary {
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            copied.set(key.clone(), self.copy_object(value));
        }
        copied
    }

    fn map_reference(&mut self, id: ObjectId) -> Object {
        if let Some(target_id) = self.id_map.get(&id) {
            return Object::Reference(*target_id);
        }
        if self.source_pages.contains(&id) {
            return Object::Null;
        }
        match self.source.get_object(id) {
            Ok(object) if is_structural(object) => Object::Null,
            Ok(_) => {
                let target_id = self.target.new_object_id();
                self.id_map.insert(id, target_id);
                self.pending.push_back(id);
                Object::Reference(target_id)
            }
            Err(_) => Object::Null,
        }
    }
}

/// Page tree nodes and the catalog are rebuilt, never copied
fn is_structural(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        _ => return false,
    };
    matches!(
        dict.get(b"Type"),
        Ok(Object::Name(name)) if name == b"Pages" || name == b"Catalog"
    )
}

/// The page dictionary with inherited attributes filled in and `Parent`
/// removed.
fn flatten_page(source: &Document, page_id: ObjectId) -> Result<Dictionary, String> {
    let page = source
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| format!("page object {} {}: {}", page_id.0, page_id.1, e))?;

    let mut flattened = page.clone();
    flattened.remove(b"Parent");

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            return Err("page tree too deep".to_string());
        }
        let node = match source.get_object(parent_id).and_then(Object::as_dict) {
            Ok(node) => node,
            Err(_) => break,
        };
        for key in INHERITABLE {
            if !flattened.has(key) {
                if let Ok(value) = node.get(key) {
                    flattened.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    if !flattened.has(b"MediaBox") {
        flattened.set(
            "MediaBox",
            DEFAULT_MEDIA_BOX.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
        );
    }
    Ok(flattened)
}
