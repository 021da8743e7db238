use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use uuid::Uuid;

/// Name of the virtual aggregate view containing every remark.
pub const ALL_CATEGORY: &str = "All";
/// Name of the default category; always the last category in the document.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Stable opaque identity assigned when a remark is created. All cross-view
/// lookups go through the id, never through text equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemarkId(Uuid);

impl RemarkId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remark {
    pub id: RemarkId,
    pub text: String,
    pub category: String,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Text,
    Json,
    Unsaved,
}

/// In-memory document: a single store of remarks in aggregate ("All") order,
/// plus a category registry mapping each category name to the ordered ids it
/// owns. "All" is never materialized as a second list; it is the store itself.
#[derive(Debug, Clone)]
pub struct Document {
    path: Option<PathBuf>,
    format: FileFormat,
    remarks: IndexMap<RemarkId, Remark>,
    categories: IndexMap<String, Vec<RemarkId>>,
    dirty: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut categories = IndexMap::new();
        categories.insert(UNCATEGORIZED.to_string(), Vec::new());
        Self {
            path: None,
            format: FileFormat::Unsaved,
            remarks: IndexMap::new(),
            categories,
            dirty: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn set_location(&mut self, path: PathBuf, format: FileFormat) {
        self.path = Some(path);
        self.format = format;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn remark_count(&self) -> usize {
        self.remarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remarks.is_empty()
    }

    pub fn get(&self, id: RemarkId) -> Option<&Remark> {
        self.remarks.get(&id)
    }

    /// Category names in display order: "All" first, then user categories,
    /// then "Uncategorized".
    pub fn category_names(&self) -> Vec<&str> {
        std::iter::once(ALL_CATEGORY)
            .chain(self.categories.keys().map(String::as_str))
            .collect()
    }

    pub fn contains_category(&self, name: &str) -> bool {
        is_all(name) || self.canonical_category(name).is_some()
    }

    /// True when the document holds anything a plain-text save would drop.
    pub fn is_lossy_as_text(&self) -> bool {
        self.categories.len() > 1 || self.remarks.values().any(|remark| !remark.tags.is_empty())
    }

    /// Remarks visible under the named category, in that category's order.
    /// "All" yields every remark in aggregate order. Unknown names yield
    /// an empty list.
    pub fn remarks_in(&self, category: &str) -> Vec<&Remark> {
        if is_all(category) {
            return self.remarks.values().collect();
        }
        let Some(name) = self.canonical_category(category) else {
            return Vec::new();
        };
        self.categories[&name]
            .iter()
            .filter_map(|id| self.remarks.get(id))
            .collect()
    }

    /// Every remark, flattened in category order then in-category order.
    /// This is the order the JSON codec persists.
    pub fn remarks_by_category(&self) -> Vec<&Remark> {
        self.categories
            .values()
            .flatten()
            .filter_map(|id| self.remarks.get(id))
            .collect()
    }

    /// Text is stored verbatim; only whitespace-only text is rejected.
    pub fn add_remark(&mut self, text: &str, category: &str, tags: &[String]) -> Option<RemarkId> {
        if text.trim().is_empty() {
            return None;
        }
        let category = self.ensure_category(category);
        let id = RemarkId::new();
        self.remarks.insert(
            id,
            Remark {
                id,
                text: text.to_string(),
                category: category.clone(),
                tags: normalize_tags(tags),
            },
        );
        if let Some(members) = self.categories.get_mut(&category) {
            members.push(id);
        }
        self.dirty = true;
        Some(id)
    }

    /// Rejects the whole edit when the new text is blank or the id is unknown;
    /// the remark and both views stay untouched in that case. A category
    /// change appends the remark to the destination list while its aggregate
    /// position is preserved.
    pub fn edit_remark(
        &mut self,
        id: RemarkId,
        new_text: &str,
        new_category: &str,
        new_tags: &[String],
    ) -> bool {
        if new_text.trim().is_empty() {
            return false;
        }
        let Some(old_category) = self.remarks.get(&id).map(|r| r.category.clone()) else {
            return false;
        };
        let category = self.ensure_category(new_category);
        if category != old_category {
            if let Some(members) = self.categories.get_mut(&old_category) {
                members.retain(|member| *member != id);
            }
            if let Some(members) = self.categories.get_mut(&category) {
                members.push(id);
            }
        }
        if let Some(remark) = self.remarks.get_mut(&id) {
            remark.text = new_text.to_string();
            remark.category = category;
            remark.tags = normalize_tags(new_tags);
        }
        self.dirty = true;
        true
    }

    pub fn remove_remarks(&mut self, ids: &[RemarkId]) -> usize {
        let mut removed = 0;
        for id in ids {
            if let Some(remark) = self.remarks.shift_remove(id) {
                if let Some(members) = self.categories.get_mut(&remark.category) {
                    members.retain(|member| member != id);
                }
                removed += 1;
            }
        }
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Clears the named category's remarks. Clearing "All" wipes every list
    /// but keeps the categories themselves.
    pub fn clear_category(&mut self, category: &str) -> usize {
        if is_all(category) {
            let count = self.remarks.len();
            self.remarks.clear();
            for members in self.categories.values_mut() {
                members.clear();
            }
            if count > 0 {
                self.dirty = true;
            }
            return count;
        }
        let Some(name) = self.canonical_category(category) else {
            return 0;
        };
        let members = match self.categories.get_mut(&name) {
            Some(members) => std::mem::take(members),
            None => return 0,
        };
        for id in &members {
            self.remarks.shift_remove(id);
        }
        if !members.is_empty() {
            self.dirty = true;
        }
        members.len()
    }

    /// Inserts an empty category at the requested display position. Positions
    /// are clamped to the interior range so "All" stays first and
    /// "Uncategorized" stays last.
    pub fn add_category(&mut self, name: &str, position: usize) -> bool {
        let name = name.trim();
        if name.is_empty() || is_all(name) || self.canonical_category(name).is_some() {
            return false;
        }
        let interior = self.categories.len();
        let position = position.clamp(1, interior);
        self.categories.insert(name.to_string(), Vec::new());
        self.categories.move_index(interior, position - 1);
        self.dirty = true;
        true
    }

    pub fn rename_category(&mut self, old_name: &str, new_name: &str) -> bool {
        let new_name = new_name.trim();
        let Some(old_key) = self.canonical_category(old_name) else {
            return false;
        };
        if is_protected(&old_key) || new_name.is_empty() || is_all(new_name) {
            return false;
        }
        if fold(new_name) != fold(&old_key) && self.canonical_category(new_name).is_some() {
            return false;
        }
        let Some(index) = self.categories.get_index_of(&old_key) else {
            return false;
        };
        let Some(members) = self.categories.shift_remove(&old_key) else {
            return false;
        };
        for id in &members {
            if let Some(remark) = self.remarks.get_mut(id) {
                remark.category = new_name.to_string();
            }
        }
        self.categories.insert(new_name.to_string(), members);
        let last = self.categories.len() - 1;
        self.categories.move_index(last, index);
        self.dirty = true;
        true
    }

    pub fn move_category(&mut self, name: &str, new_position: usize) -> bool {
        let Some(key) = self.canonical_category(name) else {
            return false;
        };
        if is_protected(&key) {
            return false;
        }
        let Some(current) = self.categories.get_index_of(&key) else {
            return false;
        };
        // Interior display positions run from 1 up to just before "Uncategorized".
        let target = new_position.clamp(1, self.categories.len() - 1) - 1;
        if target != current {
            self.categories.move_index(current, target);
            self.dirty = true;
        }
        true
    }

    /// Removes a user category and cascades removal of every remark it owns.
    pub fn remove_category(&mut self, name: &str) -> bool {
        let Some(key) = self.canonical_category(name) else {
            return false;
        };
        if is_protected(&key) {
            return false;
        }
        let Some(members) = self.categories.shift_remove(&key) else {
            return false;
        };
        for id in members {
            self.remarks.shift_remove(&id);
        }
        self.dirty = true;
        true
    }

    /// Sorted unique tags across the named category view ("All" for the
    /// global completion list). Recomputed from the store on every call.
    pub fn tags_for(&self, category: &str) -> Vec<String> {
        let mut tags = BTreeSet::new();
        for remark in self.remarks_in(category) {
            tags.extend(remark.tags.iter().cloned());
        }
        tags.into_iter().collect()
    }

    pub fn all_tags(&self) -> Vec<String> {
        self.tags_for(ALL_CATEGORY)
    }

    /// Resolves a target category name, creating it just before
    /// "Uncategorized" when it does not exist yet. Blank names and "All"
    /// fall back to "Uncategorized".
    fn ensure_category(&mut self, name: &str) -> String {
        let name = name.trim();
        if name.is_empty() || is_all(name) {
            return UNCATEGORIZED.to_string();
        }
        if let Some(existing) = self.canonical_category(name) {
            return existing;
        }
        self.categories.insert(name.to_string(), Vec::new());
        let last = self.categories.len() - 1;
        self.categories.move_index(last, last - 1);
        name.to_string()
    }

    fn canonical_category(&self, name: &str) -> Option<String> {
        let folded = fold(name.trim());
        self.categories
            .keys()
            .find(|key| fold(key) == folded)
            .cloned()
    }
}

fn normalize_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

fn is_all(name: &str) -> bool {
    fold(name.trim()) == fold(ALL_CATEGORY)
}

fn is_protected(name: &str) -> bool {
    is_all(name) || fold(name) == fold(UNCATEGORIZED)
}
