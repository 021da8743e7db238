use crate::document::Remark;

/// How selected tags combine: `All` requires every selected tag on a remark,
/// `Any` requires at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMode {
    #[default]
    All,
    Any,
}

/// A visibility filter over one category view. Pure data; applying it never
/// touches the store.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub query: String,
    pub tags: Vec<String>,
    pub mode: TagMode,
}

impl FilterSpec {
    pub fn new(query: impl Into<String>, tags: Vec<String>, mode: TagMode) -> Self {
        Self {
            query: query.into(),
            tags,
            mode,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.tags.is_empty()
    }
}

/// Text match and tag match are evaluated independently and combined with a
/// logical AND. An empty query or empty tag selection matches everything on
/// its side.
pub fn visible(remark: &Remark, spec: &FilterSpec) -> bool {
    text_matches(remark, &spec.query) && tags_match(remark, &spec.tags, spec.mode)
}

/// Returns the visible subset of a category view in its original order.
pub fn apply<'a>(remarks: &[&'a Remark], spec: &FilterSpec) -> Vec<&'a Remark> {
    remarks
        .iter()
        .copied()
        .filter(|remark| visible(remark, spec))
        .collect()
}

fn text_matches(remark: &Remark, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    remark.text.to_lowercase().contains(&query)
}

fn tags_match(remark: &Remark, selected: &[String], mode: TagMode) -> bool {
    // Normalize before choosing a mode so that a selection of only blank
    // tags means "no tag filter" in both modes.
    let wanted: Vec<String> = selected
        .iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();
    if wanted.is_empty() {
        return true;
    }
    match mode {
        TagMode::All => wanted.iter().all(|tag| remark.tags.contains(tag)),
        TagMode::Any => wanted.iter().any(|tag| remark.tags.contains(tag)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, ALL_CATEGORY, UNCATEGORIZED};

    fn sample() -> Document {
        let mut document = Document::new();
        document.add_remark("Check bolt torque", UNCATEGORIZED, &[]);
        document.add_remark("Verify weld seam", UNCATEGORIZED, &[]);
        document.add_remark(
            "Replace breaker panel",
            "Safety",
            &["urgent".to_string(), "electrical".to_string()],
        );
        document.add_remark("Label junction boxes", "Safety", &["electrical".to_string()]);
        document
    }

    #[test]
    fn substring_query_is_case_insensitive() {
        let document = sample();
        let spec = FilterSpec::new("BOLT", vec![], TagMode::All);
        let visible = apply(&document.remarks_in(UNCATEGORIZED), &spec);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].text, "Check bolt torque");
    }

    #[test]
    fn empty_spec_shows_everything() {
        let document = sample();
        let spec = FilterSpec::default();
        assert!(spec.is_empty());
        assert_eq!(apply(&document.remarks_in(ALL_CATEGORY), &spec).len(), 4);
    }

    #[test]
    fn and_mode_requires_every_selected_tag() {
        let document = sample();
        let spec = FilterSpec::new(
            "",
            vec!["urgent".to_string(), "electrical".to_string()],
            TagMode::All,
        );
        let visible = apply(&document.remarks_in("Safety"), &spec);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].text, "Replace breaker panel");
    }

    #[test]
    fn or_mode_requires_any_selected_tag() {
        let document = sample();
        let spec = FilterSpec::new(
            "",
            vec!["urgent".to_string(), "electrical".to_string()],
            TagMode::Any,
        );
        assert_eq!(apply(&document.remarks_in("Safety"), &spec).len(), 2);
    }

    #[test]
    fn text_and_tag_filters_combine_with_logical_and() {
        let document = sample();
        let spec = FilterSpec::new("panel", vec!["electrical".to_string()], TagMode::All);
        let visible = apply(&document.remarks_in("Safety"), &spec);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].text, "Replace breaker panel");
    }

    #[test]
    fn blank_only_tag_selection_disables_the_tag_filter() {
        let document = sample();
        let blanks = vec!["   ".to_string(), String::new()];
        let all_mode = FilterSpec::new("", blanks.clone(), TagMode::All);
        let any_mode = FilterSpec::new("", blanks, TagMode::Any);
        assert_eq!(apply(&document.remarks_in(ALL_CATEGORY), &all_mode).len(), 4);
        assert_eq!(apply(&document.remarks_in(ALL_CATEGORY), &any_mode).len(), 4);
    }

    #[test]
    fn selected_tags_are_normalized_before_matching() {
        let document = sample();
        let spec = FilterSpec::new("", vec![" Electrical ".to_string()], TagMode::All);
        assert_eq!(apply(&document.remarks_in("Safety"), &spec).len(), 2);
    }
}
