//! Generated slices and the copy-on-write collection holding them

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use super::product::ImageData;
use super::section::SectionType;
use crate::sanitize::sanitize;

/// Editable text field of a slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceField {
    /// Short headline
    Copy,
    /// Body text
    Description,
}

impl std::fmt::Display for SliceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy => write!(f, "copy"),
            Self::Description => write!(f, "description"),
        }
    }
}

/// Partial update of a slice's text; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SlicePatch {
    pub fn is_empty(&self) -> bool {
        self.copy.is_none() && self.description.is_none()
    }
}

/// One generated page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSlice {
    /// Image as a data URL, empty when the image model returned nothing
    pub url: String,
    pub title: String,
    pub copy: String,
    pub description: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
}

impl GeneratedSlice {
    /// Build a slice, sanitizing its text
    pub fn new(
        image: Option<ImageData>,
        title: impl Into<String>,
        copy: &str,
        description: &str,
        section_type: SectionType,
    ) -> Self {
        Self {
            url: image.map(|i| i.to_data_url()).unwrap_or_default(),
            title: title.into(),
            copy: sanitize(copy),
            description: sanitize(description),
            section_type,
        }
    }

    /// Decoded image, if the slice has one
    pub fn image(&self) -> Option<ImageData> {
        ImageData::from_data_url(&self.url)
    }

    pub fn field(&self, field: SliceField) -> &str {
        match field {
            SliceField::Copy => &self.copy,
            SliceField::Description => &self.description,
        }
    }

    fn with_field(&self, field: SliceField, value: &str) -> Self {
        let mut next = self.clone();
        match field {
            SliceField::Copy => next.copy = sanitize(value),
            SliceField::Description => next.description = sanitize(value),
        }
        next
    }

    fn with_patch(&self, patch: &SlicePatch) -> Self {
        let mut next = self.clone();
        if let Some(copy) = &patch.copy {
            next.copy = sanitize(copy);
        }
        if let Some(description) = &patch.description {
            next.description = sanitize(description);
        }
        next
    }
}

/// Ordered, immutable snapshot of slices
///
/// Every edit returns a new collection; holders of an older snapshot keep
/// seeing the old contents. Use [`SliceCollection::ptr_eq`] to detect change.
#[derive(Debug, Clone, Default)]
pub struct SliceCollection(Arc<Vec<GeneratedSlice>>);

impl SliceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GeneratedSlice> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeneratedSlice> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[GeneratedSlice] {
        &self.0
    }

    /// Same underlying snapshot
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// New collection with `slice` at the end
    pub fn appended(&self, slice: GeneratedSlice) -> Self {
        debug!(len = self.len(), "SliceCollection::appended: called");
        let mut next = Vec::with_capacity(self.len() + 1);
        next.extend(self.0.iter().cloned());
        next.push(slice);
        Self(Arc::new(next))
    }

    /// Clamp a focus index into `[0, len - 1]` (0 when empty)
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.len().saturating_sub(1))
    }

    /// New collection with one field of one slice replaced
    ///
    /// `None` when `index` is out of range.
    pub fn with_field(&self, index: usize, field: SliceField, value: &str) -> Option<Self> {
        debug!(index, %field, "SliceCollection::with_field: called");
        let target = self.get(index)?;
        let replaced = target.with_field(field, value);
        Some(self.replaced(index, replaced))
    }

    /// New collection with a subset of one slice's fields replaced
    pub fn with_patch(&self, index: usize, patch: &SlicePatch) -> Option<Self> {
        debug!(index, ?patch, "SliceCollection::with_patch: called");
        let target = self.get(index)?;
        let replaced = target.with_patch(patch);
        Some(self.replaced(index, replaced))
    }

    fn replaced(&self, index: usize, slice: GeneratedSlice) -> Self {
        let mut next: Vec<GeneratedSlice> = self.0.as_ref().clone();
        next[index] = slice;
        Self(Arc::new(next))
    }
}

impl From<Vec<GeneratedSlice>> for SliceCollection {
    fn from(slices: Vec<GeneratedSlice>) -> Self {
        Self(Arc::new(slices))
    }
}

impl PartialEq for SliceCollection {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Serialize for SliceCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SliceCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<GeneratedSlice>::deserialize(deserializer).map(Self::from)
    }
}

impl<'a> IntoIterator for &'a SliceCollection {
    type Item = &'a GeneratedSlice;
    type IntoIter = std::slice::Iter<'a, GeneratedSlice>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(copy: &str) -> GeneratedSlice {
        GeneratedSlice::new(None, "t", copy, "desc", SectionType::Usp)
    }

    fn three() -> SliceCollection {
        SliceCollection::new()
            .appended(slice("A"))
            .appended(slice("B"))
            .appended(slice("C"))
    }

    #[test]
    fn test_new_sanitizes_text() {
        let s = GeneratedSlice::new(None, "t", "Copy: \"Hi\"", "Text - body", SectionType::Hero);
        assert_eq!(s.copy, "Hi");
        assert_eq!(s.description, "body");
        assert_eq!(s.url, "");
        assert!(s.image().is_none());
    }

    #[test]
    fn test_append_preserves_order_and_old_snapshot() {
        let one = SliceCollection::new().appended(slice("A"));
        let two = one.appended(slice("B"));
        assert_eq!(one.len(), 1);
        assert_eq!(two.len(), 2);
        assert_eq!(two.get(0).unwrap().copy, "A");
        assert_eq!(two.get(1).unwrap().copy, "B");
        assert!(!one.ptr_eq(&two));
    }

    #[test]
    fn test_with_field_touches_only_target() {
        let before = three();
        let after = before.with_field(1, SliceField::Copy, "NEW").unwrap();

        assert_eq!(after.get(1).unwrap().copy, "NEW");
        assert_eq!(after.get(1).unwrap().description, "desc");
        assert_eq!(after.get(0), before.get(0));
        assert_eq!(after.get(2), before.get(2));
        assert_eq!(before.get(1).unwrap().copy, "B");
        assert!(!before.ptr_eq(&after));
    }

    #[test]
    fn test_with_patch_preserves_unspecified_fields() {
        let before = three();
        let patch = SlicePatch {
            copy: None,
            description: Some("longer body".to_string()),
        };
        let after = before.with_patch(2, &patch).unwrap();

        assert_eq!(after.get(2).unwrap().copy, "C");
        assert_eq!(after.get(2).unwrap().description, "longer body");
        assert_eq!(after.get(0), before.get(0));
        assert_eq!(after.get(1), before.get(1));
    }

    #[test]
    fn test_patch_values_are_sanitized() {
        let after = three().with_field(0, SliceField::Copy, "Headline: 'Loud'").unwrap();
        assert_eq!(after.get(0).unwrap().copy, "Loud");
    }

    #[test]
    fn test_out_of_range_patch() {
        assert!(three().with_field(3, SliceField::Copy, "x").is_none());
        assert!(SliceCollection::new().with_patch(0, &SlicePatch::default()).is_none());
    }

    #[test]
    fn test_clamp_index() {
        assert_eq!(SliceCollection::new().clamp_index(4), 0);
        assert_eq!(three().clamp_index(1), 1);
        assert_eq!(three().clamp_index(99), 2);
    }

    #[test]
    fn test_serde_roundtrip_as_array() {
        let collection = three();
        let json = serde_json::to_string(&collection).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"type\":\"usp\""));
        let back: SliceCollection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, collection);
    }
}
