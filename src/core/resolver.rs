use crate::domain::model::{Item, Listing, ListingRef};
use serde_json::{Map, Value};

/// A `TypeTag:identifier` key of the page-state cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKey<'a> {
    pub type_tag: &'a str,
    pub identifier: &'a str,
}

impl<'a> CacheKey<'a> {
    pub fn parse(raw: &'a str) -> Option<Self> {
        let (type_tag, identifier) = raw.split_once(':')?;
        if type_tag.is_empty() || identifier.is_empty() {
            return None;
        }
        Some(Self {
            type_tag,
            identifier,
        })
    }
}

/// Read-only view over the companion lookup table of one page-state document.
#[derive(Debug, Clone, Copy)]
pub struct LookupTable<'a> {
    entries: &'a Map<String, Value>,
}

impl<'a> LookupTable<'a> {
    pub fn new(entries: &'a Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Accepts anything; non-objects yield `None`.
    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(Self::new)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose key carries one of the given type tags.
    pub fn entries_with_type<'t>(
        &self,
        type_tags: &'t [&'t str],
    ) -> impl Iterator<Item = (CacheKey<'a>, &'a Value)> + 't
    where
        'a: 't,
    {
        let entries = self.entries;
        entries.iter().filter_map(move |(raw, value)| {
            let key = CacheKey::parse(raw)?;
            type_tags
                .contains(&key.type_tag)
                .then_some((key, value))
        })
    }

    /// Item entries whose listing reference points at `listing_id`.
    pub fn items_referencing<'s>(
        &self,
        item_type: &'s str,
        listing_id: &'s str,
    ) -> impl Iterator<Item = Item> + 's
    where
        'a: 's,
    {
        let entries = self.entries;
        entries.iter().filter_map(move |(raw, value)| {
            if CacheKey::parse(raw)?.type_tag != item_type {
                return None;
            }
            let item = Item::from_value(value)?;
            match &item.listing_ref {
                Some(ListingRef::Reference(target))
                    if CacheKey::parse(target).map(|k| k.identifier) == Some(listing_id) =>
                {
                    Some(item)
                }
                _ => None,
            }
        })
    }
}

/// Outcome of resolving an item's listing reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Listing),
    /// The item has no listing at all.
    Absent,
    /// A reference marker whose target is unknown or unreadable.
    Unresolved(String),
}

impl Resolution {
    pub fn listing(&self) -> Option<&Listing> {
        match self {
            Resolution::Found(listing) => Some(listing),
            _ => None,
        }
    }
}

/// Pure lookup, no I/O: inline listings are returned as-is, references are
/// dereferenced through `table` when one is supplied.
pub fn resolve(item: &Item, table: Option<&LookupTable<'_>>) -> Resolution {
    match &item.listing_ref {
        None => Resolution::Absent,
        Some(ListingRef::Inline(listing)) => Resolution::Found(listing.clone()),
        Some(ListingRef::Reference(key)) => table
            .and_then(|t| t.get(key))
            .and_then(Listing::from_value)
            .map(Resolution::Found)
            .unwrap_or_else(|| Resolution::Unresolved(key.clone())),
    }
}
