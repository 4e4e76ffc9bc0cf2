use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const ITEM_TYPENAME: &str = "NftItem";
pub const OFFCHAIN_KIND: &str = "OffchainNft";
pub const UNKNOWN_KIND: &str = "unknown";
pub const REF_MARKER: &str = "__ref";

/// 上架所在的市場
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Getgems,
    Fragment,
}

impl Venue {
    /// 解析 listing 上的 `marketplace` 欄位；未知的值回傳 None
    pub fn from_explicit_tag(tag: &str) -> Option<Self> {
        match tag {
            "GETGEMS" => Some(Venue::Getgems),
            "FRAGMENT" => Some(Venue::Fragment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Getgems => "getgems",
            Venue::Fragment => "fragment",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing 的形狀，由 `__typename` 決定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingType {
    FixedPrice,
    PrimaryAuction,
    AlternateAuction,
    Other(String),
}

impl ListingType {
    pub fn from_typename(typename: &str) -> Self {
        match typename {
            "NftSaleFixPrice" => ListingType::FixedPrice,
            "NftSaleAuction" => ListingType::PrimaryAuction,
            "TelemintAuction" => ListingType::AlternateAuction,
            other => ListingType::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub listing_id: Option<String>,
    pub listing_type: Option<ListingType>,
    pub explicit_venue: Option<String>,
    /// `Some` whenever the payload carries a `networkFee` key at all.
    pub network_fee: Option<u64>,
}

impl Listing {
    /// Reads a concrete listing record. Returns None for non-objects and for
    /// reference markers, which have to go through the resolver.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.contains_key(REF_MARKER) {
            return None;
        }

        Some(Self {
            listing_id: obj.get("address").and_then(non_empty_str).map(str::to_string),
            listing_type: obj
                .get("__typename")
                .and_then(Value::as_str)
                .map(ListingType::from_typename),
            explicit_venue: obj
                .get("marketplace")
                .and_then(Value::as_str)
                .map(str::to_string),
            network_fee: obj.get("networkFee").map(parse_fee_amount),
        })
    }
}

/// Lenient amount parsing: numbers and leading-digit strings are read,
/// anything else counts as zero.
fn parse_fee_amount(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => {
            let digits: String = s
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    }
}

pub(crate) fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

/// Item 上 `sale` 欄位的三種樣貌
#[derive(Debug, Clone, PartialEq)]
pub enum ListingRef {
    Inline(Listing),
    Reference(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub item_id: String,
    pub display_name: Option<String>,
    pub kind: Option<String>,
    pub listing_ref: Option<ListingRef>,
}

impl Item {
    /// Reads an item-shaped fragment. Only the identifier is required.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let item_id = obj.get("address").and_then(non_empty_str)?.to_string();

        let listing_ref = match obj.get("sale") {
            Some(sale @ Value::Object(fields)) => match fields.get(REF_MARKER) {
                Some(Value::String(key)) => Some(ListingRef::Reference(key.clone())),
                Some(_) => None,
                None => Listing::from_value(sale).map(ListingRef::Inline),
            },
            _ => None,
        };

        Some(Self {
            item_id,
            display_name: obj.get("name").and_then(Value::as_str).map(str::to_string),
            kind: obj.get("kind").and_then(Value::as_str).map(str::to_string),
            listing_ref,
        })
    }

    pub fn is_offchain(&self) -> bool {
        self.kind.as_deref() == Some(OFFCHAIN_KIND)
    }

    pub fn kind_tag(&self) -> &str {
        self.kind.as_deref().unwrap_or(UNKNOWN_KIND)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionRecord {
    pub item_id: String,
    #[serde(rename = "name")]
    pub display_name: Option<String>,
    pub venue: Venue,
    #[serde(rename = "kind")]
    pub kind_tag: String,
}

impl AttributionRecord {
    pub fn new(item: &Item, venue: Venue) -> Self {
        Self {
            item_id: item.item_id.clone(),
            display_name: item.display_name.clone(),
            venue,
            kind_tag: item.kind_tag().to_string(),
        }
    }
}

/// 某一時間點的完整 attribution 複本，可安全地跨 context 傳遞
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<String, AttributionRecord>,
}

impl Snapshot {
    pub fn from_entries(entries: BTreeMap<String, AttributionRecord>) -> Self {
        Self { entries }
    }

    pub fn get(&self, item_id: &str) -> Option<&AttributionRecord> {
        self.entries.get(item_id)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.entries.contains_key(item_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributionRecord)> {
        self.entries.iter()
    }
}
