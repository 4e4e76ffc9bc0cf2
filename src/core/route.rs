use regex::Regex;
use std::sync::OnceLock;

/// Which kind of marketplace page the engine runs on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageRoute {
    Collection(String),
    CollectionItem { collection: String, item: String },
    Nft(String),
    User(String),
    #[default]
    Other,
}

fn patterns() -> &'static [Regex; 5] {
    static PATTERNS: OnceLock<[Regex; 5]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let build = |p: &str| Regex::new(p).expect("route pattern is valid");
        [
            build(r"/collection/([^/]+)/([A-Za-z0-9_-]+)"),
            build(r"/collection/([A-Za-z0-9_-]+)"),
            build(r"/nft/([A-Za-z0-9_-]+)"),
            build(r"/user/([A-Za-z0-9_-]+)"),
            build(r"modalNft=([A-Za-z0-9_-]+)"),
        ]
    })
}

impl PageRoute {
    pub fn from_path(path: &str) -> Self {
        let [collection_item, collection, nft, user, _] = patterns();

        if let Some(caps) = collection_item.captures(path) {
            return PageRoute::CollectionItem {
                collection: caps[1].to_string(),
                item: caps[2].to_string(),
            };
        }
        if let Some(caps) = collection.captures(path) {
            return PageRoute::Collection(caps[1].to_string());
        }
        if let Some(caps) = nft.captures(path) {
            return PageRoute::Nft(caps[1].to_string());
        }
        if let Some(caps) = user.captures(path) {
            return PageRoute::User(caps[1].to_string());
        }
        PageRoute::Other
    }

    /// The single item a page is about, if any. On-demand requests from
    /// such a page always include it.
    pub fn item_address(&self) -> Option<&str> {
        match self {
            PageRoute::CollectionItem { item, .. } => Some(item.as_str()),
            PageRoute::Nft(address) => Some(address.as_str()),
            _ => None,
        }
    }
}

/// Item identifier carried by a card link: the `modalNft=` parameter first,
/// then a `/collection/{collection}/{item}` path.
pub fn item_id_from_href(href: &str) -> Option<String> {
    let [collection_item, _, _, _, modal] = patterns();

    if let Some(caps) = modal.captures(href) {
        return Some(caps[1].to_string());
    }
    collection_item.captures(href).map(|caps| caps[2].to_string())
}
