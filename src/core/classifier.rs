use crate::domain::model::{Item, Listing, ListingType, Venue};

/// Network fee charged by the primary marketplace on fixed-price listings.
pub const DEFAULT_PRIMARY_FEE_AMOUNT: u64 = 300_000_000;

/// Maps an item and its resolved listing to a venue.
///
/// Signals are checked strictly in this order and the first hit wins:
/// 1. off-chain item kind
/// 2. explicit `marketplace` tag on the listing
/// 3. listing type (auction flavours)
/// 4. network fee fingerprint, equal to the primary fee or not
///
/// Anything else is unattributable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueClassifier {
    primary_fee_amount: u64,
}

impl Default for VenueClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PRIMARY_FEE_AMOUNT)
    }
}

impl VenueClassifier {
    pub fn new(primary_fee_amount: u64) -> Self {
        Self { primary_fee_amount }
    }

    pub fn classify(&self, item: &Item, listing: Option<&Listing>) -> Option<Venue> {
        if item.is_offchain() {
            return Some(Venue::Getgems);
        }
        self.classify_listing(listing?)
    }

    /// Steps 2 to 4 only, for callers that hold a listing without its item.
    pub fn classify_listing(&self, listing: &Listing) -> Option<Venue> {
        if let Some(venue) = listing.explicit_venue.as_deref().and_then(Venue::from_explicit_tag) {
            return Some(venue);
        }

        match listing.listing_type {
            Some(ListingType::PrimaryAuction) => return Some(Venue::Getgems),
            Some(ListingType::AlternateAuction) => return Some(Venue::Fragment),
            _ => {}
        }

        listing.network_fee.map(|fee| {
            if fee == self.primary_fee_amount {
                Venue::Getgems
            } else {
                Venue::Fragment
            }
        })
    }
}
