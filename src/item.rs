//! Feed file row decoding
//!
//! Feed files are tab-separated with a fixed column order. Rows are projected
//! positionally into [`FeedItem`]: every value stays a string, surrounding
//! whitespace is trimmed, and columns missing at the end of a short row are
//! left empty. Decoding never fails.
//!
//! Files come gzip-compressed from the API; decompress before reading rows.

use serde::{Deserialize, Serialize};
use std::io::{self, BufRead};

/// Column separator
pub const SEPARATOR: char = '\t';

macro_rules! feed_item {
    ($($(#[doc = $doc:literal])* $field:ident,)+) => {
        /// One listing from an item feed file, in column order
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct FeedItem {
            $($(#[doc = $doc])* pub $field: String,)+
        }

        impl FeedItem {
            /// Field names in column order.
            pub const FIELD_NAMES: &'static [&'static str] = &[$(stringify!($field),)+];

            fn from_columns<'a>(mut columns: impl Iterator<Item = &'a str>) -> Self {
                Self {
                    $($field: columns.next().map(str::trim).unwrap_or_default().to_string(),)+
                }
            }

            /// Values in column order.
            pub fn values(&self) -> Vec<&str> {
                vec![$(self.$field.as_str(),)+]
            }
        }
    };
}

feed_item! {
    /// Item id
    item_id,
    /// Listing title
    title,
    /// Primary image URL
    image_url,
    /// Category path
    category,
    /// Leaf category id
    category_id,
    /// Buying options (e.g. `FIXED_PRICE`)
    buying_options,
    /// Seller user name
    seller_username,
    /// Seller positive feedback percentage
    seller_feedback_percentage,
    /// Seller feedback score
    seller_feedback_score,
    /// Global trade item number
    gtin,
    /// Brand
    brand,
    /// Manufacturer part number
    mpn,
    /// Product id
    epid,
    /// Condition id
    condition_id,
    /// Condition text
    condition,
    /// Price amount
    price_value,
    /// Price currency
    price_currency,
    /// Item group id
    primary_item_group_id,
    /// Item group type
    primary_item_group_type,
    /// Listing end date
    end_date,
    /// Seller-side revision
    seller_item_revision,
    /// Item location country
    location_country,
    /// Encoded item aspects
    localized_aspects,
    /// Seller trust level
    seller_trust_level,
    /// Availability status
    availability,
    /// Whether images may be altered
    image_altering_prohibited,
    /// Estimated available quantity
    estimated_available_quantity,
    /// Availability threshold type
    availability_threshold_type,
    /// Availability threshold
    availability_threshold,
    /// Whether returns are accepted
    returns_accepted,
    /// Return period amount
    return_period_value,
    /// Return period unit
    return_period_unit,
    /// Refund method
    refund_method,
    /// Return method
    return_method,
    /// Who pays return shipping
    return_shipping_cost_payer,
    /// Restocking fee percentage
    restocking_fee_percentage,
    /// Accepted payment methods
    accepted_payment_methods,
    /// Delivery options
    delivery_options,
    /// Regions shipped to
    ship_to_included_regions,
    /// Regions excluded from shipping
    ship_to_excluded_regions,
    /// Inferred product id
    inferred_epid,
    /// Inferred GTIN
    inferred_gtin,
    /// Inferred brand
    inferred_brand,
    /// Inferred MPN
    inferred_mpn,
    /// Inferred item aspects
    inferred_localized_aspects,
    /// Additional image URLs
    additional_images,
    /// Original price amount
    original_price_value,
    /// Original price currency
    original_price_currency,
    /// Discount amount
    discount_amount,
    /// Discount percentage
    discount_percentage,
    /// Energy efficiency class
    energy_efficiency_class,
    /// Qualified programs
    qualified_programs,
    /// Lot size
    lot_size,
    /// Package length unit
    length_unit_of_measure,
    /// Package width
    package_width,
    /// Package height
    package_height,
    /// Package length
    package_length,
    /// Package weight unit
    weight_unit_of_measure,
    /// Package weight
    package_weight,
    /// Shipping carrier
    shipping_carrier_code,
    /// Shipping service
    shipping_service_code,
    /// Shipping type
    shipping_type,
    /// Shipping cost
    shipping_cost,
    /// Shipping cost type
    shipping_cost_type,
    /// Additional shipping cost per unit
    additional_shipping_cost_per_unit,
    /// Quantity used for the shipping estimate
    quantity_used_for_estimate,
    /// Unit price
    unit_price,
    /// Unit pricing measure
    unit_pricing_measure,
    /// Legacy item id
    legacy_item_id,
    /// Alerts
    alerts,
}

impl FeedItem {
    /// Number of columns in the feed schema.
    pub const FIELD_COUNT: usize = Self::FIELD_NAMES.len();

    /// Decode one row. Extra trailing columns are ignored.
    pub fn from_tsv(row: &str) -> Self {
        Self::from_columns(row.split(SEPARATOR))
    }

    /// Iterate the rows of a decompressed feed file, skipping blank lines.
    pub fn read_all<R: BufRead>(reader: R) -> FeedItems<R> {
        FeedItems {
            lines: reader.lines(),
        }
    }
}

/// Iterator over the rows of a feed file
#[derive(Debug)]
pub struct FeedItems<R> {
    lines: io::Lines<R>,
}

impl<R: BufRead> Iterator for FeedItems<R> {
    type Item = io::Result<FeedItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => return Some(Ok(FeedItem::from_tsv(&line))),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
