//! Wire types for the Mindbox JSON protocol
//!
//! The provider schema is camelCase throughout; these types exist only
//! at the HTTP boundary and are converted to domain types immediately
//! after decoding.

use pricesync_domain::{
    AppliedPromo, BasePrice, ExportedPromotion, FinalPrice, PriceRequest, PricedProduct,
    PromoPlaceholder, PromotionsPayload,
};
use serde::{Deserialize, Serialize};

/// Timestamp layout the provider expects in price calculation requests
const CALCULATION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Price calculation request
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfoRequest {
    pub customer: Customer,
    pub point_of_contact: String,
    pub product_list: RequestProductList,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub mobile_phone: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestProductList {
    pub calculation_date_time_utc: String,
    pub items: Vec<RequestItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    pub product: ProductRef,
    pub base_price_per_item: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProductRef {
    #[serde(default)]
    pub ids: ProductIds,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProductIds {
    #[serde(default)]
    pub mechtakz: String,
}

impl ProductInfoRequest {
    /// Build the provider request body from one batch request
    pub fn encode(src: &PriceRequest) -> Self {
        Self {
            customer: Customer::default(),
            point_of_contact: src.subdivision_id.clone(),
            product_list: RequestProductList {
                calculation_date_time_utc: src
                    .calculation_time
                    .format(CALCULATION_TIME_FORMAT)
                    .to_string(),
                items: src.products.iter().map(RequestItem::encode).collect(),
            },
        }
    }
}

impl RequestItem {
    fn encode(src: &BasePrice) -> Self {
        Self {
            product: ProductRef { ids: ProductIds { mechtakz: src.product_id.clone() } },
            base_price_per_item: src.price,
        }
    }
}

// ---------------------------------------------------------------------------
// Price calculation response
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfoResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub product_list: ResponseProductList,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseProductList {
    #[serde(default)]
    pub processing_status: String,
    #[serde(default)]
    pub items: Vec<ResponseItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItem {
    #[serde(default)]
    pub product: ProductRef,
    #[serde(default)]
    pub price_for_customer: f64,
    #[serde(default)]
    pub applied_promotions: Vec<AppliedPromotionWire>,
    #[serde(default)]
    pub placeholders: Vec<PlaceholderWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromotionWire {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub promotion: PromotionRef,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRef {
    #[serde(default)]
    pub ids: PromotionIds,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionIds {
    #[serde(default)]
    pub mindbox_id: i64,
    #[serde(default)]
    pub external_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderWire {
    #[serde(default)]
    pub ids: ExternalIds,
    #[serde(default)]
    pub content: Vec<PlaceholderContentWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIds {
    #[serde(default)]
    pub external_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderContentWire {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub promotion: PromotionRef,
    #[serde(default)]
    pub message: String,
}

impl ResponseItem {
    /// Convert one provider item into a domain priced product
    pub fn decode(self) -> PricedProduct {
        let promotions = self
            .applied_promotions
            .into_iter()
            .map(|promo| AppliedPromo {
                id: promo.promotion.ids.mindbox_id,
                external_id: promo.promotion.ids.external_id,
                kind: promo.kind,
                name: promo.promotion.name,
            })
            .collect();

        let placeholders = self
            .placeholders
            .into_iter()
            .flat_map(|placeholder| {
                let placeholder_id = placeholder.ids.external_id;
                placeholder.content.into_iter().map(move |content| PromoPlaceholder {
                    placeholder_id: placeholder_id.clone(),
                    promo_id: content.promotion.ids.mindbox_id,
                    kind: content.kind,
                    message: content.message,
                })
            })
            .collect();

        PricedProduct {
            final_price: FinalPrice {
                product_id: self.product.ids.mechtakz,
                price: self.price_for_customer,
            },
            promotions,
            placeholders,
        }
    }
}

// ---------------------------------------------------------------------------
// Export operations
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub export_id: String,
    #[serde(default)]
    pub export_result: ExportResultWire,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResultWire {
    #[serde(default)]
    pub processing_status: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionsFileResponse {
    #[serde(default)]
    pub promotions: Vec<PromotionWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionWire {
    #[serde(default)]
    pub ids: ExternalIds,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date_time_utc: Option<String>,
    #[serde(default)]
    pub end_date_time_utc: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub custom_fields: PromotionCustomFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionCustomFields {
    #[serde(default)]
    pub shema_v1_c: String,
}

impl PromotionsFileResponse {
    /// Convert the decoded export file into the domain payload
    pub fn decode(self) -> PromotionsPayload {
        PromotionsPayload {
            promotions: self
                .promotions
                .into_iter()
                .map(|promo| ExportedPromotion {
                    external_id: promo.ids.external_id,
                    name: promo.name,
                    schema_id: promo.custom_fields.shema_v1_c,
                    start_date_time_utc: promo.start_date_time_utc,
                    end_date_time_utc: promo.end_date_time_utc,
                })
                .collect(),
        }
    }
}
