use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::PaypalConfig;
use crate::error::AppError;

/// Amount in minor units (cents).
pub type Cents = i64;

pub fn format_amount(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Parses a provider decimal string such as `"12.5"` or `"-3.05"`.
pub fn parse_amount(raw: &str) -> Option<Cents> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };
    let cents = whole.checked_mul(100)?.checked_add(fraction)?;
    Some(if negative { -cents } else { cents })
}

/// Percentage of `cents`, rounded half-up to the cent.
fn percent_of(cents: Cents, percent: i64) -> Cents {
    (cents * percent + 50).div_euclid(100)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Cents,
    pub stock: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    pub sku: String,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartTotals {
    pub items: Vec<Value>,
    pub item_total: Cents,
    pub shipping: Cents,
    pub tax: Cents,
}

impl CartTotals {
    pub fn grand_total(&self) -> Cents {
        self.item_total + self.shipping + self.tax
    }
}

/// In-memory product catalog the server prices carts from.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: HashMap<String, Product>,
    tax_percent: i64,
}

impl Catalog {
    pub fn new(products: HashMap<String, Product>) -> Self {
        Self {
            products,
            tax_percent: 5,
        }
    }

    pub fn product(&self, sku: &str) -> Option<&Product> {
        self.products.get(sku)
    }

    pub fn price_cart(&self, cart: &[CartItem], currency: &str) -> Result<CartTotals, AppError> {
        if cart.is_empty() {
            return Err(AppError::BadRequest("cart is empty".into()));
        }

        let mut items = Vec::with_capacity(cart.len());
        let mut item_total: Cents = 0;
        for entry in cart {
            let product = self
                .product(&entry.sku)
                .ok_or_else(|| AppError::BadRequest(format!("unknown product {}", entry.sku)))?;
            let quantity = entry.quantity.unwrap_or(1);
            if quantity == 0 {
                return Err(AppError::BadRequest(format!(
                    "{} {} has no quantity",
                    product.name, entry.sku
                )));
            }
            if quantity > product.stock {
                return Err(AppError::BadRequest(format!(
                    "{} {} (qty: {}) is out of stock.",
                    product.name, entry.sku, quantity
                )));
            }
            item_total += product.price * i64::from(quantity);
            items.push(json!({
                "name": product.name,
                "sku": entry.sku,
                "description": product.description,
                "category": product.category,
                "quantity": quantity.to_string(),
                "unit_amount": {
                    "currency_code": currency,
                    "value": format_amount(product.price),
                },
            }));
        }

        Ok(CartTotals {
            items,
            item_total,
            shipping: 0,
            tax: percent_of(item_total, self.tax_percent),
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let mut products = HashMap::new();
        products.insert(
            "PRODUCT-123".to_string(),
            Product {
                name: "Sample T-Shirt".to_string(),
                description: "Cotton crew neck".to_string(),
                category: "PHYSICAL_GOODS".to_string(),
                price: 5000,
                stock: 100,
            },
        );
        products.insert(
            "PRODUCT-456".to_string(),
            Product {
                name: "Sample Hoodie".to_string(),
                description: "Fleece pullover".to_string(),
                category: "PHYSICAL_GOODS".to_string(),
                price: 10000,
                stock: 100,
            },
        );
        Self::new(products)
    }
}

/// Buyer address as sent by the checkout frontend on shipping change.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Rate per country and state. `None` means the destination is not served.
#[derive(Debug, Clone, Default)]
pub struct ShippingRates {
    rates: HashMap<String, HashMap<String, Option<Cents>>>,
}

pub const DEFAULT_REGION: &str = "DEFAULT";

impl ShippingRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in table: flat rates inside the US and Canada, a surcharge for
    /// Alaska and Hawaii, and no shipping anywhere else.
    pub fn standard() -> Self {
        Self::new()
            .with_rate("US", DEFAULT_REGION, Some(500))
            .with_rate("US", "AK", Some(1500))
            .with_rate("US", "HI", Some(1500))
            .with_rate("CA", DEFAULT_REGION, Some(1000))
            .with_rate(DEFAULT_REGION, DEFAULT_REGION, None)
    }

    pub fn with_rate(mut self, country: &str, state: &str, rate: Option<Cents>) -> Self {
        self.rates
            .entry(country.to_string())
            .or_default()
            .insert(state.to_string(), rate);
        self
    }

    /// Falls back from state to country default to global default, then free.
    pub fn quote(&self, address: &ShippingAddress) -> Option<Cents> {
        let lookup = |country: &str, state: &str| {
            self.rates
                .get(country)
                .and_then(|states| states.get(state))
                .copied()
        };
        let country = address.country_code.as_deref().unwrap_or(DEFAULT_REGION);
        let state = address.state.as_deref().unwrap_or(DEFAULT_REGION);

        lookup(country, state)
            .or_else(|| lookup(country, DEFAULT_REGION))
            .or_else(|| lookup(DEFAULT_REGION, DEFAULT_REGION))
            .unwrap_or(Some(0))
    }
}

/// Sums an order `amount.breakdown` object, subtracting discount entries.
pub fn breakdown_total(breakdown: &serde_json::Map<String, Value>) -> Option<Cents> {
    breakdown.iter().try_fold(0, |total: Cents, (name, entry)| {
        let value = parse_amount(entry.get("value")?.as_str()?)?;
        Some(if name.contains("discount") {
            total - value
        } else {
            total + value
        })
    })
}

/// Merchant-side checkout settings shared by the HTTP handlers.
#[derive(Debug, Clone)]
pub struct Storefront {
    pub catalog: Catalog,
    pub shipping: ShippingRates,
    pub currency: String,
    pub intent: String,
    pub subscription_plan_id: Option<String>,
    pub subscription_plan_id_for_revise: Option<String>,
}

impl Storefront {
    pub fn from_config(config: &PaypalConfig) -> Self {
        Self {
            catalog: Catalog::default(),
            shipping: ShippingRates::standard(),
            currency: config.currency.clone(),
            intent: config.intent.clone(),
            subscription_plan_id: config.subscription_plan_id.clone(),
            subscription_plan_id_for_revise: config.subscription_plan_id_for_revise.clone(),
        }
    }

    /// Order payload for a priced cart, with the amount breakdown the provider
    /// requires whenever line items are present.
    pub fn order_payload(&self, totals: &CartTotals) -> Value {
        let money = |cents: Cents| json!({ "currency_code": self.currency, "value": format_amount(cents) });
        json!({
            "intent": self.intent,
            "purchase_units": [{
                "amount": {
                    "currency_code": self.currency,
                    "value": format_amount(totals.grand_total()),
                    "breakdown": {
                        "item_total": money(totals.item_total),
                        "shipping": money(totals.shipping),
                        "tax_total": money(totals.tax),
                    },
                },
                "items": totals.items,
            }],
        })
    }
}
