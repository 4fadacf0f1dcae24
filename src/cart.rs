//! Line-item cart and three-way payment split for the sale in progress.
//!
//! Key invariants:
//! - **One line per service**: adding a service already in the cart bumps
//!   its quantity instead of appending a second line
//! - **Subtotal = quantity x unit price**, recomputed on every change
//! - **No zero-quantity lines**: setting quantity to 0 or below removes it

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::services::Service;

/// Largest quantity a single line accepts.
pub const MAX_LINE_QUANTITY: u32 = 9_999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLineItem {
    pub service_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub subtotal: f64,
}

impl ServiceLineItem {
    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.subtotal = f64::from(quantity) * self.unit_price;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cart {
    items: Vec<ServiceLineItem>,
}

impl Cart {
    pub fn items(&self) -> &[ServiceLineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit of `service`, merging with an existing line.
    pub fn add_service(&mut self, service: &Service) {
        if let Some(item) = self.items.iter_mut().find(|i| i.service_id == service.id) {
            item.set_quantity(item.quantity.saturating_add(1).min(MAX_LINE_QUANTITY));
            return;
        }
        self.items.push(ServiceLineItem {
            service_id: service.id.clone(),
            name: service.name.clone(),
            quantity: 1,
            unit_price: service.price,
            subtotal: service.price,
        });
    }

    /// Set a line's quantity directly. Zero or below removes the line; an
    /// unknown service id is ignored.
    pub fn set_quantity(&mut self, service_id: &str, quantity: i64) -> AppResult<()> {
        if quantity <= 0 {
            self.items.retain(|i| i.service_id != service_id);
            return Ok(());
        }
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q <= MAX_LINE_QUANTITY)
            .ok_or_else(|| {
                AppError::Invalid(format!("La cantidad máxima es {MAX_LINE_QUANTITY}."))
            })?;
        if let Some(item) = self.items.iter_mut().find(|i| i.service_id == service_id) {
            item.set_quantity(quantity);
        }
        Ok(())
    }

    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(|i| i.subtotal).sum()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn into_items(self) -> Vec<ServiceLineItem> {
        self.items
    }
}

/// Payment buckets of a sale (`PagoDetalle` on the receipt).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSplit {
    #[serde(default, alias = "efectivo")]
    pub cash: f64,
    #[serde(default, alias = "transferencia")]
    pub transfer: f64,
    #[serde(default, alias = "tarjeta")]
    pub card: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[serde(alias = "efectivo")]
    Cash,
    #[serde(alias = "transferencia")]
    Transfer,
    #[serde(alias = "tarjeta")]
    Card,
}

impl PaymentMethod {
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "EFECTIVO",
            PaymentMethod::Transfer => "TRANSFERENCIA",
            PaymentMethod::Card => "TARJETA",
        }
    }
}

pub const LABEL_MIXED: &str = "MIXTO";
pub const LABEL_OTHER: &str = "OTRO";

impl PaymentSplit {
    /// Gross amount: the three buckets summed.
    pub fn total(&self) -> f64 {
        self.cash + self.transfer + self.card
    }

    pub fn set(&mut self, method: PaymentMethod, amount: f64) {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        match method {
            PaymentMethod::Cash => self.cash = amount,
            PaymentMethod::Transfer => self.transfer = amount,
            PaymentMethod::Card => self.card = amount,
        }
    }

    /// "MIXTO" for more than one positive bucket, the bucket's name for
    /// exactly one, "OTRO" for none.
    pub fn method_label(&self) -> &'static str {
        let used: Vec<PaymentMethod> = [
            (PaymentMethod::Cash, self.cash),
            (PaymentMethod::Transfer, self.transfer),
            (PaymentMethod::Card, self.card),
        ]
        .into_iter()
        .filter(|(_, amount)| *amount > 0.0)
        .map(|(method, _)| method)
        .collect();

        match used.as_slice() {
            [] => LABEL_OTHER,
            [single] => single.label(),
            _ => LABEL_MIXED,
        }
    }
}
