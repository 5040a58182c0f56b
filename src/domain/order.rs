use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::DomainError;
use super::money;

/// Order workflow. Codes match the seeded `order_statuses.code` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivered,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Paid,
        OrderStatus::Cancelled,
    ];

    pub fn code(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Lines may only change before the kitchen is done with the order.
    pub fn accepts_item_changes(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Preparing)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Preparing)
                | (Preparing, Ready)
                | (Ready, Delivered)
                | (Delivered, Paid)
                | (Pending, Cancelled)
                | (Preparing, Cancelled)
                | (Ready, Cancelled)
        )
    }

    pub fn transition_to(self, next: OrderStatus) -> Result<OrderStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::conflict(format!(
                "cannot change order status from {self} to {next}"
            )))
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| DomainError::invalid(format!("unknown order status '{s}'")))
    }
}

#[derive(Debug, Clone)]
pub struct OrderStatusInfo {
    pub code: String,
    pub label: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub table_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub status: OrderStatus,
    pub total: BigDecimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone)]
pub struct OrderLineDraft {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

impl OrderLineDraft {
    pub fn new(
        product_id: Uuid,
        quantity: i32,
        unit_price: BigDecimal,
    ) -> Result<Self, DomainError> {
        let subtotal = money::line_subtotal(&unit_price, quantity)?;
        Ok(Self {
            product_id,
            quantity,
            unit_price,
            subtotal,
        })
    }
}

/// Everything needed to insert an order together with its lines.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: Uuid,
    pub table_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
    pub lines: Vec<OrderLineDraft>,
}

impl OrderDraft {
    pub fn total(&self) -> Result<BigDecimal, DomainError> {
        money::ensure_storable("total", money::sum(self.lines.iter().map(|l| &l.subtotal)))
    }

    /// Folds repeated products into one line each, keeping first-seen order.
    pub fn merge_duplicate_lines(
        lines: Vec<OrderLineDraft>,
    ) -> Result<Vec<OrderLineDraft>, DomainError> {
        let mut merged: Vec<OrderLineDraft> = Vec::with_capacity(lines.len());
        for line in lines {
            match merged.iter_mut().find(|l| l.product_id == line.product_id) {
                Some(existing) => {
                    let quantity = existing
                        .quantity
                        .checked_add(line.quantity)
                        .ok_or_else(|| DomainError::invalid("quantity is too large"))?;
                    *existing = OrderLineDraft::new(
                        existing.product_id,
                        quantity,
                        existing.unit_price.clone(),
                    )?;
                }
                None => merged.push(line),
            }
        }
        Ok(merged)
    }
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub id: Uuid,
    pub order_id: Uuid,
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub changed_by: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub table_id: Option<Uuid>,
}
