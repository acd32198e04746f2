use serde::{Deserialize, Serialize};

use crate::users::dto::Pagination;

use super::repo::{Payment, PaymentMethod, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Id,
    Amount,
    Currency,
    Status,
    Date,
    Customer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Listing parameters; serialized back to the client as the `filters` echo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    pub status: Option<PaymentStatus>,
    pub currency: Option<String>,
    pub method: Option<PaymentMethod>,
    pub customer: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    #[serde(default = "default_sort_by")]
    pub sort_by: SortField,
    #[serde(default = "default_sort_order")]
    pub sort_order: SortOrder,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for PaymentQuery {
    fn default() -> Self {
        Self {
            status: None,
            currency: None,
            method: None,
            customer: None,
            min_amount: None,
            max_amount: None,
            date_from: None,
            date_to: None,
            sort_by: default_sort_by(),
            sort_order: default_sort_order(),
            page: default_page(),
            limit: default_limit(),
        }
    }
}

fn default_sort_by() -> SortField {
    SortField::Date
}

fn default_sort_order() -> SortOrder {
    SortOrder::Desc
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub failed: usize,
    pub total_amount: f64,
    pub average_amount: f64,
}

#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<Payment>,
    pub pagination: Pagination,
    pub statistics: PaymentStats,
    pub filters: PaymentQuery,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment: Payment,
}

#[derive(Debug, Serialize)]
pub struct PaymentUpdateResponse {
    pub message: &'static str,
    pub payment: Payment,
}
