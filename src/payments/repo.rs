use std::cmp::Ordering;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use super::dto::{PaymentQuery, PaymentStats, SortField, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    BankTransfer,
}

#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: u32,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub date: String,
    pub customer: String,
    pub method: PaymentMethod,
}

/// Mock payment collection. Owned by the store and shared through
/// `AppState`, never a global; `RwLock` serializes the PATCH path against
/// concurrent listings.
pub struct PaymentStore {
    payments: RwLock<Vec<Payment>>,
}

impl PaymentStore {
    pub fn seeded() -> Self {
        let seed = |id, amount, currency: &str, status, date: &str, customer: &str, method| Payment {
            id,
            amount,
            currency: currency.into(),
            status,
            date: date.into(),
            customer: customer.into(),
            method,
        };
        Self {
            payments: RwLock::new(vec![
                seed(1, 150.00, "USD", PaymentStatus::Completed, "2024-01-15", "John Doe", PaymentMethod::CreditCard),
                seed(2, 75.50, "USD", PaymentStatus::Pending, "2024-01-16", "Jane Smith", PaymentMethod::Paypal),
                seed(3, 200.00, "EUR", PaymentStatus::Completed, "2024-01-17", "Bob Johnson", PaymentMethod::BankTransfer),
                seed(4, 50.25, "USD", PaymentStatus::Failed, "2024-01-18", "Alice Brown", PaymentMethod::CreditCard),
                seed(5, 300.00, "USD", PaymentStatus::Completed, "2024-01-19", "Charlie Wilson", PaymentMethod::CreditCard),
            ]),
        }
    }

    pub fn get(&self, id: u32) -> Option<Payment> {
        self.payments
            .read()
            .expect("payment store lock poisoned")
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn set_status(&self, id: u32, status: PaymentStatus) -> Option<Payment> {
        let mut payments = self.payments.write().expect("payment store lock poisoned");
        let payment = payments.iter_mut().find(|p| p.id == id)?;
        payment.status = status;
        Some(payment.clone())
    }

    /// Filter, sort and paginate in one pass over a snapshot. Statistics
    /// cover the whole filtered set, not just the returned page.
    pub fn query(&self, q: &PaymentQuery) -> (Vec<Payment>, usize, PaymentStats) {
        let mut filtered: Vec<Payment> = self
            .payments
            .read()
            .expect("payment store lock poisoned")
            .iter()
            .filter(|p| matches(p, q))
            .cloned()
            .collect();

        sort(&mut filtered, q.sort_by, q.sort_order);

        let stats = statistics(&filtered);
        let total = filtered.len();

        let page = q.page.max(1);
        let start = (page - 1).saturating_mul(q.limit);
        let page_items: Vec<Payment> = filtered.into_iter().skip(start).take(q.limit).collect();

        (page_items, total, stats)
    }
}

fn matches(p: &Payment, q: &PaymentQuery) -> bool {
    if q.status.is_some_and(|s| p.status != s) {
        return false;
    }
    if q.method.is_some_and(|m| p.method != m) {
        return false;
    }
    if q.currency.as_deref().is_some_and(|c| !p.currency.eq_ignore_ascii_case(c)) {
        return false;
    }
    if q.customer
        .as_deref()
        .is_some_and(|c| !p.customer.to_lowercase().contains(&c.to_lowercase()))
    {
        return false;
    }
    if q.min_amount.is_some_and(|min| p.amount < min) {
        return false;
    }
    if q.max_amount.is_some_and(|max| p.amount > max) {
        return false;
    }
    // ISO dates compare correctly as strings.
    if q.date_from.as_deref().is_some_and(|from| p.date.as_str() < from) {
        return false;
    }
    if q.date_to.as_deref().is_some_and(|to| p.date.as_str() > to) {
        return false;
    }
    true
}

fn sort(payments: &mut [Payment], field: SortField, order: SortOrder) {
    payments.sort_by(|a, b| {
        let ordering = match field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Amount => a.amount.partial_cmp(&b.amount).unwrap_or(Ordering::Equal),
            SortField::Currency => a.currency.cmp(&b.currency),
            SortField::Status => format!("{:?}", a.status).cmp(&format!("{:?}", b.status)),
            SortField::Date => a.date.cmp(&b.date),
            SortField::Customer => a.customer.cmp(&b.customer),
            SortField::Method => format!("{:?}", a.method).cmp(&format!("{:?}", b.method)),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn statistics(filtered: &[Payment]) -> PaymentStats {
    let count = |status: PaymentStatus| filtered.iter().filter(|p| p.status == status).count();
    let total_amount: f64 = filtered.iter().map(|p| p.amount).sum();
    PaymentStats {
        total: filtered.len(),
        completed: count(PaymentStatus::Completed),
        pending: count(PaymentStatus::Pending),
        failed: count(PaymentStatus::Failed),
        total_amount,
        average_amount: if filtered.is_empty() {
            0.0
        } else {
            total_amount / filtered.len() as f64
        },
    }
}
