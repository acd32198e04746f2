//! Universal search scaffold over mock collections with a small
//! lexical relevance score.

use axum::{extract::Query, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Users,
    Payments,
    Products,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "type")]
    pub kind: Option<SearchKind>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(flatten)]
    pub record: serde_json::Value,
    pub relevance: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub results: Vec<SearchHit>,
}

struct MockRecord {
    kind: &'static str,
    /// Fields a query term is matched against.
    haystack: &'static [&'static str],
    /// Text the relevance score is computed over.
    scored: &'static str,
    json: fn() -> serde_json::Value,
}

fn mock_records() -> Vec<MockRecord> {
    use serde_json::json;
    vec![
        MockRecord {
            kind: "user",
            haystack: &["John Doe", "john@example.com", "admin"],
            scored: "John Doe john@example.com",
            json: || json!({"id": 1, "name": "John Doe", "email": "john@example.com", "role": "admin"}),
        },
        MockRecord {
            kind: "user",
            haystack: &["Jane Smith", "jane@example.com", "user"],
            scored: "Jane Smith jane@example.com",
            json: || json!({"id": 2, "name": "Jane Smith", "email": "jane@example.com", "role": "user"}),
        },
        MockRecord {
            kind: "user",
            haystack: &["Bob Johnson", "bob@example.com", "user"],
            scored: "Bob Johnson bob@example.com",
            json: || json!({"id": 3, "name": "Bob Johnson", "email": "bob@example.com", "role": "user"}),
        },
        MockRecord {
            kind: "payment",
            haystack: &["John Doe", "completed"],
            scored: "John Doe completed",
            json: || json!({"id": 1, "amount": 150.00, "customer": "John Doe", "status": "completed"}),
        },
        MockRecord {
            kind: "payment",
            haystack: &["Jane Smith", "pending"],
            scored: "Jane Smith pending",
            json: || json!({"id": 2, "amount": 75.50, "customer": "Jane Smith", "status": "pending"}),
        },
        MockRecord {
            kind: "payment",
            haystack: &["Bob Johnson", "completed"],
            scored: "Bob Johnson completed",
            json: || json!({"id": 3, "amount": 200.00, "customer": "Bob Johnson", "status": "completed"}),
        },
        MockRecord {
            kind: "product",
            haystack: &["Laptop Pro", "Electronics"],
            scored: "Laptop Pro Electronics",
            json: || json!({"id": 1, "name": "Laptop Pro", "category": "Electronics", "price": 999.99}),
        },
        MockRecord {
            kind: "product",
            haystack: &["Wireless Mouse", "Electronics"],
            scored: "Wireless Mouse Electronics",
            json: || json!({"id": 2, "name": "Wireless Mouse", "category": "Electronics", "price": 29.99}),
        },
        MockRecord {
            kind: "product",
            haystack: &["Office Chair", "Furniture"],
            scored: "Office Chair Furniture",
            json: || json!({"id": 3, "name": "Office Chair", "category": "Furniture", "price": 199.99}),
        },
    ]
}

fn kind_matches(filter: Option<SearchKind>, kind: &str) -> bool {
    match filter {
        None => true,
        Some(SearchKind::Users) => kind == "user",
        Some(SearchKind::Payments) => kind == "payment",
        Some(SearchKind::Products) => kind == "product",
    }
}

/// Lexical score: exact match 100, prefix 80, substring 60, plus 20 per
/// exact word hit and 10 per word containment.
pub fn relevance(query: &str, text: &str) -> i64 {
    let query = query.to_lowercase();
    let text = text.to_lowercase();

    let mut score = 0;
    if text == query {
        score += 100;
    } else if text.starts_with(&query) {
        score += 80;
    } else if text.contains(&query) {
        score += 60;
    }

    for query_word in query.split_whitespace() {
        for text_word in text.split_whitespace() {
            if text_word == query_word {
                score += 20;
            } else if text_word.contains(query_word) {
                score += 10;
            }
        }
    }
    score
}

pub fn run_search(q: &str, kind: Option<SearchKind>, limit: usize) -> Vec<SearchHit> {
    let needle = q.to_lowercase();
    let mut hits: Vec<SearchHit> = mock_records()
        .into_iter()
        .filter(|r| kind_matches(kind, r.kind))
        .filter(|r| r.haystack.iter().any(|f| f.to_lowercase().contains(&needle)))
        .map(|r| SearchHit {
            kind: r.kind,
            record: (r.json)(),
            relevance: relevance(q, r.scored),
        })
        .collect();
    hits.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    hits.truncate(limit);
    hits
}

#[instrument]
async fn search(Query(query): Query<SearchQuery>) -> Result<Json<SearchResponse>, ApiError> {
    if query.q.trim().is_empty() {
        return Err(ApiError::Validation("Search query is required".into()));
    }
    let results = run_search(&query.q, query.kind, query.limit);
    Ok(Json(SearchResponse {
        total: results.len(),
        query: query.q,
        results,
    }))
}
