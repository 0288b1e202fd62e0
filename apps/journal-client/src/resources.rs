//! Journal Resources
//!
//! Typed models for the three paginated journal collections and a generic
//! REST client over them. Each list view owns a [`PagedQuery`] driven by a
//! [`ResourceClient`] as its page source.
//!
//! [`PagedQuery`]: crate::query::PagedQuery

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::gateway::RequestGateway;
use crate::query::{ListQuery, PageSource, Paginated};

/// A journal collection served under a fixed REST path.
pub trait Resource: DeserializeOwned + Serialize + Send + Sync + 'static {
    /// Collection path, e.g. `/api/trade-logs`.
    const PATH: &'static str;
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    /// Long position.
    Long,
    /// Short position.
    Short,
}

/// One logged trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLog {
    /// Server-assigned id.
    pub id: i64,
    /// Instrument symbol.
    pub symbol: String,
    /// Long or short.
    pub direction: TradeDirection,
    /// Entry fill price.
    pub entry_price: Decimal,
    /// Exit fill price; `None` while the position is open.
    #[serde(default)]
    pub exit_price: Option<Decimal>,
    /// Position size.
    pub quantity: Decimal,
    /// Realized profit and loss; `None` while the position is open.
    #[serde(default)]
    pub pnl: Option<Decimal>,
    /// Entry timestamp.
    pub entry_date: DateTime<Utc>,
    /// Exit timestamp; `None` while the position is open.
    #[serde(default)]
    pub exit_date: Option<DateTime<Utc>>,
    /// Strategy this trade followed, if any.
    #[serde(default)]
    pub strategy_id: Option<i64>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Resource for TradeLog {
    const PATH: &'static str = "/api/trade-logs";
}

/// A trading strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Server-assigned id.
    pub id: i64,
    /// Strategy name.
    pub name: String,
    /// Summary of the approach.
    #[serde(default)]
    pub description: Option<String>,
    /// Entry/exit rules.
    #[serde(default)]
    pub rules: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Resource for Strategy {
    const PATH: &'static str = "/api/strategies";
}

/// A market or trade analysis note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Server-assigned id.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Instrument the analysis covers, if any.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Trade this analysis reviews, if any.
    #[serde(default)]
    pub trade_log_id: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Resource for Analysis {
    const PATH: &'static str = "/api/analyses";
}

/// Generic REST client for one journal collection.
pub struct ResourceClient<T> {
    gateway: RequestGateway,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Resource> ResourceClient<T> {
    /// Create a client over the request gateway.
    #[must_use]
    pub fn new(gateway: RequestGateway) -> Self {
        Self {
            gateway,
            _marker: PhantomData,
        }
    }

    /// Fetch one page of the collection.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the request fails.
    pub async fn list(&self, query: &ListQuery) -> Result<Paginated<T>, ApiError> {
        self.gateway
            .get_with_query(T::PATH, &query.to_params())
            .await
    }

    /// Fetch one item by id.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the request fails.
    pub async fn get(&self, id: i64) -> Result<T, ApiError> {
        self.gateway.get(&format!("{}/{id}", T::PATH)).await
    }

    /// Create an item.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the request fails.
    pub async fn create<B: Serialize + Sync + ?Sized>(&self, body: &B) -> Result<T, ApiError> {
        self.gateway.post(T::PATH, body).await
    }

    /// Update an item. Simple overwrite; the server's response is the new
    /// truth.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the request fails.
    pub async fn update<B: Serialize + Sync + ?Sized>(
        &self,
        id: i64,
        body: &B,
    ) -> Result<T, ApiError> {
        self.gateway.put(&format!("{}/{id}", T::PATH), body).await
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the request fails.
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.gateway.delete(&format!("{}/{id}", T::PATH)).await
    }
}

#[async_trait]
impl<T: Resource> PageSource<T> for ResourceClient<T> {
    async fn fetch_page(&self, query: &ListQuery) -> Result<Paginated<T>, ApiError> {
        self.list(query).await
    }
}
