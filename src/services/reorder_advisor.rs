use crate::{db::DbPool, entities::stock_item, errors::ServiceError};
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

/// A stock item that should be reordered, with the reasons it qualified
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReorderSuggestion {
    #[serde(flatten)]
    pub stock_item: stock_item::Model,
    pub below_reorder_level: bool,
    pub expiring_soon: bool,
}

impl ReorderSuggestion {
    /// Classifies `item` against the expiry cutoff; `None` when it does not qualify.
    pub fn evaluate(item: stock_item::Model, expiry_cutoff: NaiveDate) -> Option<Self> {
        let below_reorder_level = item.current_stock < item.reorder_level;
        let expiring_soon = item
            .expiry_date
            .map(|date| date <= expiry_cutoff)
            .unwrap_or(false);

        (below_reorder_level || expiring_soon).then_some(Self {
            stock_item: item,
            below_reorder_level,
            expiring_soon,
        })
    }
}

#[derive(Clone)]
pub struct ReorderAdvisor {
    db: Arc<DbPool>,
    expiry_window_days: u32,
}

impl ReorderAdvisor {
    pub fn new(db: Arc<DbPool>, expiry_window_days: u32) -> Self {
        Self {
            db,
            expiry_window_days,
        }
    }

    /// Items below their reorder level or expiring within the window, by name.
    #[instrument(skip(self))]
    pub async fn list_suggestions(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<ReorderSuggestion>, ServiceError> {
        let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
        let cutoff = as_of + Duration::days(i64::from(self.expiry_window_days));

        let items = stock_item::Entity::find()
            .filter(
                Condition::any()
                    .add(
                        Expr::col(stock_item::Column::CurrentStock)
                            .lt(Expr::col(stock_item::Column::ReorderLevel)),
                    )
                    .add(
                        Condition::all()
                            .add(stock_item::Column::ExpiryDate.is_not_null())
                            .add(stock_item::Column::ExpiryDate.lte(cutoff)),
                    ),
            )
            .order_by_asc(stock_item::Column::Name)
            .order_by_asc(stock_item::Column::Id)
            .all(self.db.as_ref())
            .await?;

        let suggestions: Vec<_> = items
            .into_iter()
            .filter_map(|item| ReorderSuggestion::evaluate(item, cutoff))
            .collect();

        debug!(%as_of, %cutoff, count = suggestions.len(), "Reorder suggestions computed");
        Ok(suggestions)
    }
}
