// Database repository for the service catalog

use sqlx::PgPool;

use crate::catalog::models::{Service, ServiceCategory};

const SERVICE_COLUMNS: &str = "id, name, description, features, category, price, \
     duration_minutes, is_active, sort_order, loyalty_points_earned, \
     seasonal_pricing, availability, vehicle_types";

/// Catalog repository for read access to services
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    /// Create a new CatalogRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List active services, optionally filtered by category, in display order
    pub async fn list_active(
        &self,
        category: Option<ServiceCategory>,
    ) -> Result<Vec<Service>, sqlx::Error> {
        let services = match category {
            Some(category) => {
                sqlx::query_as::<_, Service>(&format!(
                    "SELECT {SERVICE_COLUMNS} FROM services \
                     WHERE is_active = TRUE AND category = $1 \
                     ORDER BY sort_order, id"
                ))
                .bind(category)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Service>(&format!(
                    "SELECT {SERVICE_COLUMNS} FROM services \
                     WHERE is_active = TRUE ORDER BY sort_order, id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(services)
    }

    /// Find a service by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Service>, sqlx::Error> {
        sqlx::query_as::<_, Service>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find several services by ID. The result preserves no particular order
    /// and silently skips unknown IDs; callers check completeness.
    pub async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Service>, sqlx::Error> {
        sqlx::query_as::<_, Service>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }
}
