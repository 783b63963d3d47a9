//! SQL building helpers shared by the entity services.
//!
//! Partial updates are expressed as request structs whose fields are all
//! `Option`. Each struct lists its own columns and pushes an assignment into
//! an [`UpdateBuilder`] only for the fields that were provided, so a PATCH
//! never touches a column the client did not send.

use serde::Deserialize;
use sqlx::{Encode, Postgres, QueryBuilder, Type};
use uuid::Uuid;

use crate::error::AppError;

/// Default number of rows returned by list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Upper bound on rows returned by list endpoints.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Accumulates `column = $n` assignments for one dynamic UPDATE statement.
pub struct UpdateBuilder<'a> {
    builder: QueryBuilder<'a, Postgres>,
    assigned: usize,
}

impl<'a> UpdateBuilder<'a> {
    pub fn new(table: &str) -> Self {
        Self {
            builder: QueryBuilder::new(format!("UPDATE {table} SET ")),
            assigned: 0,
        }
    }

    /// Assign `column` if `value` is present; no-op otherwise.
    pub fn set<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        if let Some(value) = value {
            if self.assigned > 0 {
                self.builder.push(", ");
            }
            self.builder.push(column).push(" = ").push_bind(value);
            self.assigned += 1;
        }
        self
    }

    pub fn assigned(&self) -> usize {
        self.assigned
    }

    /// Close the statement with the row filter and `RETURNING *`.
    ///
    /// Soft-deletable tables also filter out deleted rows so an update of a
    /// deleted entity affects nothing and surfaces as not found.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when no column was assigned.
    pub fn finish(mut self, id: Uuid, soft_delete: bool) -> Result<QueryBuilder<'a, Postgres>, AppError> {
        if self.assigned == 0 {
            return Err(AppError::invalid("no fields to update"));
        }

        self.builder.push(", modified = NOW() WHERE id = ").push_bind(id);
        if soft_delete {
            self.builder.push(" AND deleted IS NULL");
        }
        self.builder.push(" RETURNING *");

        Ok(self.builder)
    }
}

/// Implemented by PATCH request bodies.
pub trait ColumnUpdate {
    /// Push an assignment for every field that is `Some`.
    fn assign<'a>(self, builder: &mut UpdateBuilder<'a>);
}

/// `?limit=&offset=` query parameters of list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn only_present_columns_are_assigned() {
        let mut builder = UpdateBuilder::new("businesses");
        builder
            .set("legal_name", Some("Acme LLC".to_string()))
            .set::<String>("dba", None)
            .set("email", Some("ops@acme.test".to_string()));

        assert_eq!(builder.assigned(), 2);

        let query = builder.finish(Uuid::nil(), true).unwrap();
        assert_eq!(
            query.sql(),
            "UPDATE businesses SET legal_name = $1, email = $2, modified = NOW() \
             WHERE id = $3 AND deleted IS NULL RETURNING *"
        );
    }

    #[rstest]
    fn tables_without_soft_delete_skip_the_filter() {
        let mut builder = UpdateBuilder::new("subscriptions");
        builder.set("plan", Some("growth".to_string()));

        let query = builder.finish(Uuid::nil(), false).unwrap();
        assert!(query.sql().ends_with("WHERE id = $2 RETURNING *"));
    }

    #[rstest]
    fn empty_update_is_rejected() {
        let builder = UpdateBuilder::new("notes");
        assert!(matches!(
            builder.finish(Uuid::nil(), true),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[rstest]
    #[case(None, None, 20, 0)]
    #[case(Some(500), Some(40), 100, 40)]
    #[case(Some(0), Some(-5), 1, 0)]
    fn page_bounds(
        #[case] limit: Option<i64>,
        #[case] offset: Option<i64>,
        #[case] expected_limit: i64,
        #[case] expected_offset: i64,
    ) {
        let page = Page { limit, offset };
        assert_eq!(page.limit(), expected_limit);
        assert_eq!(page.offset(), expected_offset);
    }
}
