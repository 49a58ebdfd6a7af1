use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use sqlx::{Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    application::query::{FilterField, FilterValue, QueryPlan},
    application::repos::{ConferencesRepo, CreateConferenceParams, RepoError},
    domain::entities::ConferenceRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const CONFERENCE_COLUMNS: &str = "c.id, c.name, c.description, c.topics, c.city, \
     c.start_date, c.end_date, c.month, c.max_attendees, c.seats_available, \
     c.organizer_id, c.created_at";

#[derive(sqlx::FromRow)]
struct ConferenceRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    topics: Vec<String>,
    city: String,
    start_date: Option<Date>,
    end_date: Option<Date>,
    month: i16,
    max_attendees: i32,
    seats_available: i32,
    organizer_id: String,
    created_at: OffsetDateTime,
}

impl From<ConferenceRow> for ConferenceRecord {
    fn from(row: ConferenceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            topics: row.topics,
            city: row.city,
            start_date: row.start_date,
            end_date: row.end_date,
            month: row.month,
            max_attendees: row.max_attendees,
            seats_available: row.seats_available,
            organizer_id: row.organizer_id,
            created_at: row.created_at,
        }
    }
}

/// Render a validated plan into SQL. Topic filters match any element of
/// the `topics` array; every other field compares a scalar column. The
/// ordering contract comes straight from the plan: the inequality
/// column first (a range scan must be sorted by its range key), then
/// name as the deterministic tie-break.
pub fn build_conference_query(plan: &QueryPlan) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {CONFERENCE_COLUMNS} FROM conferences c WHERE 1=1 "
    ));

    for filter in &plan.filters {
        match filter.field {
            FilterField::Topic => {
                qb.push("AND EXISTS (SELECT 1 FROM unnest(c.topics) AS t(topic) WHERE t.topic ");
                qb.push(filter.operator.sql());
                qb.push(" ");
                push_value(&mut qb, &filter.value);
                qb.push(") ");
            }
            field => {
                qb.push("AND c.");
                qb.push(field.column());
                qb.push(" ");
                qb.push(filter.operator.sql());
                qb.push(" ");
                push_value(&mut qb, &filter.value);
                qb.push(" ");
            }
        }
    }

    qb.push("ORDER BY ");
    let order = plan.order_columns();
    for (i, column) in order.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push("c.");
        qb.push(*column);
    }

    qb
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Text(text) => {
            qb.push_bind(text.clone());
        }
        FilterValue::Int(int) => {
            qb.push_bind(*int);
        }
    }
}

#[async_trait]
impl ConferencesRepo for PostgresRepositories {
    async fn create_conference(
        &self,
        params: CreateConferenceParams,
    ) -> Result<ConferenceRecord, RepoError> {
        let row = sqlx::query_as::<_, ConferenceRow>(&format!(
            "INSERT INTO conferences
                 (name, description, topics, city, start_date, end_date,
                  month, max_attendees, seats_available, organizer_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {CONFERENCE_COLUMNS}"
        ))
        .bind(&params.name)
        .bind(params.description.as_deref())
        .bind(&params.topics)
        .bind(&params.city)
        .bind(params.start_date)
        .bind(params.end_date)
        .bind(params.month)
        .bind(params.max_attendees)
        .bind(params.seats_available)
        .bind(&params.organizer_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_conference(&self, id: Uuid) -> Result<Option<ConferenceRecord>, RepoError> {
        let row = sqlx::query_as::<_, ConferenceRow>(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences c WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list_by_organizer(
        &self,
        organizer_id: &str,
    ) -> Result<Vec<ConferenceRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ConferenceRow>(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences c
              WHERE c.organizer_id = $1
              ORDER BY c.created_at DESC"
        ))
        .bind(organizer_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_attending(&self, user_id: &str) -> Result<Vec<ConferenceRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ConferenceRow>(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences c
               JOIN registrations r ON r.conference_id = c.id
              WHERE r.profile_id = $1
              ORDER BY r.created_at"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn query_conferences(
        &self,
        plan: QueryPlan,
    ) -> BoxStream<'_, Result<ConferenceRecord, RepoError>> {
        Box::pin(try_stream! {
            let mut qb = build_conference_query(&plan);
            let mut rows = qb.build_query_as::<ConferenceRow>().fetch(self.pool());
            while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
                yield ConferenceRecord::from(row);
            }
        })
    }

    async fn list_nearly_sold_out(
        &self,
        threshold: i32,
    ) -> Result<Vec<ConferenceRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ConferenceRow>(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences c
              WHERE c.seats_available > 0 AND c.seats_available <= $1
              ORDER BY c.name"
        ))
        .bind(threshold)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::query::{RawFilter, translate_filters};

    fn plan_for(triples: &[(&str, &str, &str)]) -> QueryPlan {
        let raw: Vec<RawFilter> = triples
            .iter()
            .map(|(field, operator, value)| RawFilter {
                field: field.to_string(),
                operator: operator.to_string(),
                value: value.to_string(),
            })
            .collect();
        translate_filters(&raw).unwrap()
    }

    #[test]
    fn unfiltered_query_orders_by_name() {
        let mut qb = build_conference_query(&QueryPlan::default());
        let sql = qb.sql();
        assert!(sql.contains("FROM conferences c"));
        assert!(sql.ends_with("ORDER BY c.name"));
    }

    #[test]
    fn equality_filters_become_bound_comparisons() {
        let mut qb = build_conference_query(&plan_for(&[("CITY", "EQ", "London")]));
        let sql = qb.sql();
        assert!(sql.contains("AND c.city = $1"));
        assert!(sql.ends_with("ORDER BY c.name"));
    }

    #[test]
    fn inequality_column_leads_the_ordering() {
        let mut qb = build_conference_query(&plan_for(&[
            ("CITY", "EQ", "London"),
            ("MONTH", "GT", "5"),
        ]));
        let sql = qb.sql();
        assert!(sql.contains("AND c.city = $1"));
        assert!(sql.contains("AND c.month > $2"));
        assert!(sql.ends_with("ORDER BY c.month, c.name"));
    }

    #[test]
    fn topic_filter_matches_array_elements() {
        let mut qb = build_conference_query(&plan_for(&[("TOPIC", "EQ", "Rust")]));
        let sql = qb.sql();
        assert!(
            sql.contains("EXISTS (SELECT 1 FROM unnest(c.topics) AS t(topic) WHERE t.topic = $1)")
        );
    }
}
