use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use sqlx::{FromRow, PgPool, Postgres};
use tracing::debug;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    CitizenFilter, CitizenFlag, CitizenPatch, CitizenRecord, ColumnInfo, NewCitizen, TableInfo,
    User,
};
use crate::database::repository::Repository;
use crate::database::store::{CitizenStore, SchemaCatalog, UserStore};
use crate::filter::{contains_pattern, FilterData};

const CITIZENS: &str = "citizens";
const USERS: &str = "users";
const ORDER_BY_ID: &str = "id asc";

/// Name of the UNIQUE constraint on `citizens.national_id` (see migrations)
pub const NATIONAL_ID_CONSTRAINT: &str = "citizens_national_id_key";

const SEARCH_COLUMNS: [&str; 4] = ["full_name", "national_id", "neighborhood", "full_address"];

const CATALOG_QUERY: &str = r#"
SELECT c.table_name::text AS table_name,
       c.column_name::text AS column_name,
       c.data_type::text AS data_type,
       (c.is_nullable = 'YES') AS nullable,
       EXISTS (
           SELECT 1
           FROM information_schema.table_constraints tc
           JOIN information_schema.key_column_usage kcu
             ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
            AND tc.table_name = kcu.table_name
           WHERE tc.constraint_type = 'PRIMARY KEY'
             AND tc.table_schema = c.table_schema
             AND tc.table_name = c.table_name
             AND kcu.column_name = c.column_name
       ) AS primary_key
FROM information_schema.columns c
JOIN information_schema.tables t
  ON t.table_schema = c.table_schema AND t.table_name = c.table_name
WHERE c.table_schema = 'public'
  AND t.table_type = 'BASE TABLE'
  AND c.table_name NOT LIKE '\_sqlx%'
ORDER BY c.table_name, c.ordinal_position
"#;

#[derive(FromRow)]
struct CatalogRow {
    table_name: String,
    column_name: String,
    data_type: String,
    nullable: bool,
    primary_key: bool,
}

/// Postgres-backed store for citizens, users and the schema catalog
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn citizens(&self) -> Repository<CitizenRecord> {
        Repository::new(CITIZENS, self.pool.clone())
    }

    fn users(&self) -> Repository<User> {
        Repository::new(USERS, self.pool.clone())
    }
}

#[async_trait]
impl CitizenStore for PgStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<CitizenRecord>, DatabaseError> {
        self.citizens()
            .select_one(FilterData {
                where_clause: Some(json!({ "id": id })),
                ..Default::default()
            })
            .await
    }

    async fn find_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<CitizenRecord>, DatabaseError> {
        self.citizens()
            .select_one(FilterData {
                where_clause: Some(json!({ "national_id": national_id })),
                ..Default::default()
            })
            .await
    }

    async fn select(
        &self,
        filter: &CitizenFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CitizenRecord>, DatabaseError> {
        self.citizens()
            .select_any(FilterData {
                where_clause: filter.to_where(),
                order: Some(ORDER_BY_ID.to_string()),
                limit: Some(limit),
                offset: Some(offset),
                ..Default::default()
            })
            .await
    }

    async fn count(&self, filter: &CitizenFilter) -> Result<i64, DatabaseError> {
        self.citizens()
            .count(FilterData {
                where_clause: filter.to_where(),
                ..Default::default()
            })
            .await
    }

    async fn search(&self, term: &str, limit: i64) -> Result<Vec<CitizenRecord>, DatabaseError> {
        let pattern = contains_pattern(term);
        let any_column: Vec<_> = SEARCH_COLUMNS
            .iter()
            .map(|column| {
                let mut condition = Map::new();
                condition.insert(column.to_string(), json!({ "$ilike": pattern }));
                Value::Object(condition)
            })
            .collect();

        self.citizens()
            .select_any(FilterData {
                where_clause: Some(json!({ "$or": any_column })),
                order: Some(ORDER_BY_ID.to_string()),
                limit: Some(limit),
                ..Default::default()
            })
            .await
    }

    async fn insert(
        &self,
        citizen: &NewCitizen,
        registration_date: NaiveDate,
    ) -> Result<CitizenRecord, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let taken: Option<i32> =
            sqlx::query_scalar("SELECT id FROM citizens WHERE national_id = $1")
                .bind(&citizen.national_id)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(DatabaseError::UniqueViolation(NATIONAL_ID_CONSTRAINT.to_string()));
        }

        let record = sqlx::query_as::<_, CitizenRecord>(
            r#"
            INSERT INTO citizens (
                full_name, national_id, spouse_name, spouse_national_id, neighborhood,
                zone, phone, email, full_address, social_program,
                registration_status, registration_date, active, voted, eligible
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, TRUE, FALSE, TRUE)
            RETURNING *
            "#,
        )
        .bind(&citizen.full_name)
        .bind(&citizen.national_id)
        .bind(&citizen.spouse_name)
        .bind(&citizen.spouse_national_id)
        .bind(&citizen.neighborhood)
        .bind(&citizen.zone)
        .bind(&citizen.phone)
        .bind(&citizen.email)
        .bind(&citizen.full_address)
        .bind(&citizen.social_program)
        .bind(&citizen.registration_status)
        .bind(registration_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Inserted citizen {}", record.id);
        Ok(record)
    }

    async fn update(
        &self,
        id: i32,
        patch: &CitizenPatch,
    ) -> Result<Option<CitizenRecord>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, CitizenRecord>(
            "SELECT * FROM citizens WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(current) = current else {
            return Ok(None);
        };

        if let Some(national_id) = &patch.national_id {
            let taken: Option<i32> =
                sqlx::query_scalar("SELECT id FROM citizens WHERE national_id = $1 AND id <> $2")
                    .bind(national_id)
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if taken.is_some() {
                return Err(DatabaseError::UniqueViolation(NATIONAL_ID_CONSTRAINT.to_string()));
            }
        }

        if patch.is_empty() {
            tx.commit().await?;
            return Ok(Some(current));
        }

        let mut builder = sqlx::QueryBuilder::<Postgres>::new("UPDATE citizens SET ");
        {
            let mut set = builder.separated(", ");
            if let Some(v) = &patch.full_name {
                set.push("full_name = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &patch.national_id {
                set.push("national_id = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &patch.spouse_name {
                set.push("spouse_name = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &patch.spouse_national_id {
                set.push("spouse_national_id = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &patch.neighborhood {
                set.push("neighborhood = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &patch.zone {
                set.push("zone = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &patch.phone {
                set.push("phone = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &patch.email {
                set.push("email = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &patch.full_address {
                set.push("full_address = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &patch.social_program {
                set.push("social_program = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &patch.registration_status {
                set.push("registration_status = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = patch.active {
                set.push("active = ").push_bind_unseparated(v);
            }
        }
        builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        let record = builder
            .build_query_as::<CitizenRecord>()
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("Updated citizen {}", id);
        Ok(Some(record))
    }

    async fn set_flag(
        &self,
        id: i32,
        flag: CitizenFlag,
        value: bool,
    ) -> Result<Option<CitizenRecord>, DatabaseError> {
        let sql = format!(
            "UPDATE citizens SET \"{}\" = $1 WHERE id = $2 RETURNING *",
            flag.column()
        );
        let record = sqlx::query_as::<_, CitizenRecord>(&sql)
            .bind(value)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        debug!("Set {} = {} on citizen {}", flag.column(), value, id);
        Ok(record)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, DatabaseError> {
        self.users()
            .select_one(FilterData {
                where_clause: Some(json!({ "name": name })),
                ..Default::default()
            })
            .await
    }

    async fn list(&self) -> Result<Vec<User>, DatabaseError> {
        self.users()
            .select_any(FilterData {
                order: Some(ORDER_BY_ID.to_string()),
                ..Default::default()
            })
            .await
    }

    async fn insert(&self, name: &str, password_hash: &str) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, password_hash) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl SchemaCatalog for PgStore {
    async fn tables(&self) -> Result<Vec<TableInfo>, DatabaseError> {
        let rows = sqlx::query_as::<_, CatalogRow>(CATALOG_QUERY)
            .fetch_all(&self.pool)
            .await?;

        let mut tables: Vec<TableInfo> = Vec::new();
        for row in rows {
            let column = ColumnInfo {
                name: row.column_name,
                data_type: row.data_type,
                nullable: row.nullable,
                primary_key: row.primary_key,
            };
            match tables.last_mut() {
                Some(table) if table.name == row.table_name => table.columns.push(column),
                _ => tables.push(TableInfo {
                    name: row.table_name,
                    columns: vec![column],
                }),
            }
        }
        Ok(tables)
    }
}
