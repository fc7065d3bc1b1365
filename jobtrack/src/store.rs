//! SQLite storage for the domain entities.
//!
//! [`connect`] opens the pool and applies the embedded migrations; the
//! `*_gateway` constructors describe each table to [`SqlGateway`].
//! [`object_gateway`] wraps a bucket for attachments.

use jobtrack_core::config::{DatabaseSettings, StorageSettings};
use jobtrack_data::{BucketProvider, DataError, Mapper, ObjectStoreGateway, Table};
use jobtrack_data_sqlx::{SqlGateway, SqlxErrorExt};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub const USER_TABLE: &str = "users";
pub const JOB_TABLE: &str = "jobs";
pub const RESUME_TABLE: &str = "resume_main_info";
pub const EXPERIENCE_TABLE: &str = "experiences";
pub const TEMPLATE_TABLE: &str = "resume_template";

pub const USER_COLUMNS: &[&str] = &["id", "created_at", "updated_at", "name"];

pub const JOB_COLUMNS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "user_id",
    "title",
    "company",
    "description",
    "country",
    "city",
    "work_setting_type",
    "status",
    "employment_type",
    "notes",
    "external_id",
    "platform",
    "url",
];

pub const RESUME_COLUMNS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "user_id",
    "applicant_name",
    "skills",
    "summary",
    "location",
    "phone",
    "email",
    "linkedin",
    "parent_id",
    "resume_name",
];

pub const EXPERIENCE_COLUMNS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "resume_id",
    "job_title",
    "company_name",
    "start_date",
    "end_date",
    "location",
    "company_description",
    "bullet_points",
];

pub const TEMPLATE_COLUMNS: &[&str] = &["id", "created_at", "updated_at", "version", "resume_template", "parent_id"];

fn table(name: &str, columns: &[&str], multitenant: bool) -> Table {
    let table = Table::new(name, columns);
    if multitenant {
        table.multitenant()
    } else {
        table
    }
}

/// Open the pool described by `settings` and bring the schema up to date.
pub async fn connect(settings: &DatabaseSettings) -> Result<SqlitePool, DataError> {
    let mut options = SqlitePoolOptions::new().max_connections(settings.max_connections);
    // An in-memory database lives as long as its connection.
    if settings.url.contains(":memory:") {
        options = options.idle_timeout(None).max_lifetime(None);
    }
    let pool = options
        .connect(&settings.url)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
    migrate(&pool).await?;
    tracing::info!(url = %settings.url, "database ready");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), DataError> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(DataError::database)
}

pub fn user_gateway(pool: &SqlitePool, multitenant: bool) -> SqlGateway {
    SqlGateway::new(pool.clone(), table(USER_TABLE, USER_COLUMNS, multitenant))
}

pub fn job_gateway(pool: &SqlitePool, multitenant: bool) -> SqlGateway {
    SqlGateway::new(pool.clone(), table(JOB_TABLE, JOB_COLUMNS, multitenant))
}

pub fn experience_gateway(pool: &SqlitePool, multitenant: bool) -> SqlGateway {
    SqlGateway::new(pool.clone(), table(EXPERIENCE_TABLE, EXPERIENCE_COLUMNS, multitenant))
        .with_mapper(Mapper::json_columns(&["bullet_points"]))
}

/// Résumés with their experiences as the `experiences` list.
pub fn resume_gateway(pool: &SqlitePool, multitenant: bool) -> SqlGateway {
    SqlGateway::new(pool.clone(), table(RESUME_TABLE, RESUME_COLUMNS, multitenant))
        .with_mapper(Mapper::json_columns(&["skills"]))
        .one_to_many("experiences", "resume_id", experience_gateway(pool, multitenant))
}

pub fn template_gateway(pool: &SqlitePool, multitenant: bool) -> SqlGateway {
    SqlGateway::new(pool.clone(), table(TEMPLATE_TABLE, TEMPLATE_COLUMNS, multitenant))
}

/// Gateway over `provider`, with presigned URLs valid for the configured expiry.
pub fn object_gateway<P: BucketProvider>(
    provider: P,
    settings: &StorageSettings,
    multitenant: bool,
) -> ObjectStoreGateway<P> {
    let gateway = ObjectStoreGateway::new(provider).presign_expiry(settings.presign_expiry());
    if multitenant {
        gateway.multitenant()
    } else {
        gateway
    }
}
