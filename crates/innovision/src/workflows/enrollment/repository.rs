use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AgeBand, ApplicantId, ApplicantRecord, ApplicationId, DocumentRef};

/// Storage abstraction so the pipeline and admin layers can be exercised in
/// isolation. The store is the only shared mutable resource; implementations
/// must serialize conflicting writes to the same row.
pub trait ApplicantRepository: Send + Sync {
    /// Insert one row. The insert is the enrollment's durability boundary;
    /// an `applicationId` collision is a `Conflict`.
    fn create(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError>;
    fn get(&self, id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError>;
    fn get_by_application_id(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<ApplicantRecord>, RepositoryError>;
    /// Attach the rendered document pointer, advancing `Created` rows to
    /// `Documented`.
    fn set_document(
        &self,
        id: &ApplicantId,
        document: DocumentRef,
    ) -> Result<ApplicantRecord, RepositoryError>;
    /// Record that the confirmation email was delivered at least once.
    fn mark_notified(&self, id: &ApplicantId) -> Result<ApplicantRecord, RepositoryError>;
    /// Filtered, sorted, paginated listing. `total` counts the filtered set,
    /// not the whole table.
    fn list(&self, query: &ApplicantQuery) -> Result<ApplicantPage, RepositoryError>;
    /// Aggregate counts for the dashboard, relative to `now`.
    fn stats(&self, now: DateTime<Utc>) -> Result<EnrollmentStats, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CreatedAt,
    FullName,
    Age,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Typed filter set compiled into the store's native query form; optional
/// fields narrow the match, date bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicantQuery {
    pub search: Option<String>,
    pub wilaya: Option<String>,
    pub course: Option<String>,
    pub age_band: Option<AgeBand>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ApplicantQuery {
    fn default() -> Self {
        Self {
            search: None,
            wilaya: None,
            course: None,
            age_band: None,
            created_from: None,
            created_to: None,
            sort_field: SortField::CreatedAt,
            sort_order: SortOrder::Desc,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// One page of matching records plus the filtered total.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantPage {
    pub applicants: Vec<ApplicantRecord>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseCount {
    pub course: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WilayaCount {
    pub wilaya: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeBandCount {
    pub age_band: AgeBand,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Aggregates backing the admin dashboard tiles and charts. `daily_signups`
/// spans the trailing 30 local days and includes only days with at least one
/// record; consumers treat missing days as zero.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentStats {
    pub total: usize,
    pub today: usize,
    pub this_week: usize,
    pub course_distribution: Vec<CourseCount>,
    pub wilaya_distribution: Vec<WilayaCount>,
    pub age_band_distribution: Vec<AgeBandCount>,
    pub daily_signups: Vec<DailyCount>,
}
