use chrono::{DateTime, NaiveDate, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for internal applicant rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicantId(pub Uuid);

impl ApplicantId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

pub const APPLICATION_ID_PREFIX: &str = "INV";
const APPLICATION_ID_SUFFIX_LEN: usize = 9;

/// Human-shareable enrollment code handed to applicants, distinct from the
/// internal storage id. Assigned once at creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    /// Millisecond time component plus a random suffix. Collisions are not a
    /// practical concern at this entropy; the repository still refuses
    /// duplicates as a defense against generator defects.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(APPLICATION_ID_SUFFIX_LEN)
            .map(char::from)
            .collect::<String>()
            .to_ascii_uppercase();
        Self(format!(
            "{APPLICATION_ID_PREFIX}-{}-{suffix}",
            now.timestamp_millis()
        ))
    }

    pub fn is_well_formed(&self) -> bool {
        let mut parts = self.0.splitn(3, '-');
        let prefix = parts.next().unwrap_or_default();
        let millis = parts.next().unwrap_or_default();
        let suffix = parts.next().unwrap_or_default();
        prefix == APPLICATION_ID_PREFIX
            && !millis.is_empty()
            && millis.chars().all(|c| c.is_ascii_digit())
            && suffix.len() == APPLICATION_ID_SUFFIX_LEN
            && suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    }
}

/// UI language captured at submission time; drives confirmation email layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Fr,
    En,
    Ar,
}

impl Locale {
    pub const fn as_str(self) -> &'static str {
        match self {
            Locale::Fr => "fr",
            Locale::En => "en",
            Locale::Ar => "ar",
        }
    }

    pub const fn is_rtl(self) -> bool {
        matches!(self, Locale::Ar)
    }
}

/// Raw payload captured by the public enrollment form. The birth date stays
/// a string here so an unparseable value is reported as a field violation
/// alongside the others instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentSubmission {
    pub full_name: String,
    pub email: String,
    pub birth_date: String,
    pub wilaya: String,
    pub phone: String,
    pub course: String,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub consent: bool,
}

/// Persisted enrollment row. `age` is frozen at submission time and never
/// recomputed from `birth_date`, even for reads long after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub application_id: ApplicationId,
    pub full_name: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub age: u32,
    pub wilaya: String,
    pub phone: String,
    pub course: String,
    pub locale: Locale,
    pub created_at: DateTime<Utc>,
}

/// Progress of the post-persist pipeline steps for one applicant. The row is
/// durable from `Created` on; the later states only record which best-effort
/// artifacts materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Created,
    Documented,
    Notified,
}

impl DeliveryState {
    pub const fn label(self) -> &'static str {
        match self {
            DeliveryState::Created => "created",
            DeliveryState::Documented => "documented",
            DeliveryState::Notified => "notified",
        }
    }

    pub const fn email_sent(self) -> bool {
        matches!(self, DeliveryState::Notified)
    }
}

/// Retrieval pointer for the confirmation document. The document itself is
/// regenerated on demand from the applicant row, so the pointer stays valid
/// even when the render step failed during intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef(pub String);

impl DocumentRef {
    pub fn for_application(application_id: &ApplicationId) -> Self {
        Self(format!("/api/pdf/{}", application_id.0))
    }
}

/// Repository record pairing the applicant row with its delivery progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub applicant: Applicant,
    pub state: DeliveryState,
    pub document: Option<DocumentRef>,
}

impl ApplicantRecord {
    pub fn new(applicant: Applicant) -> Self {
        Self {
            applicant,
            state: DeliveryState::Created,
            document: None,
        }
    }

    pub fn summary_view(&self) -> ApplicantView {
        ApplicantView {
            id: self.applicant.id,
            application_id: self.applicant.application_id.clone(),
            full_name: self.applicant.full_name.clone(),
            email: self.applicant.email.clone(),
            birth_date: self.applicant.birth_date,
            age: self.applicant.age,
            wilaya: self.applicant.wilaya.clone(),
            phone: self.applicant.phone.clone(),
            course: self.applicant.course.clone(),
            locale: self.applicant.locale,
            created_at: self.applicant.created_at,
            status: self.state.label(),
            email_sent: self.state.email_sent(),
            pdf_url: self.document.clone(),
        }
    }
}

/// Sanitized representation of one applicant for the admin listing.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantView {
    pub id: ApplicantId,
    pub application_id: ApplicationId,
    pub full_name: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub age: u32,
    pub wilaya: String,
    pub phone: String,
    pub course: String,
    pub locale: Locale,
    pub created_at: DateTime<Utc>,
    pub status: &'static str,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<DocumentRef>,
}

/// Fixed partitions of valid ages used for filtering and statistics. The two
/// bands cover every admissible age with no overlap and no gap starting at 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeBand {
    Kids,
    Adults,
}

pub const MINIMUM_AGE: u32 = 8;

impl AgeBand {
    pub const fn of(age: u32) -> Self {
        if age <= 17 {
            AgeBand::Kids
        } else {
            AgeBand::Adults
        }
    }

    pub const fn contains(self, age: u32) -> bool {
        match self {
            AgeBand::Kids => age >= MINIMUM_AGE && age <= 17,
            AgeBand::Adults => age >= 18,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AgeBand::Kids => "kids",
            AgeBand::Adults => "adults",
        }
    }
}

/// Response handed back to the submitting client. The document reference is
/// returned even when the render or notification steps failed; the admin
/// surface exposes the degraded state instead.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentReceipt {
    pub application_id: ApplicationId,
    pub document: DocumentRef,
}
