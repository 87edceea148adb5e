use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

use super::domain::{AgeBand, ApplicantId, ApplicantRecord, ApplicationId, DeliveryState, DocumentRef};
use super::repository::{
    AgeBandCount, ApplicantPage, ApplicantQuery, ApplicantRepository, CourseCount, DailyCount,
    EnrollmentStats, RepositoryError, SortField, SortOrder, WilayaCount,
};

const TRAILING_WEEK_DAYS: i64 = 7;
const TRAILING_CHART_DAYS: i64 = 30;

#[derive(Default)]
struct Inner {
    rows: HashMap<ApplicantId, ApplicantRecord>,
    codes: HashMap<ApplicationId, ApplicantId>,
}

/// Canonical store for single-instance deployments and tests. Every mutation
/// takes the map lock, which gives the row-level write serialization the
/// pipeline relies on.
#[derive(Default, Clone)]
pub struct InMemoryApplicantRepository {
    inner: Arc<Mutex<Inner>>,
}

impl ApplicantRepository for InMemoryApplicantRepository {
    fn create(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if inner.codes.contains_key(&record.applicant.application_id) {
            return Err(RepositoryError::Conflict);
        }
        inner.codes.insert(
            record.applicant.application_id.clone(),
            record.applicant.id,
        );
        inner.rows.insert(record.applicant.id, record.clone());
        Ok(record)
    }

    fn get(&self, id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner.rows.get(id).cloned())
    }

    fn get_by_application_id(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let Some(id) = inner.codes.get(application_id) else {
            return Ok(None);
        };
        Ok(inner.rows.get(id).cloned())
    }

    fn set_document(
        &self,
        id: &ApplicantId,
        document: DocumentRef,
    ) -> Result<ApplicantRecord, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let record = inner.rows.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.document = Some(document);
        if record.state == DeliveryState::Created {
            record.state = DeliveryState::Documented;
        }
        Ok(record.clone())
    }

    fn mark_notified(&self, id: &ApplicantId) -> Result<ApplicantRecord, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let record = inner.rows.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.state = DeliveryState::Notified;
        Ok(record.clone())
    }

    fn list(&self, query: &ApplicantQuery) -> Result<ApplicantPage, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut matches: Vec<&ApplicantRecord> = inner
            .rows
            .values()
            .filter(|record| matches_query(record, query))
            .collect();

        sort_records(&mut matches, query.sort_field, query.sort_order);

        let total = matches.len();
        let applicants = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();

        Ok(ApplicantPage { applicants, total })
    }

    fn stats(&self, now: DateTime<Utc>) -> Result<EnrollmentStats, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let today = now.with_timezone(&Local).date_naive();
        let week_floor = now - Duration::days(TRAILING_WEEK_DAYS);
        let chart_floor = today - Duration::days(TRAILING_CHART_DAYS - 1);

        let mut today_count = 0;
        let mut week_count = 0;
        let mut courses: BTreeMap<String, usize> = BTreeMap::new();
        let mut wilayas: BTreeMap<String, usize> = BTreeMap::new();
        let mut bands: BTreeMap<&'static str, (AgeBand, usize)> = BTreeMap::new();
        let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();

        for record in inner.rows.values() {
            let applicant = &record.applicant;
            let local_date = applicant.created_at.with_timezone(&Local).date_naive();

            if local_date == today {
                today_count += 1;
            }
            if applicant.created_at >= week_floor {
                week_count += 1;
            }
            *courses.entry(applicant.course.clone()).or_default() += 1;
            *wilayas.entry(applicant.wilaya.clone()).or_default() += 1;
            let band = AgeBand::of(applicant.age);
            bands.entry(band.label()).or_insert((band, 0)).1 += 1;
            if local_date >= chart_floor && local_date <= today {
                *daily.entry(local_date).or_default() += 1;
            }
        }

        let mut wilaya_distribution: Vec<WilayaCount> = wilayas
            .into_iter()
            .map(|(wilaya, count)| WilayaCount { wilaya, count })
            .collect();
        // highest-volume wilayas first; name order breaks ties deterministically
        wilaya_distribution.sort_by(|a, b| b.count.cmp(&a.count).then(a.wilaya.cmp(&b.wilaya)));

        Ok(EnrollmentStats {
            total: inner.rows.len(),
            today: today_count,
            this_week: week_count,
            course_distribution: courses
                .into_iter()
                .map(|(course, count)| CourseCount { course, count })
                .collect(),
            wilaya_distribution,
            age_band_distribution: bands
                .into_values()
                .map(|(age_band, count)| AgeBandCount { age_band, count })
                .collect(),
            daily_signups: daily
                .into_iter()
                .map(|(date, count)| DailyCount { date, count })
                .collect(),
        })
    }
}

fn matches_query(record: &ApplicantRecord, query: &ApplicantQuery) -> bool {
    let applicant = &record.applicant;

    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        if !applicant.full_name.to_lowercase().contains(&needle) {
            return false;
        }
    }
    if let Some(wilaya) = &query.wilaya {
        if applicant.wilaya != *wilaya {
            return false;
        }
    }
    if let Some(course) = &query.course {
        if applicant.course != *course {
            return false;
        }
    }
    if let Some(band) = query.age_band {
        if !band.contains(applicant.age) {
            return false;
        }
    }
    let created = applicant.created_at.date_naive();
    if let Some(from) = query.created_from {
        if created < from {
            return false;
        }
    }
    if let Some(to) = query.created_to {
        if created > to {
            return false;
        }
    }
    true
}

fn sort_records(records: &mut [&ApplicantRecord], field: SortField, order: SortOrder) {
    records.sort_by(|a, b| {
        let ordering = match field {
            SortField::CreatedAt => a.applicant.created_at.cmp(&b.applicant.created_at),
            SortField::FullName => a
                .applicant
                .full_name
                .to_lowercase()
                .cmp(&b.applicant.full_name.to_lowercase()),
            SortField::Age => a.applicant.age.cmp(&b.applicant.age),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}
