use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use recruiting_bots::database::pool::{connect, run_migrations};
use recruiting_bots::models::manager::ManagerProfile;
use recruiting_bots::models::record_kind::{ColumnValue, RecordKind};
use recruiting_bots::services::manager_service::ManagerService;
use recruiting_bots::services::record_service::{RecordService, WriteOutcome};
use recruiting_bots::services::resume_service::ResumeService;
use recruiting_bots::services::user_data_service::UserDataDirs;
use recruiting_bots::services::vacancy_service::VacancyService;
use serde_json::json;
use sqlx::PgPool;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Connects to the database named by `DATABASE_URL` and applies migrations.
/// These tests are ignored by default; run them with `cargo test -- --ignored`.
async fn setup_pool() -> PgPool {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
    let pool = connect(&url, 5).await.expect("pool");
    run_migrations(&pool).await.expect("migrations");
    pool
}

/// Numeric ids that will not collide between tests or runs.
fn unique_id() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64;
    let seq = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}{:03}", nanos % 1_000_000_000_000, seq % 1000)
}

fn unique_vacancy_id() -> i64 {
    unique_id().parse().unwrap()
}

async fn cleanup_manager(pool: &PgPool, manager_id: &str) {
    sqlx::query("DELETE FROM managers WHERE id = $1")
        .bind(manager_id)
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn manager_lifecycle_through_the_column_accessor() {
    let pool = setup_pool().await;
    let records = RecordService::new(pool.clone());
    let id = unique_id();

    assert!(!records.record_exists(RecordKind::Manager, &id).await);
    assert!(records
        .create_record_if_absent(RecordKind::Manager, &id)
        .await
        .unwrap());
    assert!(records.record_exists(RecordKind::Manager, &id).await);
    assert_eq!(
        records
            .get_column_value(RecordKind::Manager, &id, "access_token")
            .await,
        Some(ColumnValue::Null)
    );

    assert_eq!(
        records
            .get_column_value(RecordKind::Manager, &id, "privacy_policy_confirmed")
            .await,
        Some(ColumnValue::Boolean(false))
    );
    assert!(!records
        .boolean_field_is_true(RecordKind::Manager, &id, "privacy_policy_confirmed")
        .await);

    let outcome = records
        .set_column_value(RecordKind::Manager, &id, "privacy_policy_confirmed", true)
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Applied);
    assert!(records
        .boolean_field_is_true(RecordKind::Manager, &id, "privacy_policy_confirmed")
        .await);

    records
        .set_column_value(RecordKind::Manager, &id, "access_token", "tok-1")
        .await
        .unwrap();
    assert_eq!(
        records
            .get_column_value(RecordKind::Manager, &id, "access_token")
            .await,
        Some(ColumnValue::Text("tok-1".to_string()))
    );

    let outcome = records
        .clear_column_value(RecordKind::Manager, &id, "access_token")
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Applied);
    assert_eq!(
        records
            .get_column_value(RecordKind::Manager, &id, "access_token")
            .await,
        Some(ColumnValue::Null)
    );

    cleanup_manager(&pool, &id).await;
}

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn create_if_absent_is_idempotent() {
    let pool = setup_pool().await;
    let records = RecordService::new(pool.clone());
    let id = unique_id();

    assert!(records
        .create_record_if_absent(RecordKind::Manager, &id)
        .await
        .unwrap());
    records
        .set_column_value(RecordKind::Manager, &id, "username", "anna")
        .await
        .unwrap();
    assert!(!records
        .create_record_if_absent(RecordKind::Manager, &id)
        .await
        .unwrap());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM managers WHERE id = $1")
        .bind(&id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(
        records
            .get_column_value(RecordKind::Manager, &id, "username")
            .await,
        Some(ColumnValue::Text("anna".to_string()))
    );

    cleanup_manager(&pool, &id).await;
}

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn concurrent_creation_yields_one_row() {
    let pool = setup_pool().await;
    let records = RecordService::new(pool.clone());
    let id = unique_id();

    let (a, b) = tokio::join!(
        records.create_record_if_absent(RecordKind::Manager, &id),
        records.create_record_if_absent(RecordKind::Manager, &id),
    );
    assert_eq!(
        [a.unwrap(), b.unwrap()].iter().filter(|created| **created).count(),
        1
    );

    cleanup_manager(&pool, &id).await;
}

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn unknown_fields_and_empty_updates_are_sentinels() {
    let pool = setup_pool().await;
    let records = RecordService::new(pool.clone());
    let id = unique_id();
    records
        .create_record_if_absent(RecordKind::Manager, &id)
        .await
        .unwrap();

    assert_eq!(
        records
            .get_column_value(RecordKind::Manager, &id, "password")
            .await,
        None
    );
    assert_eq!(
        records
            .set_column_value(RecordKind::Manager, &id, "password", "x")
            .await
            .unwrap(),
        WriteOutcome::Rejected
    );
    assert_eq!(
        records
            .clear_column_value(RecordKind::Manager, &id, "password")
            .await
            .unwrap(),
        WriteOutcome::Rejected
    );
    assert_eq!(
        records
            .update_column_value(RecordKind::Manager, &id, &BTreeMap::new())
            .await
            .unwrap(),
        WriteOutcome::NothingToWrite
    );
    assert_eq!(
        records
            .set_column_value(RecordKind::Manager, &id, "privacy_policy_confirmed", "yes")
            .await
            .unwrap(),
        WriteOutcome::Rejected
    );
    assert!(!records
        .boolean_field_is_true(RecordKind::Manager, &id, "username")
        .await);
    assert_eq!(
        records
            .set_column_value(RecordKind::Manager, "999999999999999", "username", "ghost")
            .await
            .unwrap(),
        WriteOutcome::NoMatchingRecord
    );

    cleanup_manager(&pool, &id).await;
}

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn vacancies_are_not_reachable_through_the_accessor() {
    let pool = setup_pool().await;
    let records = RecordService::new(pool.clone());
    let vacancies = VacancyService::new(pool.clone());
    let manager_id = unique_id();
    let vacancy_id = unique_vacancy_id();

    records
        .create_record_if_absent(RecordKind::Manager, &manager_id)
        .await
        .unwrap();
    assert!(vacancies
        .create_if_absent(vacancy_id, &manager_id, Some("Backend developer"))
        .await
        .unwrap());
    let key = vacancy_id.to_string();

    assert!(records.record_exists(RecordKind::Vacancy, &key).await);
    assert!(!records
        .boolean_field_is_true(RecordKind::Vacancy, &key, "vacancy_description_received")
        .await);
    assert_eq!(
        records
            .get_column_value(RecordKind::Vacancy, &key, "name")
            .await,
        None
    );
    assert_eq!(
        records
            .set_column_value(RecordKind::Vacancy, &key, "name", "x")
            .await
            .unwrap(),
        WriteOutcome::Rejected
    );

    assert_eq!(
        vacancies
            .save_description(vacancy_id, json!({"title": "Backend developer"}))
            .await
            .unwrap(),
        WriteOutcome::Applied
    );
    let target = vacancies.target_for_manager(&manager_id).await.unwrap();
    assert_eq!(target.id, vacancy_id);
    assert!(target.vacancy_description_received);
    assert!(!target.ready_for_resume_analysis());

    assert_eq!(
        vacancies
            .save_sourcing_criteria(vacancy_id, json!({"skills": ["rust"]}))
            .await
            .unwrap(),
        WriteOutcome::Applied
    );
    let target = vacancies.target_for_manager(&manager_id).await.unwrap();
    assert!(target.sourcing_criteria_received);
    assert!(target.ready_for_resume_analysis());

    cleanup_manager(&pool, &manager_id).await;
}

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn value_exists_finds_stored_values() {
    let pool = setup_pool().await;
    let records = RecordService::new(pool.clone());
    let id = unique_id();
    let username = format!("user_{}", id);
    records
        .create_record_if_absent(RecordKind::Manager, &id)
        .await
        .unwrap();

    assert!(!records
        .value_exists(RecordKind::Manager, "username", &ColumnValue::from(username.as_str()))
        .await);
    records
        .set_column_value(RecordKind::Manager, &id, "username", username.as_str())
        .await
        .unwrap();
    assert!(records
        .value_exists(RecordKind::Manager, "username", &ColumnValue::from(username.as_str()))
        .await);
    assert!(!records
        .value_exists(RecordKind::Manager, "nickname", &ColumnValue::from(username.as_str()))
        .await);

    cleanup_manager(&pool, &id).await;
}

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn resumes_belong_to_their_vacancy_and_cascade() {
    let pool = setup_pool().await;
    let managers = ManagerService::new(pool.clone());
    let vacancies = VacancyService::new(pool.clone());
    let tmp = tempfile::tempdir().unwrap();
    let resumes = ResumeService::new(pool.clone(), UserDataDirs::new(tmp.path()));
    let manager_id = unique_id();
    let vacancy_id = unique_vacancy_id();
    let resume_id = format!("r{}", unique_id());

    let profile = ManagerProfile {
        username: Some("hr_anna".to_string()),
        first_name: Some("Anna".to_string()),
        last_name: None,
    };
    assert!(managers.register_contact(&manager_id, &profile).await.unwrap());
    assert!(!managers.register_contact(&manager_id, &profile).await.unwrap());
    vacancies
        .create_if_absent(vacancy_id, &manager_id, None)
        .await
        .unwrap();

    assert!(resumes.create_if_absent(&resume_id, vacancy_id).await.unwrap());
    assert!(!resumes.create_if_absent(&resume_id, vacancy_id).await.unwrap());
    assert!(resumes
        .create_if_absent("orphan", vacancy_id + 1_000_000_000)
        .await
        .is_err());

    let resume = resumes.get(&resume_id).await.unwrap().unwrap();
    assert_eq!(resume.manager_id, manager_id);
    assert_eq!(resume.resume_sorting_status, "new");

    let video = resumes.attach_video(&resume_id, "mp4").await.unwrap();
    assert_eq!(video, tmp.path().join("videos").join(format!("{}.mp4", resume_id)));
    let resume = resumes.get(&resume_id).await.unwrap().unwrap();
    assert!(resume.resume_video_received);

    assert_eq!(managers.list_ids().await.unwrap().iter().filter(|id| **id == manager_id).count(), 1);
    assert!(managers.delete(&manager_id).await.unwrap());
    assert!(resumes.get(&resume_id).await.unwrap().is_none());
    assert!(vacancies.get(vacancy_id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn employer_id_comes_from_stored_profile() {
    let pool = setup_pool().await;
    let managers = ManagerService::new(pool.clone());
    let id = unique_id();
    managers
        .register_contact(&id, &ManagerProfile::default())
        .await
        .unwrap();

    assert_eq!(managers.employer_id(&id).await, None);
    let outcome = managers
        .store_access_token(
            &id,
            "token",
            chrono::Utc::now() + chrono::Duration::days(14),
            Some(json!({"employer": {"id": 3529}})),
        )
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Applied);
    assert_eq!(managers.employer_id(&id).await, Some("3529".to_string()));

    cleanup_manager(&pool, &id).await;
}
