use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, response::Response, Router};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use fake::faker::address::en::StreetName;
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::core::config::{ClassifierConfig, LedgerConfig};
use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::classification::{ClassifierCallError, VisionClient, WasteLabel};
use crate::features::points::models::{LeaderboardEntry, LedgerOutcome, PendingAward};
use crate::features::points::{LedgerError, PointsLedger};
use crate::features::reports::models::{
    ImageUpload, NewReport, Report, ReportStatus, SubmissionRequest,
};
use crate::features::reports::services::ReportStore;
use crate::modules::storage::{generate_object_key, sha256_hex, ImageStore, StoredImage};

async fn inject_user_middleware(
    user: AuthenticatedUser,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Wrap a router so every request is authenticated as `sub`
pub fn with_user_auth(router: Router, sub: &str, roles: &[&str]) -> Router {
    let user = AuthenticatedUser {
        sub: sub.to_string(),
        username: format!("{}-name", sub),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    };
    router.layer(axum::middleware::from_fn(move |request, next| {
        inject_user_middleware(user.clone(), request, next)
    }))
}

/// Small opaque PNG that decodes cleanly
pub fn test_png() -> Vec<u8> {
    let pixels = RgbaImage::from_pixel(8, 8, Rgba([30, 144, 255, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(pixels)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode test png");
    out.into_inner()
}

pub fn submission_request(user_id: &str) -> SubmissionRequest {
    SubmissionRequest {
        user_id: user_id.to_string(),
        username: format!("{}-name", user_id),
        title: Sentence(3..6).fake(),
        description: Paragraph(1..3).fake(),
        location: StreetName().fake(),
        category: "riverbank".to_string(),
        image: ImageUpload {
            bytes: test_png(),
            content_type: "image/png".to_string(),
            file_name: "photo.png".to_string(),
        },
    }
}

fn label_worth(points: i32) -> WasteLabel {
    match points {
        10 => WasteLabel::Plastic,
        5 => WasteLabel::Biodegradable,
        _ => WasteLabel::Other,
    }
}

/// Ready-to-insert report worth `points` for `user_id`
pub fn new_report(user_id: &str, points: i32) -> NewReport {
    let id = Uuid::now_v7();
    let label = label_worth(points);

    NewReport {
        id,
        user_id: user_id.to_string(),
        username: format!("{}-name", user_id),
        title: Sentence(3..6).fake(),
        description: Paragraph(1..2).fake(),
        location: StreetName().fake(),
        category: "general".to_string(),
        image_key: format!("reports/{}/{}.png", user_id, id),
        image_url: format!("http://images.test/reports/{}/{}.png", user_id, id),
        image_sha256: sha256_hex(id.as_bytes()),
        waste_label: label,
        annotation: label.annotation().map(str::to_string),
        classifier_raw: label.as_str().to_string(),
        points_awarded: points,
        status: ReportStatus::Pending,
    }
}

pub fn fast_classifier_config() -> ClassifierConfig {
    ClassifierConfig {
        api_url: "http://classifier.test/v1/chat/completions".to_string(),
        api_key: "test-key".to_string(),
        model_name: "test-vision".to_string(),
        request_timeout: Duration::from_secs(1),
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(1),
        max_total_wait: Duration::from_secs(5),
    }
}

pub fn fast_ledger_config() -> LedgerConfig {
    LedgerConfig {
        inline_attempts: 2,
        inline_backoff: Duration::from_millis(1),
        reconcile_interval: Duration::from_millis(10),
        reconcile_batch_size: 100,
        reconcile_concurrency: 4,
    }
}

/// Vision client replaying canned replies.
///
/// Scripted replies are used first, then `replies` in rotation.
pub struct ScriptedVision {
    script: Mutex<VecDeque<std::result::Result<String, ClassifierCallError>>>,
    replies: Vec<std::result::Result<String, ClassifierCallError>>,
    delay: Option<Duration>,
    calls: AtomicU32,
    rotation: AtomicU32,
}

impl ScriptedVision {
    pub fn always(reply: std::result::Result<String, ClassifierCallError>) -> Self {
        Self::scripted(Vec::new(), reply)
    }

    pub fn scripted(
        script: Vec<std::result::Result<String, ClassifierCallError>>,
        fallback: std::result::Result<String, ClassifierCallError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            replies: vec![fallback],
            delay: None,
            calls: AtomicU32::new(0),
            rotation: AtomicU32::new(0),
        }
    }

    pub fn cycling(replies: Vec<std::result::Result<String, ClassifierCallError>>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            replies,
            delay: None,
            calls: AtomicU32::new(0),
            rotation: AtomicU32::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionClient for ScriptedVision {
    async fn describe(
        &self,
        _image_base64: &str,
        _mime_type: &str,
        _instruction: &str,
    ) -> std::result::Result<String, ClassifierCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self.script.lock().unwrap().pop_front();
        let reply = match scripted {
            Some(reply) => reply,
            None if self.replies.is_empty() => Err(ClassifierCallError::EmptyResponse),
            None => {
                let n = self.rotation.fetch_add(1, Ordering::SeqCst) as usize;
                self.replies[n % self.replies.len()].clone()
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

/// Image store keeping only the keys it handed out
#[derive(Default)]
pub struct FakeImageStore {
    failing: bool,
    stored: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn stored_keys(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn store(
        &self,
        owner: &str,
        suggested_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> std::result::Result<StoredImage, AppError> {
        if self.failing {
            return Err(AppError::Storage("bucket unreachable".to_string()));
        }

        let key = generate_object_key("reports", owner, suggested_name, content_type);
        self.stored.lock().unwrap().push(key.clone());

        Ok(StoredImage {
            url: format!("http://images.test/{}", key),
            sha256: sha256_hex(bytes),
            key,
        })
    }

    async fn delete(&self, key: &str) -> std::result::Result<(), AppError> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct StoreState {
    reports: Vec<Report>,
    /// user id -> (username, points total)
    users: HashMap<String, (String, i64)>,
    failing_ledger_writes: usize,
    failing_report_writes: bool,
    failing_after_report_commit: bool,
    failing_report_reads: bool,
    last_timestamp: Option<DateTime<Utc>>,
}

impl StoreState {
    /// Strictly increasing so newest-first ordering is deterministic
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + ChronoDuration::milliseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn take_ledger_failure(&mut self) -> std::result::Result<(), LedgerError> {
        if self.failing_ledger_writes > 0 {
            self.failing_ledger_writes -= 1;
            return Err(LedgerError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    fn page(mut reports: Vec<Report>, limit: i64, offset: i64) -> (Vec<Report>, i64) {
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = reports.len() as i64;
        let page = reports
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        (page, total)
    }
}

/// Report store and points ledger sharing one in-memory state
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report whose award has not reached the user's total yet
    pub fn seed_unapplied_report(&self, user_id: &str, points: i32) -> Uuid {
        self.seed(user_id, points, false)
    }

    /// Report whose award is already part of the user's total
    pub fn seed_applied_report(&self, user_id: &str, points: i32) -> Uuid {
        self.seed(user_id, points, true)
    }

    fn seed(&self, user_id: &str, points: i32, applied: bool) -> Uuid {
        let label = label_worth(points);

        let mut state = self.state.lock().unwrap();
        let created_at = state.next_timestamp();
        let id = Uuid::now_v7();

        let user = state
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| (format!("{}-name", user_id), 0));
        if applied {
            user.1 += points as i64;
        }
        let username = user.0.clone();

        state.reports.push(Report {
            id,
            user_id: user_id.to_string(),
            username,
            title: Sentence(3..6).fake(),
            description: Paragraph(1..2).fake(),
            location: StreetName().fake(),
            category: "general".to_string(),
            image_key: format!("reports/{}/{}.png", user_id, id),
            image_url: format!("http://images.test/reports/{}/{}.png", user_id, id),
            image_sha256: sha256_hex(id.as_bytes()),
            waste_label: label,
            annotation: label.annotation().map(str::to_string),
            classifier_raw: label.as_str().to_string(),
            points_awarded: points,
            points_applied: applied,
            status: ReportStatus::Pending,
            votes: 0,
            created_at,
            updated_at: created_at,
        });
        id
    }

    /// Make the next `n` ledger writes fail
    pub fn fail_ledger_writes(&self, n: usize) {
        self.state.lock().unwrap().failing_ledger_writes = n;
    }

    pub fn fail_report_writes(&self, failing: bool) {
        self.state.lock().unwrap().failing_report_writes = failing;
    }

    /// `create` stores the report but still reports an error
    pub fn fail_after_report_commit(&self, failing: bool) {
        self.state.lock().unwrap().failing_after_report_commit = failing;
    }

    pub fn fail_report_reads(&self, failing: bool) {
        self.state.lock().unwrap().failing_report_reads = failing;
    }

    pub fn total_of(&self, user_id: &str) -> i64 {
        self.state
            .lock()
            .unwrap()
            .users
            .get(user_id)
            .map(|(_, total)| *total)
            .unwrap_or(0)
    }

    pub fn reports(&self) -> Vec<Report> {
        self.state.lock().unwrap().reports.clone()
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn create(&self, report: &NewReport) -> Result<Report> {
        let mut state = self.state.lock().unwrap();
        if state.failing_report_writes {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }

        let now = state.next_timestamp();
        let user = state
            .users
            .entry(report.user_id.clone())
            .or_insert_with(|| (report.username.clone(), 0));
        user.0 = report.username.clone();

        let created = Report {
            id: report.id,
            user_id: report.user_id.clone(),
            username: report.username.clone(),
            title: report.title.clone(),
            description: report.description.clone(),
            location: report.location.clone(),
            category: report.category.clone(),
            image_key: report.image_key.clone(),
            image_url: report.image_url.clone(),
            image_sha256: report.image_sha256.clone(),
            waste_label: report.waste_label,
            annotation: report.annotation.clone(),
            classifier_raw: report.classifier_raw.clone(),
            points_awarded: report.points_awarded,
            points_applied: false,
            status: report.status,
            votes: 0,
            created_at: now,
            updated_at: now,
        };
        state.reports.push(created.clone());
        if state.failing_after_report_commit {
            return Err(AppError::Database(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset after commit",
            ))));
        }
        Ok(created)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Report> {
        let state = self.state.lock().unwrap();
        if state.failing_report_reads {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        state
            .reports
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Report>, i64)> {
        let state = self.state.lock().unwrap();
        let mine = state
            .reports
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(StoreState::page(mine, limit, offset))
    }

    async fn list(
        &self,
        status: Option<ReportStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Report>, i64)> {
        let state = self.state.lock().unwrap();
        let matching = state
            .reports
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        Ok(StoreState::page(matching, limit, offset))
    }

    async fn set_status(
        &self,
        id: Uuid,
        expected: ReportStatus,
        next: ReportStatus,
    ) -> Result<Option<Report>> {
        let mut state = self.state.lock().unwrap();
        let now = state.next_timestamp();
        let report = state
            .reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

        if report.status != expected {
            return Ok(None);
        }
        report.status = next;
        report.updated_at = now;
        Ok(Some(report.clone()))
    }

    async fn upvote(&self, id: Uuid) -> Result<Report> {
        let mut state = self.state.lock().unwrap();
        let report = state
            .reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;
        report.votes += 1;
        Ok(report.clone())
    }
}

#[async_trait]
impl PointsLedger for InMemoryStore {
    async fn apply_award(
        &self,
        award: &PendingAward,
    ) -> std::result::Result<LedgerOutcome, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.take_ledger_failure()?;

        let report = state
            .reports
            .iter_mut()
            .find(|r| r.id == award.report_id && r.user_id == award.user_id)
            .ok_or(LedgerError::ReportMissing(award.report_id))?;

        let newly_applied = !report.points_applied;
        report.points_applied = true;
        let points = report.points_awarded as i64;

        let (_, total) = state
            .users
            .get_mut(&award.user_id)
            .ok_or_else(|| LedgerError::UserMissing(award.user_id.clone()))?;

        if !newly_applied {
            return Ok(LedgerOutcome::AlreadyApplied { total: *total });
        }
        *total += points;
        Ok(LedgerOutcome::Applied { new_total: *total })
    }

    async fn reconcile(&self, user_id: &str) -> std::result::Result<i64, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.take_ledger_failure()?;

        if !state.users.contains_key(user_id) {
            return Err(LedgerError::UserMissing(user_id.to_string()));
        }

        let mut sum = 0i64;
        for report in state.reports.iter_mut().filter(|r| r.user_id == user_id) {
            report.points_applied = true;
            sum += report.points_awarded as i64;
        }

        if let Some((_, total)) = state.users.get_mut(user_id) {
            *total = sum;
        }
        Ok(sum)
    }

    async fn pending_awards(&self, limit: i64) -> std::result::Result<Vec<PendingAward>, LedgerError> {
        let state = self.state.lock().unwrap();
        let mut pending: Vec<&Report> = state.reports.iter().filter(|r| !r.points_applied).collect();
        pending.sort_by_key(|r| r.created_at);

        Ok(pending
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|r| PendingAward {
                report_id: r.id,
                user_id: r.user_id.clone(),
                points_awarded: r.points_awarded,
            })
            .collect())
    }

    async fn points_total(&self, user_id: &str) -> std::result::Result<i64, LedgerError> {
        Ok(self.total_of(user_id))
    }

    async fn leaderboard(
        &self,
        limit: i64,
    ) -> std::result::Result<Vec<LeaderboardEntry>, LedgerError> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<LeaderboardEntry> = state
            .users
            .iter()
            .map(|(user_id, (username, total))| LeaderboardEntry {
                user_id: user_id.clone(),
                username: username.clone(),
                points_total: *total,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.points_total
                .cmp(&a.points_total)
                .then_with(|| a.username.cmp(&b.username))
        });
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }
}
