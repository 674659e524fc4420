//! Notification phase: one digest email per unique address.

use std::collections::HashSet;
use std::sync::Arc;

use askama::Template;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::daily::curator::{curate_or_fallback, Curator, DigestSelection};
use crate::daily::job::DailyJob;
use crate::daily::mailer::Mailer;
use crate::profile::models::Profile;
use crate::profile::ProfileStore;
use crate::strategy::roadmap::truncate;
use crate::strategy::TieredCandidate;

const SUMMARY_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Success,
    PartialSuccess,
    /// Mail is not configured on this deployment.
    Disabled,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationReport {
    pub status: NotificationStatus,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub emails_skipped: usize,
    pub error: Option<String>,
}

impl NotificationReport {
    fn empty(status: NotificationStatus, error: Option<String>) -> Self {
        Self {
            status,
            emails_sent: 0,
            emails_failed: 0,
            emails_skipped: 0,
            error,
        }
    }

    pub fn is_total_failure(&self) -> bool {
        self.status == NotificationStatus::Failed
    }
}

/// Keeps the first profile per address, compared case-insensitively.
/// Profiles without an address are returned separately.
pub fn dedupe_by_email(profiles: Vec<Profile>) -> (Vec<(String, Profile)>, usize) {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut skipped = 0;
    for profile in profiles {
        let Some(email) = profile
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
        else {
            skipped += 1;
            continue;
        };
        if seen.insert(email.to_lowercase()) {
            unique.push((email, profile));
        } else {
            skipped += 1;
        }
    }
    (unique, skipped)
}

struct DigestItem {
    title: String,
    organization: String,
    summary: String,
    link: String,
    /// Only jobs show a match badge.
    match_percent: Option<u32>,
    status: String,
}

impl DigestItem {
    fn from_candidate(item: &TieredCandidate, show_score: bool) -> Self {
        let c = &item.candidate;
        DigestItem {
            title: c.title.clone(),
            organization: c.organization.clone(),
            summary: truncate(&c.description, SUMMARY_CHARS).to_string(),
            link: c.link.clone(),
            match_percent: show_score.then(|| (c.similarity * 100.0).round() as u32),
            status: item.status.clone(),
        }
    }

    fn list(items: &[TieredCandidate], show_score: bool) -> Vec<Self> {
        items
            .iter()
            .map(|item| Self::from_candidate(item, show_score))
            .collect()
    }
}

#[derive(Template)]
#[template(path = "digest.html")]
struct DigestTemplate<'a> {
    name: &'a str,
    jobs: Vec<DigestItem>,
    hackathons: Vec<DigestItem>,
    news: Vec<DigestItem>,
}

pub fn render_digest(name: &str, selection: &DigestSelection) -> Result<String, askama::Error> {
    DigestTemplate {
        name,
        jobs: DigestItem::list(&selection.jobs, true),
        hackathons: DigestItem::list(&selection.hackathons, false),
        news: DigestItem::list(&selection.news, false),
    }
    .render()
}

pub fn digest_subject() -> String {
    format!("Your Daily Career Digest - {}", Utc::now().format("%B %d, %Y"))
}

#[derive(Clone)]
pub struct Notifier {
    profiles: ProfileStore,
    daily: DailyJob,
    curator: Option<Arc<dyn Curator>>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl Notifier {
    pub fn new(
        profiles: ProfileStore,
        daily: DailyJob,
        curator: Option<Arc<dyn Curator>>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        Self {
            profiles,
            daily,
            curator,
            mailer,
        }
    }

    pub async fn run(&self) -> NotificationReport {
        let Some(mailer) = self.mailer.as_ref() else {
            warn!("mail is not configured, skipping notifications");
            return NotificationReport::empty(
                NotificationStatus::Disabled,
                Some("mail is not configured".to_string()),
            );
        };

        let profiles = match self.profiles.list().await {
            Ok(profiles) => profiles,
            Err(e) => {
                error!("notifications could not enumerate profiles: {e}");
                return NotificationReport::empty(NotificationStatus::Failed, Some(e.to_string()));
            }
        };

        let (recipients, mut emails_skipped) = dedupe_by_email(profiles);
        let mut emails_sent = 0;
        let mut emails_failed = 0;
        let subject = digest_subject();

        for (email, profile) in recipients {
            let user_id = profile.user_id;
            let snapshot = match self.daily.snapshot(user_id).await {
                Ok(Some(snapshot)) if !snapshot.is_empty() => snapshot,
                Ok(_) => {
                    emails_skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(%user_id, "snapshot lookup failed: {e}");
                    emails_failed += 1;
                    continue;
                }
            };

            let selection = curate_or_fallback(self.curator.as_deref(), &profile, &snapshot).await;
            if selection.is_empty() {
                emails_skipped += 1;
                continue;
            }

            let html = match render_digest(profile.display_name(), &selection) {
                Ok(html) => html,
                Err(e) => {
                    error!(%user_id, "digest rendering failed: {e}");
                    emails_failed += 1;
                    continue;
                }
            };
            match mailer.send(&email, &subject, &html).await {
                Ok(()) => emails_sent += 1,
                Err(e) => {
                    warn!(%user_id, "digest delivery failed: {e}");
                    emails_failed += 1;
                }
            }
        }

        let status = if emails_failed == 0 {
            NotificationStatus::Success
        } else if emails_sent == 0 {
            NotificationStatus::Failed
        } else {
            NotificationStatus::PartialSuccess
        };
        info!(sent = emails_sent, failed = emails_failed, skipped = emails_skipped, "notifications finished");

        NotificationReport {
            status,
            emails_sent,
            emails_failed,
            emails_skipped,
            error: None,
        }
    }
}
