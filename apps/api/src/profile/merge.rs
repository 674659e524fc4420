//! Incremental skill merging. Pure functions over `SkillMap`; persistence lives in `store`.

use chrono::{DateTime, Utc};

use crate::profile::models::{
    IncomingSkill, SkillMap, SkillRecord, SkillSource, VerificationStatus,
};

/// Merges detected skills into an existing map.
///
/// Existing entries get new `evidence` and `last_seen`, and `level` only when it
/// was unset. Source and verification status are left alone. Unknown skills are
/// inserted as `Pending` with the incoming source.
pub fn merge_skills(mut existing: SkillMap, incoming: &[IncomingSkill], now: DateTime<Utc>) -> SkillMap {
    for skill in incoming {
        let name = skill.name.trim();
        if name.is_empty() {
            continue;
        }
        match existing.get_mut(name) {
            Some(record) => {
                record.evidence = skill.evidence.clone();
                record.last_seen = now;
                if record.level.is_none() {
                    record.level = skill.level.clone();
                }
            }
            None => {
                existing.insert(
                    name.to_string(),
                    SkillRecord {
                        source: skill.source,
                        verification_status: VerificationStatus::Pending,
                        level: skill.level.clone(),
                        evidence: skill.evidence.clone(),
                        last_seen: now,
                    },
                );
            }
        }
    }
    existing
}

/// Applies a quiz result. Returns the map and the skill's resulting status.
pub fn verify(
    mut skills: SkillMap,
    name: &str,
    passed: bool,
    now: DateTime<Utc>,
) -> (SkillMap, VerificationStatus) {
    if passed {
        skills
            .entry(name.to_string())
            .and_modify(|record| {
                record.verification_status = VerificationStatus::Verified;
                record.last_seen = now;
            })
            .or_insert_with(|| SkillRecord {
                source: SkillSource::Quiz,
                verification_status: VerificationStatus::Verified,
                level: Some("intermediate".to_string()),
                evidence: "Passed verification quiz".to_string(),
                last_seen: now,
            });
        return (skills, VerificationStatus::Verified);
    }

    let status = match skills.get_mut(name) {
        Some(record) => {
            record.last_seen = now;
            record.verification_status
        }
        None => VerificationStatus::Pending,
    };
    (skills, status)
}

/// The flat skill list exposed to older clients.
pub fn legacy_skill_list(skills: &SkillMap) -> Vec<String> {
    skills.keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(status: VerificationStatus, level: Option<&str>) -> SkillRecord {
        SkillRecord {
            source: SkillSource::Resume,
            verification_status: status,
            level: level.map(String::from),
            evidence: "Listed in resume".to_string(),
            last_seen: Utc::now() - Duration::days(30),
        }
    }

    fn github(name: &str, level: Option<&str>, evidence: &str) -> IncomingSkill {
        IncomingSkill {
            name: name.to_string(),
            source: SkillSource::Github,
            level: level.map(String::from),
            evidence: evidence.to_string(),
        }
    }

    #[test]
    fn test_merge_keeps_verified_status() {
        let mut existing = SkillMap::new();
        existing.insert("Go".to_string(), record(VerificationStatus::Verified, None));
        let now = Utc::now();

        let merged = merge_skills(existing, &[github("Go", Some("advanced"), "goroutines in worker.go")], now);

        let go = &merged["Go"];
        assert_eq!(go.verification_status, VerificationStatus::Verified);
        assert_eq!(go.source, SkillSource::Resume);
        assert_eq!(go.evidence, "goroutines in worker.go");
        assert_eq!(go.last_seen, now);
        assert_eq!(go.level.as_deref(), Some("advanced"));
    }

    #[test]
    fn test_merge_does_not_overwrite_level() {
        let mut existing = SkillMap::new();
        existing.insert("Rust".to_string(), record(VerificationStatus::Pending, Some("beginner")));

        let merged = merge_skills(existing, &[github("Rust", Some("advanced"), "async traits")], Utc::now());

        assert_eq!(merged["Rust"].level.as_deref(), Some("beginner"));
    }

    #[test]
    fn test_merge_inserts_new_skill_as_pending() {
        let merged = merge_skills(SkillMap::new(), &[github("Docker", None, "Dockerfile")], Utc::now());

        let docker = &merged["Docker"];
        assert_eq!(docker.verification_status, VerificationStatus::Pending);
        assert_eq!(docker.source, SkillSource::Github);
    }

    #[test]
    fn test_merge_twice_is_stable() {
        let mut existing = SkillMap::new();
        existing.insert("Go".to_string(), record(VerificationStatus::Verified, None));
        let now = Utc::now();
        let incoming = [github("Go", None, "handlers"), github("SQL", None, "migrations")];

        let once = merge_skills(existing, &incoming, now);
        let twice = merge_skills(once.clone(), &incoming, now);

        assert_eq!(once, twice);
        assert_eq!(legacy_skill_list(&twice), vec!["Go", "SQL"]);
    }

    #[test]
    fn test_verify_pass_adds_quiz_skill() {
        let (skills, status) = verify(SkillMap::new(), "Kubernetes", true, Utc::now());

        assert_eq!(status, VerificationStatus::Verified);
        let k8s = &skills["Kubernetes"];
        assert_eq!(k8s.source, SkillSource::Quiz);
        assert_eq!(k8s.level.as_deref(), Some("intermediate"));
        assert_eq!(legacy_skill_list(&skills), vec!["Kubernetes"]);
    }

    #[test]
    fn test_verify_fail_never_downgrades() {
        let mut existing = SkillMap::new();
        existing.insert("Go".to_string(), record(VerificationStatus::Verified, None));
        let now = Utc::now();

        let (skills, status) = verify(existing, "Go", false, now);

        assert_eq!(status, VerificationStatus::Verified);
        assert_eq!(skills["Go"].last_seen, now);
    }

    #[test]
    fn test_verify_fail_on_unknown_skill_adds_nothing() {
        let (skills, status) = verify(SkillMap::new(), "Elixir", false, Utc::now());
        assert!(skills.is_empty());
        assert_eq!(status, VerificationStatus::Pending);
    }
}
