pub const CURATION_SYSTEM: &str = "You are an AI career advisor. \
    You MUST respond with valid JSON only. Do NOT include any explanation.";

/// `{name}`, `{skills}`, `{roles}`, `{jobs}`, `{hackathons}`, `{news}` are filled by the caller.
pub const CURATION_PROMPT: &str = r#"You are helping {name} with their job search.

USER PROFILE:
- Skills: {skills}
- Target Roles: {roles}

Pick the BEST 2 items from each category that are most relevant to this user.
Consider skill match, career trajectory, and growth potential.

JOBS:
{jobs}

HACKATHONS:
{hackathons}

NEWS:
{news}

Return ONLY a JSON object with the 1-based indices of your picks:
{"jobs": [1, 3], "hackathons": [2, 1], "news": [1, 2]}"#;

pub const HOT_SKILLS_SYSTEM: &str = "You are a career skills advisor. \
    You MUST respond with a valid JSON array only.";

/// `{skills}`, `{roles}`, `{titles}` are filled by the caller.
pub const HOT_SKILLS_PROMPT: &str = r#"Suggest 3 in-demand skills this user should learn next.

USER PROFILE:
- Current Skills: {skills}
- Target Roles: {roles}

MATCHED JOB TITLES:
{titles}

Only suggest skills the user does NOT already have. Keep each reason under 50 characters.
"demand_trend" is "rising" or "stable".

Return ONLY a JSON array with exactly 3 entries:
[{"skill": "SkillName", "demand_trend": "rising", "reason": "Brief reason"}]"#;
