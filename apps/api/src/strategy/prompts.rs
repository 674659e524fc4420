/// Gap analysis prompt. Inputs are truncated by the caller.
pub const ROADMAP_SYSTEM: &str = "You are an elite technical career strategist. \
    You MUST respond with valid JSON only. Do NOT include any text outside the JSON object.";

pub const ROADMAP_PROMPT: &str = r#"Perform a gap analysis between a candidate and a job, then write a 3-day micro-roadmap.

CANDIDATE:
{profile}

JOB:
{job}

TASK:
1. Identify the top 3 skills the job needs that the candidate is missing. Be specific
   ("FastAPI dependency injection", not "Python").
2. For each of 3 days give a topic, concrete tasks, and exactly two resources:
   one official documentation link and one YouTube search link
   (https://www.youtube.com/results?search_query=...).

Return JSON in exactly this shape:
{
  "missing_skills": ["Skill 1", "Skill 2", "Skill 3"],
  "roadmap": [
    {
      "day": 1,
      "topic": "...",
      "tasks": ["...", "..."],
      "resources": [
        { "name": "Docs", "url": "https://..." },
        { "name": "Video", "url": "https://www.youtube.com/results?search_query=..." }
      ]
    }
  ]
}"#;

pub const APPLICATION_SYSTEM: &str = "You are an expert career coach writing job application answers. \
    You MUST respond with valid JSON only.";

/// `{name}`, `{skills}`, `{experience}`, `{title}`, `{organization}`, `{job}` are filled by the caller.
pub const APPLICATION_PROMPT: &str = r#"Write copy-paste ready answers to common application questions.

CANDIDATE:
- Name: {name}
- Skills: {skills}
- Experience: {experience}

TARGET JOB: {title} at {organization}
JOB DESCRIPTION:
{job}

Be specific to this job and company. Professional but personable.

Return JSON in exactly this shape:
{
  "why_this_company": "2-3 sentences on genuine interest in the company",
  "why_this_role": "2-3 sentences on why this role fits",
  "short_intro": "2-3 sentence elevator pitch",
  "cover_letter_opening": "first paragraph",
  "cover_letter_body": "main paragraph on relevant experience",
  "cover_letter_closing": "closing paragraph with a call to action",
  "key_achievements": ["achievement relevant to this role", "..."],
  "questions_for_interviewer": ["question about the role", "question about the team"]
}"#;
