pub const ROADMAP_SKILLS_SYSTEM: &str = "You extract skill names from learning plans. \
    Respond with valid JSON only.";

pub const ROADMAP_SKILLS_PROMPT: &str = r#"A candidate just finished this learning roadmap for the role "{title}".

ROADMAP:
{roadmap}

List the concrete technical skills the candidate practised. Use short canonical names
("Kubernetes", not "learned the basics of Kubernetes"). At most 8 skills.

Return JSON:
{
  "skills": ["skill one", "skill two"]
}"#;
