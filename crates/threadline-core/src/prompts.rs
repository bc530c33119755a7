//! Versioned prompt templates.
//!
//! Templates carry `{transcript}` and `{concept}` placeholders that are
//! substituted by [`render`]. Config may override single templates of the
//! selected version.

const V1_CONCEPT_SYSTEM: &str = r#"You analyze group chat transcripts and name the topics that matter most to the people in them.

Output rules:
- Reply with a JSON array of strings and nothing else, for example ["Topic One", "Topic Two"].
- Reply with [] when the chat has no significant topic.
- Each topic is 2 to 6 words in Title Case.
- Name between 3 and 15 topics when the chat supports it.

Guidelines:
- Topics may be discussed in any language; name them in the language of the chat.
- Read through slang, abbreviations and informal phrasing.
- Group related messages into one coherent topic.
- Prefer announcements, plans, decisions, open questions and anything needing action.
- Skip spam, automated notices and personal data."#;

const V1_CONCEPT_USER: &str = r#"List the key topics of this group chat as a JSON array of strings.
Return [] if nothing significant was discussed.

Chat history:
'''
{transcript}
'''"#;

const V1_THREAD_SYSTEM: &str = r#"You turn group chat discussions into detailed, structured summaries for people who missed them.

Reply with one JSON object and nothing else, using this shape:
{
  "title": "Descriptive title of the topic",
  "language": "ISO language code of the discussion, e.g. en",
  "threads": [
    {
      "timestamp": "Approximate date or time range",
      "participants": ["Active participants"],
      "summary": "Detailed account of what was said, by whom, and what came of it",
      "attachments": ["Links or files shared"],
      "unresolved_questions": ["Questions left open"],
      "notes": "Other important details"
    }
  ],
  "related_topics": ["Connected topics"],
  "follow_ups": [
    {
      "task": "Action required",
      "assigned_to": "Person responsible",
      "due_date": "Deadline or time frame",
      "status": "Pending|In Progress|Completed"
    }
  ]
}

Guidelines:
- Only use messages relevant to the requested topic.
- Keep the intent of each message; note humor, frustration or support where it matters.
- Say who proposed what, how others reacted, and what was decided.
- Keep exact numbers, dates, names, tools and places; explain acronyms.
- Keep JSON keys and status values in English; write every other value in the language of the chat.
- If the topic was not really discussed, return the object with an empty "threads" array and explain in "notes"."#;

const V1_THREAD_USER: &str = r#"Summarize everything in this group chat that relates to "{concept}".
Capture decisions, action items, open questions and the tone of the discussion.

Chat history:
'''
{transcript}
'''"#;

const V1_DIGEST: &str = r#"Summarize the following text in 3-4 paragraphs, highlighting the main points and key ideas:

{transcript}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub version: String,
    pub concept_system: String,
    pub concept_user: String,
    pub thread_system: String,
    pub thread_user: String,
    pub digest: String,
}

impl PromptSet {
    /// Built-in prompt set for `version`, if one exists.
    pub fn builtin(version: &str) -> Option<Self> {
        match version {
            "v1" => Some(Self::v1()),
            _ => None,
        }
    }

    fn v1() -> Self {
        Self {
            version: "v1".to_string(),
            concept_system: V1_CONCEPT_SYSTEM.to_string(),
            concept_user: V1_CONCEPT_USER.to_string(),
            thread_system: V1_THREAD_SYSTEM.to_string(),
            thread_user: V1_THREAD_USER.to_string(),
            digest: V1_DIGEST.to_string(),
        }
    }

    pub fn concept_prompt(&self, transcript: &str) -> (String, String) {
        (
            self.concept_system.clone(),
            render(&self.concept_user, transcript, ""),
        )
    }

    pub fn thread_prompt(&self, transcript: &str, concept: &str) -> (String, String) {
        (
            render(&self.thread_system, "", concept),
            render(&self.thread_user, transcript, concept),
        )
    }

    pub fn digest_prompt(&self, transcript: &str) -> String {
        render(&self.digest, transcript, "")
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::v1()
    }
}

/// Substitute placeholders. Inserted values are taken verbatim, so braces
/// inside a transcript or concept are never expanded.
pub fn render(template: &str, transcript: &str, concept: &str) -> String {
    let mut parts = template.split("{transcript}");
    let mut out = String::with_capacity(template.len() + transcript.len());
    if let Some(first) = parts.next() {
        out.push_str(&first.replace("{concept}", concept));
    }
    for part in parts {
        out.push_str(transcript);
        out.push_str(&part.replace("{concept}", concept));
    }
    out
}
