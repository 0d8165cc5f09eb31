use anyhow::ensure;

/// One line of recent conversation, oldest first.
#[derive(Debug, Clone)]
pub struct TranscriptLine {
    pub role: String,
    pub content: String,
}

/// The assembled prompt payload with named, required sections.
///
/// Required sections are validated at construction so a missing slice fails
/// fast instead of rendering as a blank block in the prompt.
#[derive(Debug, Clone)]
pub struct PromptContext {
    profile_summary: String,
    targets_summary: String,
    meals_today: String,
    short_term: Vec<TranscriptLine>,
    long_term: Vec<String>,
    user_message: String,
}

impl PromptContext {
    pub fn new(
        profile_summary: String,
        targets_summary: String,
        meals_today: String,
        short_term: Vec<TranscriptLine>,
        long_term: Vec<String>,
        user_message: String,
    ) -> anyhow::Result<Self> {
        ensure!(!profile_summary.trim().is_empty(), "profile summary is empty");
        ensure!(!targets_summary.trim().is_empty(), "targets summary is empty");
        ensure!(!meals_today.trim().is_empty(), "meals-today section is empty");
        ensure!(!user_message.trim().is_empty(), "user message is empty");
        Ok(Self {
            profile_summary,
            targets_summary,
            meals_today,
            short_term,
            long_term,
            user_message,
        })
    }

    /// Render the full prompt for the completion backend.
    pub fn render(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(
            "You are a friendly nutrition coach. Give practical, specific advice \
             grounded in the client's data below. Keep the answer short.\n\n",
        );

        prompt.push_str("## Client profile\n");
        prompt.push_str(&self.profile_summary);
        prompt.push_str("\n\n## Daily targets\n");
        prompt.push_str(&self.targets_summary);
        prompt.push_str("\n\n## Meals logged today\n");
        prompt.push_str(&self.meals_today);

        if !self.long_term.is_empty() {
            prompt.push_str("\n\n## Relevant past exchanges\n");
            for snippet in &self.long_term {
                prompt.push_str("- ");
                prompt.push_str(snippet);
                prompt.push('\n');
            }
        }

        if !self.short_term.is_empty() {
            prompt.push_str("\n\n## Recent conversation\n");
            for line in &self.short_term {
                let speaker = if line.role == "assistant" { "Coach" } else { "User" };
                prompt.push_str(speaker);
                prompt.push_str(": ");
                prompt.push_str(&line.content);
                prompt.push('\n');
            }
        }

        prompt.push_str("\n\n## New message\n");
        prompt.push_str(&self.user_message);
        prompt.push_str("\n\nReply to the new message now.");
        prompt
    }
}
