//! Prompt construction for the two generation modes

use chrono::NaiveDate;
use pressroom_common::types::AiProvider;
use serde::{Deserialize, Serialize};

/// Which writer produces the content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Long-form article writer
    #[default]
    Article,
    /// Researched news report
    News,
}

/// A single content generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationRequest {
    /// Article topic or news query
    pub topic: String,
    /// Detected from `model` when omitted
    pub provider: Option<AiProvider>,
    /// Falls back to the configured default model
    pub model: Option<String>,
    pub mode: GenerationMode,
    pub content_type: String,
    pub tone: String,
    pub length: String,
    pub language: String,
    pub seo_optimized: bool,
    pub humanize: bool,
    pub include_faq: bool,
    pub include_table: bool,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            topic: String::new(),
            provider: None,
            model: None,
            mode: GenerationMode::Article,
            content_type: "article".to_string(),
            tone: "professional".to_string(),
            length: "long".to_string(),
            language: "english".to_string(),
            seo_optimized: true,
            humanize: true,
            include_faq: true,
            include_table: true,
        }
    }
}

/// System and user prompt pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Build the prompts for `request`. `today` feeds the news date context.
    pub fn build(request: &GenerationRequest, today: NaiveDate) -> Self {
        match request.mode {
            GenerationMode::Article => Self::article(request),
            GenerationMode::News => Self::news(request, today),
        }
    }

    fn article(request: &GenerationRequest) -> Self {
        let system = format!(
            "You are a professional Content Director and SEO Specialist.\n\
             Generate high-quality, engaging content formatted in strict HTML.\n\
             \n\
             Formatting Rules:\n\
             - Use <h1> for the main title.\n\
             - Use <h2> for major sections (ensure clear hierarchy).\n\
             - Use <h3> for subsections.\n\
             - Use <h4> for detailed breakdowns.\n\
             - Use <blockquote> for key takeaways or important quotes.\n\
             - Use <table> for data comparisons (just use standard <table>, <thead>, <tbody>, <th>, <tr>, <td>).\n\
             - Use <ul>/<li> for lists.\n\
             - Do NOT use Markdown (no **bold** or ## headers). Use <strong> and <h1>..<h6> tags.\n\
             - Do NOT wrap in ```html code blocks. Return raw HTML string only.\n\
             - CRITICAL: Remove all citation numbers like [1], [2], [3]. Never output brackets with numbers.\n\
             - CRITICAL: Write the entire response in {}.",
            request.language
        );

        let mut user = format!(
            "Write a {} {} {} about \"{}\".\n\
             \n\
             Key Requirements:\n\
             1. Engagement: Start with a compelling hook.\n\
             2. Structure: Use short paragraphs and clear headings.\n\
             3. Value: Include practical tips or distinct considerations.\n",
            request.length, request.tone, request.content_type, request.topic
        );

        if matches!(request.content_type.as_str(), "review" | "guide") {
            user.push_str(
                "4. Data: Include a Comparison Table of key features/pros-cons if applicable.\n\
                 5. Verdict: End with a clear recommendation.\n",
            );
        }
        if request.include_faq {
            user.push_str(
                "6. FAQ: Add a specialized FAQ section with 3-5 common questions at the end.\n",
            );
        }
        if request.seo_optimized {
            user.push_str(&format!(
                "7. SEO: Optimize for keywords related to \"{}\". Use <strong> for emphasis on keywords.\n",
                request.topic
            ));
        }
        if request.humanize {
            user.push_str(
                "8. Tone: Ensure the writing sounds natural, avoiding repetitive AI patterns.\n",
            );
        }

        Self { system, user }
    }

    fn news(request: &GenerationRequest, today: NaiveDate) -> Self {
        let system = format!(
            "You are a Senior Chief Editor and SEO Specialist.\n\
             Your task is to conduct deep research and write a highly professional, comprehensive news report.\n\
             Format the output strictly as HTML suitable for a rich text editor.\n\
             Use <h1> for the Main Title.\n\
             Use <h2> for Section Headers.\n\
             Use <h3> for Sub-sections.\n\
             Use <h4> for Breaks.\n\
             Use <p> for paragraphs.\n\
             Use <ul>/<li> for lists.\n\
             Do NOT use Markdown backticks. Return RAW HTML.\n\
             CRITICAL: Remove all citation numbers like [1], [2], [3]. Never output brackets with numbers.\n\
             CRITICAL: Write the entire report in {}. Translate any findings if necessary.",
            request.language
        );

        let mut user = format!(
            "Research and write a comprehensive news report on: \"{}\".\n\
             \n\
             Structure Constraints:\n\
             1. Title: Engaging, SEO-optimized Headline (H1).\n\
             2. Executive Summary: A concise professional summary of the latest events (H2 + p).\n\
             3. Key Developments: Detailed analysis of the situation (H2 + H3s).\n\
             4. SEO Optimization: Use bolding (<strong>) for key entities/names.\n",
            request.topic
        );

        if request.include_table {
            user.push_str(
                "5. Data/Sources: Create a standard HTML Table (<table><thead>...</thead><tbody>...</tbody></table>) \
                 summarizing Key Facts or Sources found. Do not add inline styles, simply use standard tags.\n",
            );
        }

        user.push_str(&format!(
            "\nDate Context: {}.\n\
             Tone: Objective, Authoritative, Journalistic.\n\
             Length: Comprehensive (at least 800-1200 words).\n",
            today.format("%a %b %d %Y")
        ));

        Self { system, user }
    }
}

/// Prompt for a featured illustration
pub fn image_prompt(topic: &str) -> String {
    format!(
        "Professional informative blog illustration about: {}. Modern, minimalist, flat vector style.",
        topic
    )
}
