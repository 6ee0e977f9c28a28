//! Demo catalog: six categories and eighteen tools with starting usage counts.

use super::catalog::{count_categories, insert_category, insert_tool};
use super::Store;
use crate::error::Result;
use crate::model::NewTool;
use chrono::Utc;

struct SeedTool {
    category: usize,
    name: &'static str,
    description: &'static str,
    sub_category: &'static str,
    is_premium: bool,
    usage: i64,
}

const CATEGORIES: [&str; 6] = [
    "Blog Writing",
    "X (Twitter)",
    "Instagram",
    "Email",
    "Marketing",
    "Business Documents",
];

const TOOLS: &[SeedTool] = &[
    SeedTool { category: 0, name: "Blog Title Generator", description: "Generates catchy, SEO-friendly blog post titles. Enter a keyword and get several candidates.", sub_category: "SEO", is_premium: false, usage: 1250 },
    SeedTool { category: 0, name: "Blog Post Writer", description: "Writes a structured, high-quality blog post from a theme and keywords, with headings and paragraphs.", sub_category: "Content", is_premium: true, usage: 980 },
    SeedTool { category: 0, name: "Meta Description Generator", description: "Writes search-result meta descriptions optimised for click-through.", sub_category: "SEO", is_premium: false, usage: 756 },
    SeedTool { category: 1, name: "Tweet Writer", description: "Writes memorable posts within the character limit, with phrasing that drives engagement.", sub_category: "Social Posts", is_premium: false, usage: 2340 },
    SeedTool { category: 1, name: "Thread Writer", description: "Writes a multi-post thread that tells a story across posts.", sub_category: "Social Posts", is_premium: true, usage: 1120 },
    SeedTool { category: 1, name: "Hashtag Suggestions", description: "Suggests hashtags that fit the post and widen its reach.", sub_category: "Social Posts", is_premium: false, usage: 1890 },
    SeedTool { category: 2, name: "Instagram Caption", description: "Writes engaging captions for Instagram posts, with well-placed emoji.", sub_category: "Social Posts", is_premium: false, usage: 1560 },
    SeedTool { category: 2, name: "Stories Text", description: "Writes short, punchy text for Instagram Stories with visual impact in mind.", sub_category: "Social Posts", is_premium: false, usage: 890 },
    SeedTool { category: 2, name: "Reels Script", description: "Writes a script for 15 to 60 second Instagram Reels.", sub_category: "Content", is_premium: true, usage: 670 },
    SeedTool { category: 3, name: "Business Email", description: "Writes a formal business email with a consistent subject, body and signature.", sub_category: "Business", is_premium: false, usage: 2100 },
    SeedTool { category: 3, name: "Thank-you Email", description: "Writes a thank-you email with wording suited to the situation.", sub_category: "Business", is_premium: false, usage: 1450 },
    SeedTool { category: 3, name: "Follow-up Email", description: "Writes a follow-up after a meeting or sales call that prompts the next action.", sub_category: "Business", is_premium: false, usage: 980 },
    SeedTool { category: 4, name: "Ad Copy", description: "Writes ad copy that conveys what makes a product or service appealing to its audience.", sub_category: "Advertising", is_premium: true, usage: 1780 },
    SeedTool { category: 4, name: "Landing Page Headline", description: "Writes landing page headlines that lift conversion.", sub_category: "Web", is_premium: true, usage: 1340 },
    SeedTool { category: 4, name: "Press Release", description: "Writes a press release structured for the media.", sub_category: "PR", is_premium: true, usage: 560 },
    SeedTool { category: 5, name: "Proposal Summary", description: "Condenses a proposal into a short summary for executives.", sub_category: "Planning", is_premium: false, usage: 890 },
    SeedTool { category: 5, name: "Meeting Minutes", description: "Turns meeting notes into minutes with decisions and action items.", sub_category: "Meetings", is_premium: false, usage: 1230 },
    SeedTool { category: 5, name: "Status Report", description: "Writes a progress report that explains project results and data clearly.", sub_category: "Reports", is_premium: true, usage: 720 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub tools: usize,
}

impl SeedReport {
    pub fn skipped(&self) -> bool {
        self.categories == 0 && self.tools == 0
    }
}

impl Store {
    /// Load the demo catalog. Does nothing if any category already exists.
    pub fn seed_demo_catalog(&self) -> Result<SeedReport> {
        let mut conn = self.lock()?;
        if count_categories(&conn)? > 0 {
            tracing::info!("Database already seeded, skipping");
            return Ok(SeedReport {
                categories: 0,
                tools: 0,
            });
        }

        let tx = conn.transaction()?;
        let mut category_ids = Vec::with_capacity(CATEGORIES.len());
        for (i, name) in CATEGORIES.iter().enumerate() {
            category_ids.push(insert_category(&tx, name, i as i64 + 1)?);
        }

        let now = Utc::now();
        for tool in TOOLS {
            let new = NewTool {
                name: tool.name.to_string(),
                description: tool.description.to_string(),
                category_id: category_ids[tool.category],
                sub_category: Some(tool.sub_category.to_string()),
                is_premium: tool.is_premium,
                custom_prompt: None,
            };
            insert_tool(&tx, &new, tool.usage, &now)?;
        }
        tx.commit()?;

        let report = SeedReport {
            categories: CATEGORIES.len(),
            tools: TOOLS.len(),
        };
        tracing::info!(
            categories = report.categories,
            tools = report.tools,
            "Seeded demo catalog"
        );
        Ok(report)
    }
}
