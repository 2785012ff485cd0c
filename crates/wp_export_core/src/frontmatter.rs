
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Published,
    Draft,
}

impl PostStatus {
    /// WordPress reports `publish` for live posts; every other state is
    /// exported as a draft.
    pub fn from_remote(status: &str) -> Self {
        if status == "publish" {
            PostStatus::Published
        } else {
            PostStatus::Draft
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Published => "published",
            PostStatus::Draft => "draft",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontmatter {
    pub id: String,
    pub title: String,
    pub status: PostStatus,
    pub author: String,
    pub author_slug: Option<String>,
    pub title_image: Option<String>,
    pub category_slug: Option<String>,
    pub category: Option<String>,
    pub published_date: String,
    pub updated_at: String,
    pub remote_id: u64,
    /// `None` leaves the key out entirely.
    pub tags: Option<Vec<String>>,
}

impl Frontmatter {
    /// Renders the `---` delimited block, including the closing delimiter and
    /// its trailing newline.
    pub fn render(&self) -> String {
        let tags = match &self.tags {
            None => String::new(),
            Some(tags) if tags.is_empty() => "tags: []\n".to_string(),
            Some(tags) => {
                let items: String = tags.iter().map(|tag| format!("  - {}\n", quote(tag))).collect();
                format!("tags:\n{items}")
            }
        };
        format!(
            "---\nid: {id}\ntitle: {title}\nstatus: {status}\nauthor: {author}\nauthorSlug: {author_slug}\ntitleImage: {title_image}\ncategorySlug: {category_slug}\ncategory: {category}\npublishedDate: {published}\nupdatedAt: {updated}\nremoteId: {remote_id}\n{tags}---\n",
            id = quote(&self.id),
            title = quote(&self.title),
            status = self.status.as_str(),
            author = quote(&self.author),
            author_slug = quote_opt(self.author_slug.as_deref()),
            title_image = quote_opt(self.title_image.as_deref()),
            category_slug = quote_opt(self.category_slug.as_deref()),
            category = quote_opt(self.category.as_deref()),
            published = quote(&self.published_date),
            updated = quote(&self.updated_at),
            remote_id = self.remote_id,
        )
    }
}

/// Builds the full `index.md` content: frontmatter, a blank line, the body.
pub fn build_post_document(frontmatter: &Frontmatter, body_markdown: &str) -> String {
    let body = body_markdown.trim_end();
    let mut doc = frontmatter.render();
    doc.push('\n');
    if !body.is_empty() {
        doc.push_str(body);
        doc.push('\n');
    }
    doc
}

fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn quote_opt(value: Option<&str>) -> String {
    value.map(quote).unwrap_or_else(|| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(quote(r#"Say "hi" \o/"#), r#""Say \"hi\" \\o/""#);
    }
}
