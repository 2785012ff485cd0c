use crate::catalog::{AuthorRecord, Catalog, CategoryRecord};

pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Author as it appears in a post's frontmatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostAuthor {
    pub name: String,
    pub slug: Option<String>,
}

impl PostAuthor {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_AUTHOR.to_string(),
            slug: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.slug.is_none()
    }
}

pub fn resolve_author(authors: &Catalog<AuthorRecord>, remote_author: u64) -> PostAuthor {
    authors
        .get(&remote_author)
        .map(|author| PostAuthor {
            name: author.name.clone(),
            slug: Some(author.id.clone()),
        })
        .unwrap_or_else(PostAuthor::unknown)
}

/// First catalogued category, in catalog order, whose remote id appears in
/// the post. Posts only carry one canonical category.
pub fn resolve_category<'a>(
    categories: &'a [CategoryRecord],
    post_categories: &[u64],
) -> Option<&'a CategoryRecord> {
    categories
        .iter()
        .find(|category| post_categories.contains(&category.remote_id))
}
