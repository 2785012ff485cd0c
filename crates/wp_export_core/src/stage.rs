use std::fmt;

/// Export pipeline stages. Each stage depends on the catalogs written by the
/// previous one, so they only ever advance in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    AuthorsPending,
    CategoriesPending,
    PostsPending,
    Done,
    Failed,
}

impl Stage {
    /// The stage that follows a successful completion of `self`.
    /// Terminal stages stay where they are.
    pub fn advance(self) -> Stage {
        match self {
            Stage::AuthorsPending => Stage::CategoriesPending,
            Stage::CategoriesPending => Stage::PostsPending,
            Stage::PostsPending => Stage::Done,
            Stage::Done => Stage::Done,
            Stage::Failed => Stage::Failed,
        }
    }

    /// Failure is reachable from every non-terminal stage.
    pub fn fail(self) -> Stage {
        match self {
            Stage::Done => Stage::Done,
            _ => Stage::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::AuthorsPending => write!(f, "authors"),
            Stage::CategoriesPending => write!(f, "categories"),
            Stage::PostsPending => write!(f, "posts"),
            Stage::Done => write!(f, "done"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}
