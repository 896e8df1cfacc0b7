use crate::pagination::cursor::PageCursor;
use serde_json::Value;

/// One raw page of vendor objects plus where to continue from.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_cursor: Option<PageCursor>,
}

impl Page {
    /// Builds a page, dropping a continuation the server did not really
    /// offer (`has_more == false`, missing or falsy cursor).
    pub fn new(items: Vec<Value>, next_cursor: Option<PageCursor>, has_more: bool) -> Self {
        let next_cursor = next_cursor.filter(|c| has_more && !c.is_terminal());
        Self { items, next_cursor }
    }

    pub fn last(items: Vec<Value>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_continuation_ends_the_listing() {
        let empty_token = Page::new(vec![json!(1)], Some(PageCursor::Token(String::new())), true);
        assert!(!empty_token.has_more());

        let no_more = Page::new(vec![json!(1)], Some(PageCursor::Token("abc".into())), false);
        assert!(!no_more.has_more());

        let zero_start = Page::new(vec![], Some(PageCursor::Start { start: 0 }), true);
        assert!(!zero_start.has_more());

        let more = Page::new(vec![], Some(PageCursor::Start { start: 50 }), true);
        assert_eq!(more.next_cursor, Some(PageCursor::Start { start: 50 }));
    }
}
