//! Entry listing query.

/// Largest page the store serves per request.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Filter for [`ContentStore::list_entries`](crate::ContentStore::list_entries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    pub content_type: Option<String>,
    pub select: Option<String>,
    pub tag: Option<String>,
    pub exclude_archived: bool,
    pub page_size: usize,
}

impl Default for EntryQuery {
    fn default() -> Self {
        Self {
            content_type: None,
            select: None,
            tag: None,
            exclude_archived: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl EntryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Comma-separated field projection, e.g. `sys.id,sys.version`.
    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    /// Only entries carrying this metadata tag.
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn not_archived(mut self) -> Self {
        self.exclude_archived = true;
        self
    }

    /// Query-string pairs for the page starting at `skip`.
    pub fn to_params(&self, skip: usize) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(content_type) = &self.content_type {
            params.push(("content_type".to_string(), content_type.clone()));
        }
        if let Some(select) = &self.select {
            params.push(("select".to_string(), select.clone()));
        }
        if let Some(tag) = &self.tag {
            params.push(("metadata.tags.sys.id[in]".to_string(), tag.clone()));
        }
        if self.exclude_archived {
            params.push(("sys.archivedAt[exists]".to_string(), "false".to_string()));
        }
        params.push(("skip".to_string(), skip.to_string()));
        params.push(("limit".to_string(), self.page_size.to_string()));
        params
    }
}
