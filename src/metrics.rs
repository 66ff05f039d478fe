/// Content-stream statistics for one written page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetrics {
    pub page_number: usize,
    pub command_count: usize,
    pub content_bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub total_bytes: usize,
}

impl DocumentMetrics {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn total_commands(&self) -> usize {
        self.pages.iter().map(|page| page.command_count).sum()
    }
}
