use std::fs;
use std::path::Path;

use crate::memory::PageId;

/// Render pages as one `job page` line each, in page-index order.
pub fn encode_pages(pages: &[PageId]) -> String {
    let mut out = String::with_capacity(pages.len() * 8);
    for page in pages {
        out.push_str(&page.job_id.to_string());
        out.push(' ');
        out.push_str(&page.page.to_string());
        out.push('\n');
    }
    out
}

/// Parse exactly `count` lines of `job page` pairs.
pub fn parse_pages(content: &str, count: usize) -> Result<Vec<PageId>, String> {
    let mut pages = Vec::with_capacity(count);
    for (index, line) in content.lines().take(count).enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 2 {
            return Err(format!("Line {} has {} tokens, expected 2", index + 1, tokens.len()));
        }
        let job_id: usize = tokens[0]
            .parse()
            .map_err(|_| format!("Invalid job id on line {}: {}", index + 1, tokens[0]))?;
        let page: usize = tokens[1]
            .parse()
            .map_err(|_| format!("Invalid page id on line {}: {}", index + 1, tokens[1]))?;
        pages.push(PageId::new(job_id, page));
    }

    if pages.len() != count {
        return Err(format!("Expected {} pages, found {}", count, pages.len()));
    }
    Ok(pages)
}

pub fn write_pages<P: AsRef<Path>>(path: P, pages: &[PageId]) -> Result<(), String> {
    fs::write(path.as_ref(), encode_pages(pages))
        .map_err(|e| format!("Failed to write backing file: {}", e))
}

pub fn read_pages<P: AsRef<Path>>(path: P, count: usize) -> Result<Vec<PageId>, String> {
    let content = fs::read_to_string(path.as_ref())
        .map_err(|e| format!("Failed to read backing file: {}", e))?;
    parse_pages(&content, count)
}
