//! Listing order and filename rules for pages and files

use std::cmp::Ordering;

use shared_types::{Page, SiteFile, INDEX_PAGE};

/// Reverse-lexicographic, case-insensitive first, then by exact bytes so
/// the order is total.
fn listing_order(a: &str, b: &str) -> Ordering {
    b.to_lowercase()
        .cmp(&a.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// `index.md` first, everything else in listing order. Duplicate names
/// collapse to the first occurrence.
pub fn sort_pages(pages: &mut Vec<Page>) {
    pages.sort_by(|a, b| match (a.name == INDEX_PAGE, b.name == INDEX_PAGE) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => listing_order(&a.name, &b.name),
    });
    pages.dedup_by(|a, b| a.name == b.name);
}

pub fn sort_files(files: &mut Vec<SiteFile>) {
    files.sort_by(|a, b| listing_order(&a.name, &b.name));
    files.dedup_by(|a, b| a.name == b.name);
}

/// Strip every character that is not an ASCII letter, digit, underscore or
/// period. No other validation happens client-side.
pub fn sanitize_filename(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(pages: &[Page]) -> Vec<&str> {
        pages.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_index_sorts_first_then_reverse() {
        let mut pages = vec![
            Page::new("b.md", "", ""),
            Page::new("index.md", "", ""),
            Page::new("a.md", "", ""),
        ];
        sort_pages(&mut pages);
        assert_eq!(names(&pages), vec!["index.md", "b.md", "a.md"]);
    }

    #[test]
    fn test_sort_without_index() {
        let mut pages = vec![
            Page::new("About.md", "", ""),
            Page::new("zebra.md", "", ""),
            Page::new("blog.md", "", ""),
        ];
        sort_pages(&mut pages);
        assert_eq!(names(&pages), vec!["zebra.md", "blog.md", "About.md"]);
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let mut pages = vec![
            Page::new("a.md", "first", ""),
            Page::new("index.md", "", ""),
            Page::new("a.md", "second", ""),
        ];
        sort_pages(&mut pages);
        assert_eq!(names(&pages), vec!["index.md", "a.md"]);
    }

    #[test]
    fn test_files_reverse_order() {
        let mut files = vec![
            SiteFile::new("a.png"),
            SiteFile::new("c.png"),
            SiteFile::new("b.png"),
        ];
        sort_files(&mut files);
        let sorted: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(sorted, vec!["c.png", "b.png", "a.png"]);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my file!.md"), "myfile.md");
        assert_eq!(sanitize_filename("../etc/passwd"), "..etcpasswd");
        assert_eq!(sanitize_filename("résumé_2.md"), "rsum_2.md");
        assert_eq!(sanitize_filename("already_ok.md"), "already_ok.md");
    }
}
