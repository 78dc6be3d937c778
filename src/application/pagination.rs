//! Page-number pagination metadata and the page window shown in controls.

use std::fmt;

use blogdesk_api_types::PaginationDto;
use serde::Serialize;

/// Windows at or below this size list every page.
const FULL_WINDOW_MAX: u32 = 5;

/// Server-supplied pagination metadata; replaced wholesale, never patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total_items: u64,
    pub total_pages: u32,
    pub current_page: u32,
}

impl From<PaginationDto> for Pagination {
    fn from(dto: PaginationDto) -> Self {
        Self {
            total_items: dto.total_items,
            total_pages: dto.total_pages,
            current_page: dto.current_page,
        }
    }
}

impl Pagination {
    pub fn window(&self) -> Vec<PageLink> {
        windows(self.current_page, self.total_pages)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page(u32),
    Ellipsis,
}

impl Serialize for PageLink {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageLink::Page(number) => serializer.serialize_u32(*number),
            PageLink::Ellipsis => serializer.serialize_str("…"),
        }
    }
}

impl fmt::Display for PageLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageLink::Page(number) => write!(f, "{number}"),
            PageLink::Ellipsis => f.write_str("…"),
        }
    }
}

/// Page numbers and ellipsis markers to render for `current_page` of `total_pages`.
pub fn windows(current_page: u32, total_pages: u32) -> Vec<PageLink> {
    if total_pages <= FULL_WINDOW_MAX {
        return (1..=total_pages).map(PageLink::Page).collect();
    }

    if current_page <= 3 {
        let mut links: Vec<PageLink> = (1..=4).map(PageLink::Page).collect();
        links.push(PageLink::Ellipsis);
        links.push(PageLink::Page(total_pages));
        return links;
    }

    if current_page >= total_pages - 2 {
        let mut links = vec![PageLink::Page(1), PageLink::Ellipsis];
        links.extend((total_pages - 3..=total_pages).map(PageLink::Page));
        return links;
    }

    vec![
        PageLink::Page(1),
        PageLink::Ellipsis,
        PageLink::Page(current_page - 1),
        PageLink::Page(current_page),
        PageLink::Page(current_page + 1),
        PageLink::Ellipsis,
        PageLink::Page(total_pages),
    ]
}

#[cfg(test)]
mod tests {
    use super::PageLink::{Ellipsis, Page};
    use super::*;

    fn render(links: &[PageLink]) -> String {
        links
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn small_totals_list_every_page() {
        for total in 0..=5 {
            for current in 1..=total.max(1) {
                let links = windows(current, total);
                let expected: Vec<PageLink> = (1..=total).map(Page).collect();
                assert_eq!(links, expected, "current={current} total={total}");
                assert!(!links.contains(&Ellipsis));
            }
        }
    }

    #[test]
    fn near_the_start() {
        assert_eq!(
            windows(2, 10),
            vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(10)]
        );
        assert_eq!(render(&windows(3, 6)), "1,2,3,4,…,6");
    }

    #[test]
    fn near_the_end() {
        assert_eq!(
            windows(9, 10),
            vec![Page(1), Ellipsis, Page(7), Page(8), Page(9), Page(10)]
        );
        assert_eq!(render(&windows(4, 6)), "1,…,3,4,5,6");
    }

    #[test]
    fn in_the_middle() {
        assert_eq!(
            windows(5, 10),
            vec![
                Page(1),
                Ellipsis,
                Page(4),
                Page(5),
                Page(6),
                Ellipsis,
                Page(10)
            ]
        );
    }

    #[test]
    fn window_is_deterministic() {
        assert_eq!(windows(7, 42), windows(7, 42));
    }

    #[test]
    fn links_serialize_as_numbers_and_ellipsis() {
        let json = serde_json::to_string(&windows(9, 10)).expect("serialize");
        assert_eq!(json, r#"[1,"…",7,8,9,10]"#);
    }

    #[test]
    fn metadata_reports_neighbours() {
        let pagination = Pagination {
            total_items: 30,
            total_pages: 3,
            current_page: 3,
        };
        assert!(pagination.has_previous());
        assert!(!pagination.has_next());
        assert_eq!(pagination.window(), vec![Page(1), Page(2), Page(3)]);
    }
}
