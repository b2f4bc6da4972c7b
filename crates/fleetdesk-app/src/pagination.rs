// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// One slot in the pagination footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u64),
    Ellipsis,
}

const SIBLING_COUNT: u64 = 1;
const MAX_VISIBLE_PAGES: u64 = 7;

/// Windowed page list: first and last page always visible, one sibling on
/// each side of the current page, at most one ellipsis per gap. A single
/// page yields no control at all.
pub fn page_items(current: u64, total: u64) -> Vec<PageItem> {
    if total <= 1 {
        return Vec::new();
    }
    if total <= MAX_VISIBLE_PAGES {
        return (1..=total).map(PageItem::Page).collect();
    }

    let left_sibling = current.saturating_sub(SIBLING_COUNT).max(2);
    let right_sibling = (current + SIBLING_COUNT).min(total - 1);

    let mut items = vec![PageItem::Page(1)];
    if left_sibling > 2 {
        items.push(PageItem::Ellipsis);
    }
    for page in left_sibling..=right_sibling {
        items.push(PageItem::Page(page));
    }
    if right_sibling < total - 1 {
        items.push(PageItem::Ellipsis);
    }
    items.push(PageItem::Page(total));
    items
}

/// Number of pages needed to show `total` rows at `per_page` rows a page.
pub fn total_pages(total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page)
}
