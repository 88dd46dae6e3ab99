// One module per user-facing feature, plus the listing helpers they share.

pub mod authoring;
pub mod catalog;
pub mod minigames;
pub mod profile;
pub mod registration;

use questline_core::transport::{Button, Keyboard};
use questline_core::{CallbackPayload, Choice};

/// Listing page size, everywhere a listing is paged
pub(crate) const PAGE_SIZE: usize = 5;

/// The page slice and the last valid page index. Callers handle the empty
/// case before paging.
pub(crate) fn page_slice<T>(items: &[T], page: u32) -> (&[T], u32) {
    let max_page = (items.len().saturating_sub(1) / PAGE_SIZE) as u32;
    let page = page.min(max_page);
    let start = page as usize * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(items.len());
    (&items[start..end], max_page)
}

/// The shared listing layout: one row of numbered select buttons, then a
/// row of page-flip arrows where they apply.
pub(crate) fn listing_keyboard(
    page: u32,
    max_page: u32,
    on_page: usize,
    select: impl Fn(usize) -> CallbackPayload,
    flip: impl Fn(u32) -> CallbackPayload,
) -> Keyboard {
    let numbers: Vec<Button> = (0..on_page)
        .map(|i| {
            let label = (page as usize * PAGE_SIZE + i + 1).to_string();
            Button::new(label, select(i).encode())
        })
        .collect();

    let mut arrows = Vec::new();
    if page > 0 {
        arrows.push(Button::new("◀️", flip(page - 1).encode()));
    }
    if page < max_page {
        arrows.push(Button::new("▶️", flip(page + 1).encode()));
    }

    let mut rows = vec![numbers];
    if !arrows.is_empty() {
        rows.push(arrows);
    }
    Keyboard::new(rows)
}

/// One button per row, each carrying its freshly encoded token
pub(crate) fn choice_keyboard(choices: Vec<Choice>) -> Keyboard {
    Keyboard::column(
        choices
            .into_iter()
            .map(|choice| Button::new(choice.label, choice.payload.encode()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_slice_clamps_and_bounds() {
        let items: Vec<u32> = (0..12).collect();
        let (slice, max_page) = page_slice(&items, 0);
        assert_eq!(slice, &[0, 1, 2, 3, 4]);
        assert_eq!(max_page, 2);

        let (slice, _) = page_slice(&items, 2);
        assert_eq!(slice, &[10, 11]);

        // Out-of-range pages clamp to the last page instead of panicking.
        let (slice, _) = page_slice(&items, 9);
        assert_eq!(slice, &[10, 11]);
    }

    #[test]
    fn listing_keyboard_shows_only_valid_arrows() {
        let select = |i: usize| CallbackPayload::CatalogPage { page: i as u32 };
        let flip = |page: u32| CallbackPayload::CatalogPage { page };

        let first = listing_keyboard(0, 2, 5, select, flip);
        assert_eq!(first.rows.len(), 2);
        assert_eq!(first.rows[0].len(), 5);
        assert_eq!(first.rows[1].len(), 1);
        assert_eq!(first.rows[1][0].label, "▶️");

        let middle = listing_keyboard(1, 2, 5, select, flip);
        assert_eq!(middle.rows[1].len(), 2);

        let only = listing_keyboard(0, 0, 3, select, flip);
        assert_eq!(only.rows.len(), 1);
    }

    #[test]
    fn numbered_labels_continue_across_pages() {
        let select = |i: usize| CallbackPayload::CatalogPage { page: i as u32 };
        let flip = |page: u32| CallbackPayload::CatalogPage { page };
        let keyboard = listing_keyboard(1, 2, 5, select, flip);
        let labels: Vec<&str> = keyboard.rows[0].iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["6", "7", "8", "9", "10"]);
    }
}
