use serde::Serialize;

use super::ViewError;

/// One page of a paginated collection, as seen by templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// 1-based page number
    pub number: u64,
    pub num_pages: u64,
    /// Total number of objects across all pages
    pub count: u64,
    pub per_page: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
    /// 1-based index of the first object on this page (0 if empty)
    pub start_index: u64,
    /// 1-based index of the last object on this page
    pub end_index: u64,
}

impl Page {
    /// Resolve the `page` parameter against `count` objects.
    ///
    /// Accepts a 1-based number or `last`. The first page always exists,
    /// even when there is nothing to show.
    pub fn resolve(requested: Option<&str>, count: u64, per_page: u64) -> Result<Self, ViewError> {
        let per_page = per_page.max(1);
        let num_pages = count.div_ceil(per_page).max(1);

        let number = match requested.map(str::trim) {
            None | Some("") => 1,
            Some("last") => num_pages,
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ViewError::InvalidPage(format!(
                    "Page '{}' is not 'last', nor can it be converted to an int",
                    raw
                ))
            })?,
        };

        if number < 1 {
            return Err(ViewError::InvalidPage("That page number is less than 1".to_string()));
        }
        if number > num_pages {
            return Err(ViewError::InvalidPage(format!(
                "Page {} contains no results",
                number
            )));
        }

        let offset = (number - 1) * per_page;
        let (start_index, end_index) = if count == 0 {
            (0, 0)
        } else {
            (offset + 1, (offset + per_page).min(count))
        };

        Ok(Self {
            number,
            num_pages,
            count,
            per_page,
            has_next: number < num_pages,
            has_previous: number > 1,
            next_page_number: (number < num_pages).then_some(number + 1),
            previous_page_number: (number > 1).then_some(number - 1),
            start_index,
            end_index,
        })
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn has_other_pages(&self) -> bool {
        self.has_next || self.has_previous
    }
}
