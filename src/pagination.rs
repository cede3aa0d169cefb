//! This modules defines the common functionality for paging data.

use crate::Error;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The maximum transactions to return per page when not specified in a request.
    pub default_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
        }
    }
}

/// A one-based page of `page_size` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: u64,
    page_size: u64,
}

impl PageWindow {
    /// Parse the raw `page` and `perPage` query values, falling back to the
    /// defaults in `config` when a value is absent.
    ///
    /// # Errors
    /// Returns an [Error::InvalidArgument] if a value is present but is not a
    /// positive integer, or if the page starts beyond what the store can address.
    pub fn parse(
        page: Option<&str>,
        page_size: Option<&str>,
        config: &PaginationConfig,
    ) -> Result<Self, Error> {
        let page = parse_positive(page, "page")?.unwrap_or(config.default_page);
        let page_size = parse_positive(page_size, "perPage")?.unwrap_or(config.default_page_size);

        Self::new(page, page_size)
    }

    /// Create a window for the one-based `page` with `page_size` items.
    ///
    /// # Errors
    /// Returns an [Error::InvalidArgument] if either value is zero or the
    /// window's offset does not fit in a SQLite integer.
    pub fn new(page: u64, page_size: u64) -> Result<Self, Error> {
        if page == 0 || page_size == 0 {
            return Err(Error::InvalidArgument(
                "page and perPage must be at least 1".to_owned(),
            ));
        }

        let window = Self { page, page_size };
        let offset_fits = (page - 1)
            .checked_mul(page_size)
            .is_some_and(|offset| i64::try_from(offset).is_ok());

        if !offset_fits || i64::try_from(page_size).is_err() {
            return Err(Error::InvalidArgument(format!(
                "page {page} with perPage {page_size} is out of range"
            )));
        }

        Ok(window)
    }

    /// The number of items to skip before this page.
    pub fn offset(&self) -> i64 {
        // Checked on construction.
        ((self.page - 1) * self.page_size) as i64
    }

    /// The maximum number of items on this page.
    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

fn parse_positive(value: Option<&str>, name: &str) -> Result<Option<u64>, Error> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    match value.parse::<u64>() {
        Ok(number) if number >= 1 => Ok(Some(number)),
        _ => Err(Error::InvalidArgument(format!(
            "Invalid {name} parameter \"{value}\", {name} must be a positive integer"
        ))),
    }
}
