use super::types::PaginationParams;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

pub fn validate_pagination(page: Option<u32>, limit: Option<u32>) -> PaginationParams {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    PaginationParams { page, limit }
}

/// Trim a free-text value, mapping blank input to `None`.
pub fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(validate_pagination(None, None), PaginationParams { page: 1, limit: 10 });
        assert_eq!(validate_pagination(Some(0), Some(1000)), PaginationParams { page: 1, limit: 100 });
        assert_eq!(validate_pagination(Some(4), Some(0)), PaginationParams { page: 4, limit: 1 });
    }

    #[test]
    fn normalize_text_trims_and_drops_blank() {
        assert_eq!(normalize_text(Some("  rain  ")), Some("rain".to_string()));
        assert_eq!(normalize_text(Some("   ")), None);
        assert_eq!(normalize_text(None), None);
    }
}
