use serde::{Deserialize, Serialize};
use url::form_urlencoded;

pub const DEFAULT_PAGE_SIZE: u32 = 6;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.limit())
    }
}

/// One page of results plus links to its neighbours.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `path` and `query` come from the request so links keep any filters.
    pub fn new(results: Vec<T>, count: i64, params: PageParams, path: &str, query: Option<&str>) -> Self {
        let page = params.page();
        let shown = params.offset() + results.len() as i64;

        let next = (shown < count).then(|| page_link(path, query, page + 1));
        let previous = (page > 1).then(|| page_link(path, query, page - 1));

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

fn page_link(path: &str, query: Option<&str>, page: u32) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
        if key != "page" {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.append_pair("page", &page.to_string());
    format!("{path}?{}", serializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_bounds() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(params.offset(), 0);

        let params = PageParams {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), MAX_PAGE_SIZE);

        let params = PageParams {
            page: Some(3),
            limit: Some(5),
        };
        assert_eq!(params.offset(), 10);
    }

    #[test]
    fn middle_page_links_both_ways_and_keeps_filters() {
        let params = PageParams {
            page: Some(2),
            limit: Some(2),
        };
        let page = Page::new(vec![3, 4], 5, params, "/api/recipes", Some("tags=lunch&page=2&limit=2"));

        assert_eq!(page.next.as_deref(), Some("/api/recipes?tags=lunch&limit=2&page=3"));
        assert_eq!(page.previous.as_deref(), Some("/api/recipes?tags=lunch&limit=2&page=1"));
    }

    #[test]
    fn single_page_has_no_links() {
        let page = Page::new(vec![1, 2], 2, PageParams::default(), "/api/users", None);
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
        assert_eq!(page.count, 2);
    }
}
