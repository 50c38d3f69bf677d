//! Paged queries over grouped join rows.
//!
//! [`PagedQuery`] answers "page N of size S" for any [`RowSource`]: it
//! decodes the request cursor, streams rows from the source into a
//! [`RowGrouper`], and stops once the page holds `page_size` parents.
//!
//! Pages are windowed by *parent* count, never by row count. A parent whose
//! children straddle the nominal page edge is returned whole, and the next
//! cursor's offset advances by the number of parents returned. The source is
//! pulled lazily, so at most one row of the following parent is read before
//! the scan stops.

use std::hash::Hash;
use std::ops::ControlFlow;

use crate::cursor::Cursor;
use crate::grouping::{Group, GroupKey, JoinRow, RowGrouper};

/// A lazily read, grouping-ordered stream of join rows.
///
/// Implementations must deliver all rows of one parent contiguously and in a
/// stable parent order, so that skipping `skip_parents` parents always lands
/// on the same parent for an unchanged data set.
pub trait RowSource {
    /// Query criteria, bound by the caller.
    type Filter;
    type Parent: GroupKey;
    type Child: Eq + Hash + Clone;
    type Error;

    /// Stream rows starting at the first row of the `skip_parents`-th parent.
    ///
    /// `visit` is called once per row; the scan stops as soon as it returns
    /// [`ControlFlow::Break`]. `limit_hint` is the number of parents the
    /// caller intends to consume; sources may read fewer parents than that
    /// only when the data runs out.
    fn scan(
        &self,
        filter: &Self::Filter,
        skip_parents: u64,
        limit_hint: u32,
        visit: &mut dyn FnMut(JoinRow<Self::Parent, Self::Child>) -> ControlFlow<()>,
    ) -> Result<(), Self::Error>;

    /// Count the parents matching `filter`.
    fn count(&self, filter: &Self::Filter) -> Result<u64, Self::Error>;
}

/// What the caller asked for.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// Cursor token from the previous page, if any.
    pub cursor: Option<&'a str>,
    /// Page size used when the cursor does not carry one.
    pub default_page_size: u32,
    /// Count the listing when the cursor does not already know its total.
    pub include_total: bool,
}

impl<'a> PageRequest<'a> {
    pub fn new(cursor: Option<&'a str>, default_page_size: u32) -> Self {
        Self {
            cursor,
            default_page_size,
            include_total: false,
        }
    }

    pub fn with_total(mut self, include_total: bool) -> Self {
        self.include_total = include_total;
        self
    }
}

/// Paging metadata rendered alongside a page of documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Token that produced this page.
    pub page: String,
    /// Token for the following page; `None` once the listing is known to be done.
    pub next_page: Option<String>,
    pub total: Option<u64>,
    pub page_size: u32,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The decoded cursor this page was read at.
    pub cursor: Cursor,
    /// Token identifying this page.
    pub current: String,
    /// Token for the next page. Equals `current` when the page is empty.
    pub next: String,
}

impl<T> Page<T> {
    /// Whether no further page can contain items.
    pub fn is_last(&self) -> bool {
        if self.items.is_empty() {
            return true;
        }
        self.cursor.advance(self.items.len() as u64).is_exhausted()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            cursor: self.cursor,
            current: self.current,
            next: self.next,
        }
    }

    pub fn info(&self) -> PageInfo {
        PageInfo {
            page: self.current.clone(),
            next_page: (!self.is_last()).then(|| self.next.clone()),
            total: self.cursor.total,
            page_size: self.cursor.page_size,
        }
    }
}

/// Executes paged reads against one [`RowSource`].
pub struct PagedQuery<'s, S> {
    source: &'s S,
}

impl<'s, S: RowSource> PagedQuery<'s, S> {
    pub fn new(source: &'s S) -> Self {
        Self { source }
    }

    /// Read the page the request's cursor points at.
    pub fn page(
        &self,
        filter: &S::Filter,
        request: &PageRequest<'_>,
    ) -> Result<Page<Group<S::Parent, S::Child>>, S::Error> {
        let mut cursor = Cursor::decode(request.cursor, request.default_page_size);

        if cursor.total.is_none() && request.include_total {
            cursor.total = Some(self.source.count(filter)?);
            if cursor.is_exhausted() && cursor.offset > 0 {
                tracing::debug!(offset = cursor.offset, total = ?cursor.total, "cursor starts past the end of the listing");
            }
        }

        let page_size = cursor.page_size as usize;
        let mut grouper: RowGrouper<S::Parent, S::Child> = RowGrouper::new();
        self.source
            .scan(filter, cursor.offset, cursor.page_size, &mut |row| {
                if grouper.len() >= page_size && !grouper.contains(&row.parent) {
                    return ControlFlow::Break(());
                }
                grouper.push(row);
                ControlFlow::Continue(())
            })?;

        let items: Vec<_> = grouper.finish().collect();
        let current = match request.cursor.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => token.to_string(),
            None => cursor.encode(),
        };
        let next = if items.is_empty() {
            current.clone()
        } else {
            cursor.advance(items.len() as u64).encode()
        };

        tracing::debug!(
            offset = cursor.offset,
            page_size = cursor.page_size,
            returned = items.len(),
            "page read"
        );

        Ok(Page {
            items,
            cursor,
            current,
            next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::grouping::Assemble;

    #[derive(Debug, Clone, PartialEq)]
    struct Parent(String);

    impl GroupKey for Parent {
        type Key = String;
        fn group_key(&self) -> String {
            self.0.clone()
        }
    }

    impl Assemble<u32> for Parent {
        fn assemble(self, _children: Vec<u32>) -> Self {
            self
        }
    }

    /// Rows ordered by parent; counts how many rows were pulled.
    struct VecSource {
        rows: Vec<(String, Option<u32>)>,
        pulled: Cell<usize>,
        counted: Cell<usize>,
    }

    impl VecSource {
        fn new(rows: &[(&str, Option<u32>)]) -> Self {
            Self {
                rows: rows.iter().map(|(p, c)| (p.to_string(), *c)).collect(),
                pulled: Cell::new(0),
                counted: Cell::new(0),
            }
        }

        fn parents(&self) -> Vec<String> {
            let mut out: Vec<String> = Vec::new();
            for (p, _) in &self.rows {
                if out.last() != Some(p) {
                    out.push(p.clone());
                }
            }
            out
        }
    }

    impl RowSource for VecSource {
        type Filter = ();
        type Parent = Parent;
        type Child = u32;
        type Error = std::convert::Infallible;

        fn scan(
            &self,
            _filter: &(),
            skip_parents: u64,
            _limit_hint: u32,
            visit: &mut dyn FnMut(JoinRow<Parent, u32>) -> ControlFlow<()>,
        ) -> Result<(), Self::Error> {
            let parents = self.parents();
            let Some(first) = parents.get(skip_parents as usize) else {
                return Ok(());
            };
            let start = self.rows.iter().position(|(p, _)| p == first).unwrap_or(0);
            for (p, c) in &self.rows[start..] {
                self.pulled.set(self.pulled.get() + 1);
                if visit(JoinRow::new(Parent(p.clone()), *c)).is_break() {
                    break;
                }
            }
            Ok(())
        }

        fn count(&self, _filter: &()) -> Result<u64, Self::Error> {
            self.counted.set(self.counted.get() + 1);
            Ok(self.parents().len() as u64)
        }
    }

    fn names<C>(page: &Page<Group<Parent, C>>) -> Vec<&str> {
        page.items.iter().map(|g| g.parent.0.as_str()).collect()
    }

    #[test]
    fn parent_straddling_page_edge_is_returned_whole() {
        // Page size 3; parent C's rows occupy row positions 2..=5.
        let source = VecSource::new(&[
            ("A", Some(1)),
            ("B", Some(2)),
            ("C", Some(3)),
            ("C", Some(4)),
            ("C", Some(5)),
            ("C", Some(6)),
            ("D", Some(7)),
        ]);
        let page = PagedQuery::new(&source)
            .page(&(), &PageRequest::new(None, 3))
            .unwrap();
        assert_eq!(names(&page), vec!["A", "B", "C"]);
        assert_eq!(page.items[2].children, vec![3, 4, 5, 6]);
        assert_eq!(page.next, "3|null|3");
        // Only the first row of D was read beyond the page.
        assert_eq!(source.pulled.get(), 7);
    }

    #[test]
    fn follows_cursor_to_next_page() {
        let source = VecSource::new(&[
            ("A", None),
            ("B", Some(1)),
            ("B", Some(2)),
            ("C", Some(3)),
        ]);
        let first = PagedQuery::new(&source)
            .page(&(), &PageRequest::new(None, 2))
            .unwrap();
        assert_eq!(names(&first), vec!["A", "B"]);

        let second = PagedQuery::new(&source)
            .page(&(), &PageRequest::new(Some(&first.next), 100))
            .unwrap();
        assert_eq!(names(&second), vec!["C"]);
        assert_eq!(second.cursor.page_size, 2);
        assert_eq!(second.next, "3|null|2");
    }

    #[test]
    fn end_of_stream_returns_input_token() {
        let source = VecSource::new(&[("A", Some(1))]);
        let page = PagedQuery::new(&source)
            .page(&(), &PageRequest::new(Some("1|null|5"), 5))
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.next, "1|null|5");
        assert!(page.is_last());
    }

    #[test]
    fn total_counted_once_then_threaded_through() {
        let source = VecSource::new(&[("A", None), ("B", None), ("C", None)]);
        let first = PagedQuery::new(&source)
            .page(&(), &PageRequest::new(None, 2).with_total(true))
            .unwrap();
        assert_eq!(first.next, "2|3|2");
        assert!(!first.is_last());
        assert_eq!(source.counted.get(), 1);

        let second = PagedQuery::new(&source)
            .page(&(), &PageRequest::new(Some(&first.next), 2).with_total(true))
            .unwrap();
        assert_eq!(names(&second), vec!["C"]);
        assert!(second.is_last());
        assert_eq!(second.info().next_page, None);
        assert_eq!(source.counted.get(), 1);
    }

    #[test]
    fn corrupted_cursor_restarts_listing() {
        let source = VecSource::new(&[("A", None), ("B", None)]);
        let page = PagedQuery::new(&source)
            .page(&(), &PageRequest::new(Some("not-a-cursor"), 10))
            .unwrap();
        assert_eq!(names(&page), vec!["A", "B"]);
        assert_eq!(page.next, "2|null|10");
    }

    #[test]
    fn page_info_without_total_keeps_next_token() {
        let source = VecSource::new(&[("A", None)]);
        let page = PagedQuery::new(&source)
            .page(&(), &PageRequest::new(None, 1))
            .unwrap();
        let info = page.info();
        assert_eq!(info.page, "0|null|1");
        assert_eq!(info.next_page.as_deref(), Some("1|null|1"));
        assert_eq!(info.total, None);
    }

    #[test]
    fn map_assembles_groups() {
        let source = VecSource::new(&[("A", Some(1))]);
        let page = PagedQuery::new(&source)
            .page(&(), &PageRequest::new(None, 1))
            .unwrap()
            .map(Group::assemble);
        assert_eq!(page.items, vec![Parent("A".into())]);
    }
}
