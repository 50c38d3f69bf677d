//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests, the conformance suite, and ephemeral servers.
//!
//! Records live in [`BTreeMap`]s keyed by their natural key, so iteration
//! order is the listing order and a paged read is a filtered walk over the
//! map that emits one join row per (parent, child) pair.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use riverdata::{
    single, Group, JoinRow, Location, Office, Page, PagedQuery, RatingTemplate, RowSource, WaterUser,
};

use super::{
    check_template, office_matches, template_what, LocationAlias, LocationFilter, PageParams,
    RatingSpec, Storage, StorageError, TemplateFilter,
};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

type Key2 = (String, String);

#[derive(Default)]
struct Inner {
    offices: BTreeMap<String, Office>,
    /// Locations without aliases, keyed by (office, name).
    locations: BTreeMap<Key2, Location>,
    aliases: BTreeMap<Key2, BTreeSet<String>>,
    /// Templates without rating ids, keyed by (office, template id).
    templates: BTreeMap<Key2, RatingTemplate>,
    /// Keyed by (office, rating id).
    specs: BTreeMap<Key2, RatingSpec>,
    /// Keyed by (office, project, entity name).
    water_users: BTreeMap<(String, String, String), WaterUser>,
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StorageError> {
        self.inner
            .read()
            .map_err(|_| StorageError::Internal("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StorageError> {
        self.inner
            .write()
            .map_err(|_| StorageError::Internal("memory store lock poisoned".into()))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Row sources
// ---------------------------------------------------------------------------

/// Locations left-joined with their aliases.
struct LocationRows<'a>(&'a Inner);

impl LocationRows<'_> {
    fn walk(
        &self,
        filter: &LocationFilter,
        skip_parents: u64,
        visit: &mut dyn FnMut(JoinRow<Location, String>) -> ControlFlow<()>,
    ) {
        let parents = self.0.locations.iter().filter(|(_, l)| filter.matches(l));
        for (key, location) in parents.skip(skip_parents as usize) {
            let aliases = self.0.aliases.get(key).into_iter().flatten();
            let mut emitted = false;
            for alias in aliases {
                emitted = true;
                if visit(JoinRow::new(location.clone(), Some(alias.clone()))).is_break() {
                    return;
                }
            }
            if !emitted && visit(JoinRow::new(location.clone(), None)).is_break() {
                return;
            }
        }
    }
}

impl RowSource for LocationRows<'_> {
    type Filter = LocationFilter;
    type Parent = Location;
    type Child = String;
    type Error = StorageError;

    fn scan(
        &self,
        filter: &LocationFilter,
        skip_parents: u64,
        _limit_hint: u32,
        visit: &mut dyn FnMut(JoinRow<Location, String>) -> ControlFlow<()>,
    ) -> Result<(), StorageError> {
        self.walk(filter, skip_parents, visit);
        Ok(())
    }

    fn count(&self, filter: &LocationFilter) -> Result<u64, StorageError> {
        Ok(self.0.locations.values().filter(|l| filter.matches(l)).count() as u64)
    }
}

/// Templates left-joined with their non-aliased specs.
struct TemplateRows<'a>(&'a Inner);

impl TemplateRows<'_> {
    fn rating_ids<'s>(&'s self, template: &'s RatingTemplate) -> impl Iterator<Item = &'s String> + 's {
        self.0
            .specs
            .values()
            .filter(move |s| {
                s.aliased_item.is_none()
                    && s.office_id == template.office_id
                    && s.template_id == template.id
            })
            .map(|s| &s.rating_id)
    }

    fn walk<'s>(
        &self,
        templates: impl Iterator<Item = &'s RatingTemplate>,
        visit: &mut dyn FnMut(JoinRow<RatingTemplate, String>) -> ControlFlow<()>,
    ) {
        for template in templates {
            let mut emitted = false;
            for rating_id in self.rating_ids(template) {
                emitted = true;
                if visit(JoinRow::new(template.clone(), Some(rating_id.clone()))).is_break() {
                    return;
                }
            }
            if !emitted && visit(JoinRow::new(template.clone(), None)).is_break() {
                return;
            }
        }
    }
}

impl RowSource for TemplateRows<'_> {
    type Filter = TemplateFilter;
    type Parent = RatingTemplate;
    type Child = String;
    type Error = StorageError;

    fn scan(
        &self,
        filter: &TemplateFilter,
        skip_parents: u64,
        _limit_hint: u32,
        visit: &mut dyn FnMut(JoinRow<RatingTemplate, String>) -> ControlFlow<()>,
    ) -> Result<(), StorageError> {
        let templates = self
            .0
            .templates
            .values()
            .filter(|t| filter.matches(t))
            .skip(skip_parents as usize);
        self.walk(templates, visit);
        Ok(())
    }

    fn count(&self, filter: &TemplateFilter) -> Result<u64, StorageError> {
        Ok(self.0.templates.values().filter(|t| filter.matches(t)).count() as u64)
    }
}

/// Collect every row a source emits.
fn collect_rows<P, C>(emit: impl FnOnce(&mut dyn FnMut(JoinRow<P, C>) -> ControlFlow<()>)) -> Vec<JoinRow<P, C>> {
    let mut rows = Vec::new();
    emit(&mut |row| {
        rows.push(row);
        ControlFlow::Continue(())
    });
    rows
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    // --- Offices -------------------------------------------------------------

    async fn put_office(&self, office: &Office) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        if inner.offices.contains_key(&office.name) {
            return Err(StorageError::Conflict(format!(
                "office {} already exists",
                office.name
            )));
        }
        inner.offices.insert(office.name.clone(), office.clone());
        Ok(())
    }

    async fn list_offices(&self) -> Result<Vec<Office>, StorageError> {
        Ok(self.read()?.offices.values().cloned().collect())
    }

    async fn get_office(&self, name: &str) -> Result<Option<Office>, StorageError> {
        let inner = self.read()?;
        Ok(inner
            .offices
            .values()
            .find(|o| o.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    // --- Locations -----------------------------------------------------------

    async fn put_location(&self, location: &Location) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        let key = (location.office_id.clone(), location.name.clone());
        if inner.locations.contains_key(&key) {
            return Err(StorageError::Conflict(format!(
                "location {}/{} already exists",
                location.office_id, location.name
            )));
        }
        let mut bare = location.clone();
        let aliases = std::mem::take(&mut bare.aliases);
        inner.locations.insert(key.clone(), bare);
        if !aliases.is_empty() {
            inner.aliases.entry(key).or_default().extend(aliases);
        }
        Ok(())
    }

    async fn put_location_alias(&self, alias: &LocationAlias) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        let key = (alias.office_id.clone(), alias.location_id.clone());
        if !inner.locations.contains_key(&key) {
            return Err(StorageError::NotFound);
        }
        inner
            .aliases
            .entry(key)
            .or_default()
            .insert(alias.alias_id.clone());
        Ok(())
    }

    async fn get_location(&self, office: &str, name: &str) -> Result<Option<Location>, StorageError> {
        let inner = self.read()?;
        let filter = LocationFilter {
            office: Some(office.to_string()),
            names: None,
        };
        let rows = collect_rows(|visit| {
            LocationRows(&inner).walk(&filter, 0, &mut |row: JoinRow<Location, String>| {
                if row.parent.name.eq_ignore_ascii_case(name) {
                    visit(row)
                } else {
                    ControlFlow::Continue(())
                }
            })
        });
        let what = format!("location {office}/{name}");
        Ok(single(rows, &what)?.map(Group::assemble))
    }

    async fn locations_page(
        &self,
        filter: &LocationFilter,
        page: &PageParams,
    ) -> Result<Page<Location>, StorageError> {
        let inner = self.read()?;
        let source = LocationRows(&inner);
        let page = PagedQuery::new(&source).page(filter, &page.request())?;
        Ok(page.map(Group::assemble))
    }

    // --- Rating templates ----------------------------------------------------

    async fn put_rating_template(&self, template: &RatingTemplate) -> Result<(), StorageError> {
        check_template(template)?;
        let mut inner = self.write()?;
        let key = (template.office_id.clone(), template.id.clone());
        if inner.templates.contains_key(&key) {
            return Err(StorageError::Conflict(format!(
                "rating template {} already exists in office {}",
                template.id, template.office_id
            )));
        }
        let mut bare = template.clone();
        bare.rating_ids.clear();
        inner.templates.insert(key, bare);
        Ok(())
    }

    async fn put_rating_spec(&self, spec: &RatingSpec) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        let template_exists = inner
            .templates
            .contains_key(&(spec.office_id.clone(), spec.template_id.clone()));
        if !template_exists {
            return Err(StorageError::NotFound);
        }
        let key = (spec.office_id.clone(), spec.rating_id.clone());
        if inner.specs.contains_key(&key) {
            return Err(StorageError::Conflict(format!(
                "rating spec {} already exists in office {}",
                spec.rating_id, spec.office_id
            )));
        }
        inner.specs.insert(key, spec.clone());
        Ok(())
    }

    async fn get_rating_template(
        &self,
        office: Option<&str>,
        id: &str,
    ) -> Result<Option<RatingTemplate>, StorageError> {
        let inner = self.read()?;
        let source = TemplateRows(&inner);
        let matching = inner
            .templates
            .values()
            .filter(|t| office_matches(office, &t.office_id) && t.id.eq_ignore_ascii_case(id));
        let rows = collect_rows(|visit| source.walk(matching, visit));
        Ok(single(rows, &template_what(office, id))?.map(Group::assemble))
    }

    async fn rating_templates_page(
        &self,
        filter: &TemplateFilter,
        page: &PageParams,
    ) -> Result<Page<RatingTemplate>, StorageError> {
        let inner = self.read()?;
        let source = TemplateRows(&inner);
        let page = PagedQuery::new(&source).page(filter, &page.request())?;
        Ok(page.map(Group::assemble))
    }

    // --- Water users ---------------------------------------------------------

    async fn put_water_user(&self, user: &WaterUser) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        let key = (
            user.project_id.office_id.clone(),
            user.project_id.name.clone(),
            user.entity_name.clone(),
        );
        if inner.water_users.contains_key(&key) {
            return Err(StorageError::Conflict(format!(
                "water user {} already exists at project {}",
                user.entity_name, user.project_id.name
            )));
        }
        inner.water_users.insert(key, user.clone());
        Ok(())
    }

    async fn get_water_user(
        &self,
        office: &str,
        project: &str,
        entity_name: &str,
    ) -> Result<Option<WaterUser>, StorageError> {
        let inner = self.read()?;
        Ok(inner
            .water_users
            .values()
            .find(|w| {
                w.project_id.office_id.eq_ignore_ascii_case(office)
                    && w.project_id.name.eq_ignore_ascii_case(project)
                    && w.entity_name.eq_ignore_ascii_case(entity_name)
            })
            .cloned())
    }
}
