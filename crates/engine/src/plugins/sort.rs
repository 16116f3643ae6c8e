//! Sort plugin
//!
//! Exports:
//! - stage `tfSort` (priority 0 unless configured)
//! - state `sort`, `direction` (URL-backed, writable)
//! - mutators `setSort`, `setDirection`, `toggleDirection`, `invalidateSortCache`
//! - misc `options` (sortable fields in declaration order)

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use log::debug;
use plugtable_core::{parse, Encodable, FieldConfig, Location, StateUrl, ToEncodable};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::sort_cache::SortCache;
use crate::columns::{Columns, Compare};
use crate::error::PluginError;
use crate::plugin::{arg, Mutator, Plugin, StateCell};
use crate::stage::StageDecl;

pub const SORT_STAGE: &str = "tfSort";

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(format!("unknown direction `{}`", other)),
        }
    }
}

impl ToEncodable for Direction {
    fn to_encodable(&self) -> Encodable {
        Encodable::Text(self.as_str().to_string())
    }
}

// =============================================================================
// Builder
// =============================================================================

pub struct SortBuilder<T> {
    comparators: Vec<(String, Compare<T>)>,
    fallback: Option<(String, Direction)>,
    sort_key: String,
    direction_key: String,
    priority: i64,
}

impl<T> Default for SortBuilder<T> {
    fn default() -> Self {
        Self {
            comparators: Vec::new(),
            fallback: None,
            sort_key: "sort".to_string(),
            direction_key: "direction".to_string(),
            priority: 0,
        }
    }
}

impl<T: Clone + PartialEq + 'static> SortBuilder<T> {
    /// Register a comparator for `field`. Registering a field twice replaces it.
    pub fn comparator<F>(mut self, field: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&T, &T) -> std::cmp::Ordering + 'static,
    {
        let field = field.into();
        let compare: Compare<T> = Rc::new(compare);
        match self.comparators.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = compare,
            None => self.comparators.push((field, compare)),
        }
        self
    }

    /// Sort used when the URL has none (default: first comparator, ascending)
    pub fn fallback(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.fallback = Some((field.into(), direction));
        self
    }

    /// Query parameter names for the field and the direction
    pub fn keys(mut self, sort_key: impl Into<String>, direction_key: impl Into<String>) -> Self {
        self.sort_key = sort_key.into();
        self.direction_key = direction_key.into();
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn build(self, location: Rc<dyn Location>) -> Result<SortPlugin<T>, PluginError> {
        let Some((first, _)) = self.comparators.first() else {
            return Err(PluginError::Config("sort plugin needs at least one comparator".into()));
        };
        let (fallback_sort, fallback_direction) =
            self.fallback.unwrap_or_else(|| (first.clone(), Direction::Asc));
        if !self.comparators.iter().any(|(f, _)| *f == fallback_sort) {
            return Err(PluginError::Config(format!(
                "fallback sort field `{}` has no comparator",
                fallback_sort
            )));
        }

        let options: Vec<String> = self.comparators.iter().map(|(f, _)| f.clone()).collect();
        let allowed = options.clone();
        let (sort_url, sort) = StateUrl::open(
            FieldConfig::new(
                self.sort_key,
                move |raw| parse::one_of(raw, allowed.as_slice()),
                fallback_sort,
            ),
            location.clone(),
        );
        let (direction_url, direction) = StateUrl::open(
            FieldConfig::new(self.direction_key, parse::required::<Direction>, fallback_direction),
            location,
        );
        debug!("sort plugin: {} {} (options: {})", sort, direction, options.join(", "));

        Ok(SortPlugin {
            comparators: self.comparators,
            options,
            sort,
            direction,
            sort_url,
            direction_url,
            priority: self.priority,
            cache: SortCache::new(),
        })
    }
}

// =============================================================================
// Plugin
// =============================================================================

pub struct SortPlugin<T> {
    comparators: Vec<(String, Compare<T>)>,
    options: Vec<String>,
    sort: String,
    direction: Direction,
    sort_url: StateUrl<String>,
    direction_url: StateUrl<Direction>,
    priority: i64,
    cache: SortCache<T>,
}

impl<T: Clone + PartialEq + 'static> SortPlugin<T> {
    pub fn builder() -> SortBuilder<T> {
        SortBuilder::default()
    }

    /// Builder preloaded with the comparators of the sortable columns
    pub fn from_columns(columns: &Columns<T>) -> SortBuilder<T> {
        SortBuilder {
            comparators: columns.comparators(),
            ..SortBuilder::default()
        }
    }

    pub fn sort(&self) -> &str {
        &self.sort
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn cache(&self) -> &SortCache<T> {
        &self.cache
    }

    pub fn set_sort(&mut self, field: &str) -> Result<(), PluginError> {
        if !self.options.iter().any(|f| f == field) {
            return Err(PluginError::invalid_argument(
                "setSort",
                format!("`{}` is not one of {:?}", field, self.options),
            ));
        }
        let field = field.to_string();
        self.sort_url.update(&self.sort, &field);
        self.sort = field;
        Ok(())
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction_url.update(&self.direction, &direction);
        self.direction = direction;
    }

    pub fn invalidate_cache(&mut self) {
        debug!("sort cache invalidated ({} entries)", self.cache.len());
        self.cache.clear();
    }

    fn sorted(&mut self, rows: &[T]) -> Result<Vec<T>, PluginError> {
        let compare = self
            .comparators
            .iter()
            .find(|(f, _)| *f == self.sort)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| PluginError::Failed(format!("no comparator for `{}`", self.sort)))?;
        Ok(self
            .cache
            .sorted(rows, &self.sort, self.direction, |a, b| compare(a, b)))
    }
}

impl<T: Clone + PartialEq + 'static> Plugin<T> for SortPlugin<T> {
    fn name(&self) -> &str {
        "sort"
    }

    fn stages(&self) -> Vec<StageDecl> {
        vec![StageDecl::new(SORT_STAGE, Some(self.priority))]
    }

    fn run_stage(&mut self, key: &str, rows: &[T]) -> Result<Vec<T>, PluginError> {
        match key {
            SORT_STAGE => self.sorted(rows),
            _ => Err(PluginError::UnknownStage(key.to_string())),
        }
    }

    fn state(&self) -> Vec<(String, StateCell)> {
        vec![
            ("sort".into(), StateCell::writable(json!(self.sort), SORT_STAGE)),
            ("direction".into(), StateCell::writable(json!(self.direction), SORT_STAGE)),
        ]
    }

    fn set_state(&mut self, name: &str, value: Value) -> Result<(), PluginError> {
        match name {
            "sort" => self.set_sort(&arg::<String>(name, value)?),
            "direction" => {
                self.set_direction(arg(name, value)?);
                Ok(())
            }
            _ => Err(PluginError::UnknownState(name.to_string())),
        }
    }

    fn mutators(&self) -> Vec<Mutator> {
        vec![
            Mutator::new("setSort", Some(SORT_STAGE)),
            Mutator::new("setDirection", Some(SORT_STAGE)),
            Mutator::new("toggleDirection", Some(SORT_STAGE)),
            Mutator::new("invalidateSortCache", Some(SORT_STAGE)),
        ]
    }

    fn apply(&mut self, name: &str, value: Value) -> Result<(), PluginError> {
        match name {
            "setSort" => self.set_sort(&arg::<String>(name, value)?),
            "setDirection" => {
                self.set_direction(arg(name, value)?);
                Ok(())
            }
            "toggleDirection" => {
                self.set_direction(self.direction.toggled());
                Ok(())
            }
            "invalidateSortCache" => {
                self.invalidate_cache();
                Ok(())
            }
            _ => Err(PluginError::UnknownMutator(name.to_string())),
        }
    }

    fn misc(&self) -> Vec<(String, Value)> {
        vec![("options".into(), json!(self.options))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugtable_core::MemoryLocation;

    #[derive(Debug, Clone, PartialEq)]
    struct Hero {
        id: u32,
        power: i32,
    }

    fn heroes() -> Vec<Hero> {
        vec![
            Hero { id: 1, power: 50 },
            Hero { id: 2, power: 10 },
            Hero { id: 3, power: 30 },
        ]
    }

    fn ids(rows: &[Hero]) -> Vec<u32> {
        rows.iter().map(|h| h.id).collect()
    }

    fn plugin(location: Rc<MemoryLocation>) -> SortPlugin<Hero> {
        SortPlugin::builder()
            .comparator("id", |a: &Hero, b: &Hero| a.id.cmp(&b.id))
            .comparator("power", |a: &Hero, b: &Hero| a.power.cmp(&b.power))
            .fallback("id", Direction::Asc)
            .build(location)
            .unwrap()
    }

    #[test]
    fn test_reads_url() {
        let location = Rc::new(MemoryLocation::with_query("sort=power&direction=desc"));
        let mut sort = plugin(location);
        assert_eq!(sort.sort(), "power");
        assert_eq!(sort.direction(), Direction::Desc);
        assert_eq!(ids(&sort.run_stage(SORT_STAGE, &heroes()).unwrap()), vec![1, 3, 2]);
    }

    #[test]
    fn test_unknown_url_field_falls_back() {
        let location = Rc::new(MemoryLocation::with_query("sort=name&direction=up"));
        let sort = plugin(location);
        assert_eq!(sort.sort(), "id");
        assert_eq!(sort.direction(), Direction::Asc);
    }

    #[test]
    fn test_does_not_mutate_input() {
        let mut sort = plugin(Rc::new(MemoryLocation::with_query("sort=power")));
        let rows = heroes();
        let sorted = sort.run_stage(SORT_STAGE, &rows).unwrap();
        assert_eq!(ids(&sorted), vec![2, 3, 1]);
        assert_eq!(ids(&rows), vec![1, 2, 3]);
    }

    #[test]
    fn test_mutators_write_url() {
        let location = Rc::new(MemoryLocation::default());
        let mut sort = plugin(location.clone());

        sort.apply("setSort", json!("power")).unwrap();
        sort.apply("toggleDirection", Value::Null).unwrap();
        assert_eq!(location.query().to_string(), "sort=power&direction=desc");

        // Same value again does not touch the URL
        let before = location.replacements();
        sort.apply("setDirection", json!("desc")).unwrap();
        assert_eq!(location.replacements(), before);
    }

    #[test]
    fn test_set_sort_rejects_unknown_field() {
        let location = Rc::new(MemoryLocation::default());
        let mut sort = plugin(location.clone());
        let err = sort.apply("setSort", json!("name")).unwrap_err();
        assert!(matches!(err, PluginError::InvalidArgument { .. }));
        assert_eq!(sort.sort(), "id");
        assert_eq!(location.replacements(), 0);
    }

    #[test]
    fn test_invalidate_clears_cache() {
        let mut sort = plugin(Rc::new(MemoryLocation::default()));
        sort.run_stage(SORT_STAGE, &heroes()).unwrap();
        assert_eq!(sort.cache().len(), 1);

        sort.apply("invalidateSortCache", Value::Null).unwrap();
        assert!(sort.cache().is_empty());
    }

    #[test]
    fn test_build_errors() {
        let location: Rc<dyn Location> = Rc::new(MemoryLocation::default());
        assert!(matches!(
            SortPlugin::<Hero>::builder().build(location.clone()),
            Err(PluginError::Config(_))
        ));
        assert!(matches!(
            SortPlugin::builder()
                .comparator("id", |a: &Hero, b: &Hero| a.id.cmp(&b.id))
                .fallback("power", Direction::Asc)
                .build(location),
            Err(PluginError::Config(_))
        ));
    }

    #[test]
    fn test_custom_keys() {
        let location = Rc::new(MemoryLocation::with_query("s=power&d=desc"));
        let sort = SortPlugin::builder()
            .comparator("id", |a: &Hero, b: &Hero| a.id.cmp(&b.id))
            .comparator("power", |a: &Hero, b: &Hero| a.power.cmp(&b.power))
            .keys("s", "d")
            .build(location)
            .unwrap();
        assert_eq!(sort.sort(), "power");
        assert_eq!(sort.direction(), Direction::Desc);
        assert_eq!(sort.misc(), vec![("options".to_string(), json!(["id", "power"]))]);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("desc".parse::<Direction>(), Ok(Direction::Desc));
        assert!("DESC".parse::<Direction>().is_err());
        assert_eq!(json!(Direction::Asc), json!("asc"));
    }
}
