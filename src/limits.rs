/*!
# Resource limits

The scanner reports every span it consumes from a general entity to a
[`LimitAnalyzer`]. The analyzer keeps the running values; a
[`SecurityLimits`] implementation decides whether they are acceptable.
[`SecurityManager`] is the default implementation, configurable by API
and through environment variables.
*/
use std::collections::HashMap;
use std::env;
use std::fmt;

use smartstring::alias::String as SmartString;

/// Kinds of limits enforced while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
	/// Characters produced by a single expansion of a general entity.
	GeneralEntitySize,
	/// Length of a single name.
	MaxNameLength,
	/// Element starts and attribute names produced inside general
	/// entities.
	EntityReplacement,
	/// Characters produced by all general entity expansions together.
	TotalEntitySize,
}

const NLIMITS: usize = 4;

impl Limit {
	pub const ALL: [Limit; NLIMITS] = [
		Limit::GeneralEntitySize,
		Limit::MaxNameLength,
		Limit::EntityReplacement,
		Limit::TotalEntitySize,
	];

	fn index(self) -> usize {
		match self {
			Self::GeneralEntitySize => 0,
			Self::MaxNameLength => 1,
			Self::EntityReplacement => 2,
			Self::TotalEntitySize => 3,
		}
	}

	/// Message key used when the limit is exceeded.
	pub fn key(self) -> &'static str {
		match self {
			Self::GeneralEntitySize => "MaxGeneralEntitySizeLimit",
			Self::MaxNameLength => "MaxXMLNameLimit",
			Self::EntityReplacement => "EntityReplacementLimit",
			Self::TotalEntitySize => "TotalEntitySizeLimit",
		}
	}

	/// Built-in maximum; zero means unlimited.
	pub fn default_max(self) -> usize {
		match self {
			Self::GeneralEntitySize => 0,
			Self::MaxNameLength => 1000,
			Self::EntityReplacement => 3_000_000,
			Self::TotalEntitySize => 50_000_000,
		}
	}

	/// Environment variable read by [`SecurityManager::from_env`].
	pub fn env_var(self) -> &'static str {
		match self {
			Self::GeneralEntitySize => "XESCAN_MAX_GENERAL_ENTITY_SIZE",
			Self::MaxNameLength => "XESCAN_MAX_NAME_LENGTH",
			Self::EntityReplacement => "XESCAN_ENTITY_REPLACEMENT_LIMIT",
			Self::TotalEntitySize => "XESCAN_TOTAL_ENTITY_SIZE",
		}
	}
}

impl fmt::Display for Limit {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			Self::GeneralEntitySize => "general entity size limit",
			Self::MaxNameLength => "name length limit",
			Self::EntityReplacement => "entity replacement limit",
			Self::TotalEntitySize => "total entity size limit",
		})
	}
}

/// Where a limit value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSource {
	/// Built-in default.
	Default,
	/// Read from the environment.
	Environment,
	/// Set through the API.
	Api,
}

impl LimitSource {
	/// Literal naming the source in error messages.
	pub fn literal(self) -> &'static str {
		match self {
			Self::Default => "default",
			Self::Environment => "environment variable",
			Self::Api => "property",
		}
	}
}

/**
# Threshold configuration consulted by the scanner

Implementations must be pure: the scanner may query them any number of
times per scanned span.
*/
pub trait SecurityLimits {
	/// Return true if the value accumulated by `analyzer` for `limit`
	/// exceeds the configured maximum.
	fn is_over_limit(&self, limit: Limit, analyzer: &LimitAnalyzer) -> bool;

	/// Configured maximum for `limit`; zero means unlimited.
	fn limit(&self, limit: Limit) -> usize;

	/// Where the maximum for `limit` was configured.
	fn source(&self, limit: Limit) -> LimitSource;
}

/// Default [`SecurityLimits`] implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityManager {
	values: [usize; NLIMITS],
	sources: [LimitSource; NLIMITS],
}

impl SecurityManager {
	/// Create a manager with the built-in defaults.
	pub fn new() -> Self {
		let mut values = [0usize; NLIMITS];
		for limit in Limit::ALL.iter() {
			values[limit.index()] = limit.default_max();
		}
		Self{
			values,
			sources: [LimitSource::Default; NLIMITS],
		}
	}

	/// Create a manager which enforces nothing.
	pub fn unlimited() -> Self {
		Self{
			values: [0; NLIMITS],
			sources: [LimitSource::Api; NLIMITS],
		}
	}

	/// Create a manager with the built-in defaults, overridden by the
	/// environment variables named by [`Limit::env_var`].
	pub fn from_env() -> Self {
		Self::new().apply_overrides(|name| env::var(name).ok())
	}

	/// Override limits from a key-value lookup.
	///
	/// Values which do not parse as unsigned integers are skipped with a
	/// warning.
	pub fn apply_overrides<F: Fn(&str) -> Option<String>>(mut self, lookup: F) -> Self {
		for limit in Limit::ALL.iter() {
			let raw = match lookup(limit.env_var()) {
				Some(v) => v,
				None => continue,
			};
			match raw.trim().parse::<usize>() {
				Ok(v) => {
					self.values[limit.index()] = v;
					self.sources[limit.index()] = LimitSource::Environment;
				}
				Err(e) => {
					log::warn!("ignoring {}={:?}: {}", limit.env_var(), raw, e);
				}
			}
		}
		self
	}

	/// Set a limit; zero disables it.
	pub fn with_limit(mut self, limit: Limit, max: usize) -> Self {
		self.set_limit(limit, max);
		self
	}

	/// Set a limit in place; zero disables it.
	pub fn set_limit(&mut self, limit: Limit, max: usize) {
		self.values[limit.index()] = max;
		self.sources[limit.index()] = LimitSource::Api;
	}
}

impl Default for SecurityManager {
	fn default() -> Self {
		Self::new()
	}
}

impl SecurityLimits for SecurityManager {
	fn is_over_limit(&self, limit: Limit, analyzer: &LimitAnalyzer) -> bool {
		let max = self.values[limit.index()];
		max != 0 && analyzer.value(limit) > max
	}

	fn limit(&self, limit: Limit) -> usize {
		self.values[limit.index()]
	}

	fn source(&self, limit: Limit) -> LimitSource {
		self.sources[limit.index()]
	}
}

/**
# Running values for all limits

How a value is accumulated depends on the limit:

* [`Limit::GeneralEntitySize`] is summed per entity name; the reported
  value is the largest per-entity sum. The per-entity sum is dropped when
  the entity ends, so the limit applies per expansion.
* [`Limit::MaxNameLength`] holds the most recently observed name length.
* [`Limit::EntityReplacement`] and [`Limit::TotalEntitySize`] are plain
  sums. Every general entity size observation also counts towards the
  total.
*/
#[derive(Debug, Clone, Default)]
pub struct LimitAnalyzer {
	values: [usize; NLIMITS],
	top_entity: Option<SmartString>,
	per_entity: HashMap<SmartString, usize>,
}

impl LimitAnalyzer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Account `value` for `limit` on behalf of the entity `entity`.
	pub fn add_value(&mut self, limit: Limit, entity: &str, value: usize) {
		match limit {
			Limit::MaxNameLength => {
				self.values[limit.index()] = value;
			}
			Limit::EntityReplacement | Limit::TotalEntitySize => {
				let slot = &mut self.values[limit.index()];
				*slot = slot.saturating_add(value);
			}
			Limit::GeneralEntitySize => {
				let accumulated = match self.per_entity.get_mut(entity) {
					Some(v) => {
						*v = v.saturating_add(value);
						*v
					}
					None => {
						self.per_entity.insert(entity.into(), value);
						value
					}
				};
				if accumulated > self.values[limit.index()] {
					self.values[limit.index()] = accumulated;
					self.top_entity = Some(entity.into());
				}
				let total = &mut self.values[Limit::TotalEntitySize.index()];
				*total = total.saturating_add(value);
			}
		}
	}

	/// Current value for `limit`.
	pub fn value(&self, limit: Limit) -> usize {
		self.values[limit.index()]
	}

	/// Accumulated size of the current expansion of `entity`.
	pub fn entity_value(&self, entity: &str) -> usize {
		self.per_entity.get(entity).copied().unwrap_or(0)
	}

	/// Entity holding the largest [`Limit::GeneralEntitySize`] value.
	pub fn top_entity(&self) -> Option<&str> {
		self.top_entity.as_ref().map(|s| s.as_str())
	}

	/// Forget the per-expansion size of `entity`.
	pub fn end_entity(&mut self, entity: &str) {
		self.per_entity.remove(entity);
		// the maximum belongs to a finished expansion now
		if self.top_entity.as_ref().map(|s| s.as_str()) == Some(entity) {
			self.values[Limit::GeneralEntitySize.index()] = self.per_entity.values().copied().max().unwrap_or(0);
			self.top_entity = None;
		}
	}

	/// Drop all accumulated values.
	pub fn reset(&mut self) {
		*self = Self::default();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn general_entity_size_is_tracked_per_entity_and_totalled() {
		let mut a = LimitAnalyzer::new();
		a.add_value(Limit::GeneralEntitySize, "a", 5);
		a.add_value(Limit::GeneralEntitySize, "b", 3);
		a.add_value(Limit::GeneralEntitySize, "a", 2);
		assert_eq!(a.value(Limit::GeneralEntitySize), 7);
		assert_eq!(a.entity_value("b"), 3);
		assert_eq!(a.top_entity(), Some("a"));
		assert_eq!(a.value(Limit::TotalEntitySize), 10);
	}

	#[test]
	fn ending_an_entity_resets_its_expansion_size() {
		let mut a = LimitAnalyzer::new();
		a.add_value(Limit::GeneralEntitySize, "a", 5);
		a.add_value(Limit::GeneralEntitySize, "b", 3);
		a.end_entity("a");
		assert_eq!(a.entity_value("a"), 0);
		assert_eq!(a.value(Limit::GeneralEntitySize), 3);
		assert_eq!(a.value(Limit::TotalEntitySize), 8);
		a.add_value(Limit::GeneralEntitySize, "a", 1);
		assert_eq!(a.entity_value("a"), 1);
	}

	#[test]
	fn name_length_holds_last_value_and_replacement_sums() {
		let mut a = LimitAnalyzer::new();
		a.add_value(Limit::MaxNameLength, "", 10);
		a.add_value(Limit::MaxNameLength, "", 4);
		assert_eq!(a.value(Limit::MaxNameLength), 4);
		a.add_value(Limit::EntityReplacement, "x", 1);
		a.add_value(Limit::EntityReplacement, "y", 1);
		assert_eq!(a.value(Limit::EntityReplacement), 2);
	}

	#[test]
	fn security_manager_defaults_and_overrides() {
		let mgr = SecurityManager::new();
		assert_eq!(mgr.limit(Limit::MaxNameLength), 1000);
		assert_eq!(mgr.limit(Limit::GeneralEntitySize), 0);
		assert_eq!(mgr.source(Limit::MaxNameLength), LimitSource::Default);

		let mgr = mgr.with_limit(Limit::GeneralEntitySize, 10);
		assert_eq!(mgr.source(Limit::GeneralEntitySize), LimitSource::Api);

		let mut a = LimitAnalyzer::new();
		a.add_value(Limit::GeneralEntitySize, "e", 10);
		assert!(!mgr.is_over_limit(Limit::GeneralEntitySize, &a));
		a.add_value(Limit::GeneralEntitySize, "e", 1);
		assert!(mgr.is_over_limit(Limit::GeneralEntitySize, &a));
	}

	#[test]
	fn zero_disables_a_limit() {
		let mgr = SecurityManager::unlimited();
		let mut a = LimitAnalyzer::new();
		a.add_value(Limit::MaxNameLength, "", usize::MAX);
		assert!(!mgr.is_over_limit(Limit::MaxNameLength, &a));
	}

	#[test]
	fn overrides_from_lookup_skip_garbage() {
		let mgr = SecurityManager::new().apply_overrides(|name| match name {
			"XESCAN_MAX_NAME_LENGTH" => Some("12".to_string()),
			"XESCAN_TOTAL_ENTITY_SIZE" => Some("lots".to_string()),
			_ => None,
		});
		assert_eq!(mgr.limit(Limit::MaxNameLength), 12);
		assert_eq!(mgr.source(Limit::MaxNameLength), LimitSource::Environment);
		assert_eq!(mgr.limit(Limit::TotalEntitySize), 50_000_000);
		assert_eq!(mgr.source(Limit::TotalEntitySize), LimitSource::Default);
	}
}
