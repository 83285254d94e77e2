use crate::error::{LimitViolation, Result};
use crate::limits::Limit;

use super::{EntityScanner, NameType};

impl EntityScanner {
	/// Account `length` chars consumed from the current entity.
	///
	/// Only general entities are subject to the size limits. Element
	/// starts and attribute names additionally count as replacements.
	pub(super) fn check_entity_limit(&mut self, nt: Option<NameType>, length: usize) -> Result<()> {
		match self.entities.last() {
			Some(e) if e.is_ge => (),
			_ => return Ok(()),
		}
		if nt != Some(NameType::Reference) {
			self.check_limit(Limit::GeneralEntitySize, length)?;
		}
		if let Some(NameType::ElementStart) | Some(NameType::AttributeName) = nt {
			self.check_limit(Limit::EntityReplacement, 1)?;
		}
		Ok(())
	}

	/// Add `value` for `limit` and fail if it, or the total entity size,
	/// is now over the configured maximum.
	pub(super) fn check_limit(&mut self, limit: Limit, value: usize) -> Result<()> {
		let Self{entities, analyzer, security, ..} = self;
		let name = entities.last().map(|e| e.name.as_str()).unwrap_or("");
		analyzer.add_value(limit, name, value);

		let exceeded = if security.is_over_limit(limit, analyzer) {
			Some(limit)
		} else if limit != Limit::TotalEntitySize && security.is_over_limit(Limit::TotalEntitySize, analyzer) {
			Some(Limit::TotalEntitySize)
		} else {
			None
		};
		let limit = match exceeded {
			Some(limit) => limit,
			None => return Ok(()),
		};
		let entity = match limit {
			Limit::GeneralEntitySize => analyzer.top_entity().map(|s| s.to_string()),
			Limit::MaxNameLength => Some(name.to_string()),
			Limit::EntityReplacement | Limit::TotalEntitySize => None,
		};
		let violation = LimitViolation{
			limit,
			entity,
			value: analyzer.value(limit),
			max: security.limit(limit),
			source: security.source(limit),
		};
		log::warn!("{}", violation);
		Err(violation.into())
	}
}
