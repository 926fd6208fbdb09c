use serde::Serialize;
use ttb_core::CompanyRecord;

/// Counts over a final result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub total: usize,
    pub with_coordinates: usize,
    pub with_contact: usize,
    pub with_executives: usize,
    pub active: usize,
    pub with_email: usize,
    pub with_phone: usize,
    pub with_website: usize,
}

impl SearchStats {
    #[must_use]
    pub fn from_records(records: &[CompanyRecord]) -> Self {
        let count = |pred: fn(&CompanyRecord) -> bool| records.iter().filter(|r| pred(r)).count();
        Self {
            total: records.len(),
            with_coordinates: count(|r| r.coordinates.is_some()),
            with_contact: count(CompanyRecord::has_contact),
            with_executives: count(|r| !r.executives.is_empty()),
            active: count(CompanyRecord::is_active),
            with_email: count(|r| r.email().is_some()),
            with_phone: count(|r| r.phone().is_some()),
            with_website: count(|r| r.website().is_some()),
        }
    }
}
