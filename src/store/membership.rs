//! Set-difference planning for employee department memberships.
//!
//! The planner never touches the database: it turns the current membership
//! and the requested one into the minimal set of association rows to insert
//! and to delete.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MembershipPlan {
    /// Requested ids not yet associated, in request order.
    pub insert: Vec<Uuid>,
    /// Current ids absent from the request, sorted.
    pub delete: Vec<Uuid>,
}

pub fn parse_department_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidDepartment(format!("Invalid department ID: {}", raw)))
}

/// Parses every id, failing on the first malformed one, and drops duplicates
/// while keeping the first occurrence's position.
pub fn parse_department_ids(raw: &[String]) -> Result<Vec<Uuid>, AppError> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut ids = Vec::with_capacity(raw.len());
    for id in raw {
        let id = parse_department_id(id)?;
        if seen.insert(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

pub fn plan(current: &[Uuid], requested: &[String]) -> Result<MembershipPlan, AppError> {
    // false until the request confirms the membership
    let mut confirmed: HashMap<Uuid, bool> = current.iter().map(|id| (*id, false)).collect();
    let mut plan = MembershipPlan::default();

    for id in parse_department_ids(requested)? {
        match confirmed.get_mut(&id) {
            Some(kept) => *kept = true,
            None => plan.insert.push(id),
        }
    }

    plan.delete = confirmed
        .into_iter()
        .filter_map(|(id, kept)| (!kept).then_some(id))
        .collect();
    plan.delete.sort();

    Ok(plan)
}
