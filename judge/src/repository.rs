//! Defines the storage contract the judge consumes but never implements. Persistence, the HTTP
//! surface that front-ends it, and authentication all live outside this crate; `Repository` is
//! the narrow interface the core record-updating logic (see `record`) needs from whatever backing
//! store a deployment chooses.
//!

use std::collections::HashMap;
use std::time::Duration;

use super::{JudgeMode, LanguageTag};

/// Opaque identifier for a stored entity. Real implementations will likely wrap a database's
/// native ID type (an ObjectId, a UUID, a bigint primary key); callers outside the storage layer
/// never need to look inside one.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct EntityId(pub String);

/// A user account, as far as the judge needs to know about it.
#[derive(Clone, Debug)]
pub struct UserInfo {
    pub id: EntityId,
    pub name: String,
}

/// Metadata about a unit (a problem, or a set of objectives) without the objectives themselves.
#[derive(Clone, Debug)]
pub struct UnitInfo {
    pub id: EntityId,
    pub title: String,
    pub objective_count: usize,
}

/// A single objective belonging to a unit, as stored.
#[derive(Clone, Debug)]
pub struct StoredObjective {
    pub source_template: Vec<super::Region>,
    pub mode: JudgeMode,
    pub language: LanguageTag,
    pub time_limit: Duration,
    pub memory_limit: usize,
    pub points: Vec<super::DataPoint>,
    pub random_judge_script: Option<String>,
    pub special_judge_script: Option<String>,
}

/// A unit together with all of its objectives.
#[derive(Clone, Debug)]
pub struct Unit {
    pub info: UnitInfo,
    pub objectives: Vec<StoredObjective>,
}

/// One objective's worth of a user's best-known outcome for a unit.
#[derive(Clone, Debug)]
pub struct RecordEntry {
    pub passed: usize,
    pub total: usize,
    pub code: super::ResultCode,
}

/// A user's record for a unit: one `RecordEntry` per objective, indexed the same way the unit's
/// `objectives` vector is.
#[derive(Clone, Debug)]
pub struct Record {
    pub id: EntityId,
    pub user_id: EntityId,
    pub unit_id: EntityId,
    pub entries: Vec<Option<RecordEntry>>,
}

/// System-wide summary statistics.
#[derive(Clone, Debug)]
pub struct SystemStats {
    pub user_count: usize,
    pub unit_count: usize,
    pub record_count: usize,
}

/// The storage contract consumed by the judge. Every method here is a thin, mostly-atomic
/// primitive; composing them into higher-level decisions (e.g. "insert or conditionally update")
/// is the job of code in this crate, not of `Repository` implementations.
pub trait Repository {
    /// Look up a user by login name.
    fn find_user_by_name(&self, name: &str) -> std::result::Result<Option<UserInfo>, String>;

    /// Look up a user by id.
    fn find_user_by_id(&self, id: &EntityId) -> std::result::Result<Option<UserInfo>, String>;

    /// Replace a user's stored password hash.
    fn update_password(&self, id: &EntityId, password_hash: &str)
        -> std::result::Result<(), String>;

    /// Fetch a unit's metadata only, without its objectives.
    fn find_unit_info_by_id(&self, id: &EntityId)
        -> std::result::Result<Option<UnitInfo>, String>;

    /// Fetch a single objective of a unit by index, without the rest of the unit.
    fn find_partial_unit_by_id(&self, id: &EntityId, objective_index: usize)
        -> std::result::Result<Option<StoredObjective>, String>;

    /// Fetch a unit together with every objective it has.
    fn find_entire_unit_by_id(&self, id: &EntityId) -> std::result::Result<Option<Unit>, String>;

    /// Fetch a unit whose objectives are replaced by just the one named by `objective_index`,
    /// useful when only one objective needs to be judged but callers still want `Unit`-shaped
    /// data (e.g. to keep `objective_count` and the title available).
    fn find_unit_with_single_objective(&self, id: &EntityId, objective_index: usize)
        -> std::result::Result<Option<Unit>, String>;

    /// Insert a new unit, returning its assigned id.
    fn put_unit(&self, unit: &Unit) -> std::result::Result<EntityId, String>;

    /// Replace a unit's stored definition in place.
    fn update_unit(&self, unit: &Unit) -> std::result::Result<(), String>;

    /// List metadata for every unit in a group.
    fn list_unit_infos(&self, group_id: &EntityId) -> std::result::Result<Vec<UnitInfo>, String>;

    /// Look up a user's record for a unit.
    fn find_record(&self, user_id: &EntityId, unit_id: &EntityId)
        -> std::result::Result<Option<Record>, String>;

    /// Fetch a single entry of a record by objective index.
    fn get_record_entry(&self, user_id: &EntityId, unit_id: &EntityId, objective_index: usize)
        -> std::result::Result<Option<RecordEntry>, String>;

    /// List the most recent records for a user, newest first.
    fn recent_records_of(&self, user_id: &EntityId, limit: usize)
        -> std::result::Result<Vec<Record>, String>;

    /// Insert a brand-new record.
    fn insert_record(&self, record: &Record) -> std::result::Result<EntityId, String>;

    /// Atomically replace `entries[objective_index]` with `entry`, but only if doing so would not
    /// decrease the number of points passed (or, when the number passed is unchanged, would not
    /// decrease the point total the submission was judged against). Returns whether the write was
    /// applied.
    fn update_record_entry_if_improved(
        &self,
        user_id: &EntityId,
        unit_id: &EntityId,
        objective_index: usize,
        entry: &RecordEntry,
    ) -> std::result::Result<bool, String>;

    /// List every group the judge knows about, mapped to its member count.
    fn list_groups(&self) -> std::result::Result<HashMap<String, usize>, String>;

    /// Compute system-wide summary statistics: total users, units, and records.
    fn stats(&self) -> std::result::Result<SystemStats, String>;
}
