//! The record updater: decides whether a freshly-judged objective result should become part of a
//! user's best-known record for a unit, and applies that decision through the `Repository`
//! contract.
//!
//! A record's `passed` count for an objective must never decrease; once a user has solved an
//! objective with more passing data points (or, all else equal, against a stricter point total)
//! than before, a later worse attempt must not overwrite that.
//!

use super::repository::{EntityId, Record, RecordEntry, Repository};

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    errors {
        Storage(message: String) {
            description("repository operation failed")
            display("repository operation failed: {}", message)
        }

        UnknownUnit(id: String) {
            description("unit not found")
            display("unit not found: {}", id)
        }
    }
}

fn storage_err(message: String) -> Error {
    Error::from(ErrorKind::Storage(message))
}

/// Apply `entry` as the result of judging `objective_index` of `unit_id` for `user_id`.
///
/// If the user has no record for this unit yet, one is created with every other objective's entry
/// left unset. Otherwise the existing record's entry for `objective_index` is updated only if
/// `entry` does not represent a regression, via `Repository::update_record_entry_if_improved`
/// (the conditional compare-and-set is performed by the storage layer itself, the same way a
/// document store would apply a filtered update).
///
/// Returns the id of a newly created record (`None` if an existing record was updated instead),
/// together with whether the entry was actually applied.
pub fn update_record(
    repo: &dyn Repository,
    user_id: &EntityId,
    unit_id: &EntityId,
    objective_index: usize,
    entry: RecordEntry,
) -> Result<(Option<EntityId>, bool)> {
    let existing = repo.find_record(user_id, unit_id).map_err(storage_err)?;

    match existing {
        Some(_) => {
            let applied = repo
                .update_record_entry_if_improved(user_id, unit_id, objective_index, &entry)
                .map_err(storage_err)?;
            Ok((None, applied))
        },
        None => {
            let unit_info = repo.find_unit_info_by_id(unit_id)
                .map_err(storage_err)?
                .ok_or_else(|| Error::from(ErrorKind::UnknownUnit(unit_id.0.clone())))?;

            let mut entries = vec![None; unit_info.objective_count];
            if objective_index >= entries.len() {
                entries.resize(objective_index + 1, None);
            }
            entries[objective_index] = Some(entry);

            let record = Record {
                id: EntityId(String::new()),
                user_id: user_id.clone(),
                unit_id: unit_id.clone(),
                entries,
            };
            let id = repo.insert_record(&record).map_err(storage_err)?;
            Ok((Some(id), true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{StoredObjective, SystemStats, Unit, UnitInfo, UserInfo};
    use crate::ResultCode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A trivial in-memory `Repository` used only to exercise `update_record`'s decision logic.
    struct MemRepo {
        units: HashMap<String, UnitInfo>,
        records: Mutex<HashMap<(String, String), Record>>,
    }

    impl MemRepo {
        fn with_unit(id: &str, objective_count: usize) -> Self {
            let mut units = HashMap::new();
            units.insert(id.to_owned(), UnitInfo {
                id: EntityId(id.to_owned()),
                title: String::new(),
                objective_count,
            });
            MemRepo { units, records: Mutex::new(HashMap::new()) }
        }
    }

    impl Repository for MemRepo {
        fn find_user_by_name(&self, _: &str) -> std::result::Result<Option<UserInfo>, String> {
            unimplemented!()
        }
        fn find_user_by_id(&self, _: &EntityId) -> std::result::Result<Option<UserInfo>, String> {
            unimplemented!()
        }
        fn update_password(&self, _: &EntityId, _: &str) -> std::result::Result<(), String> {
            unimplemented!()
        }
        fn find_unit_info_by_id(&self, id: &EntityId)
            -> std::result::Result<Option<UnitInfo>, String> {
            Ok(self.units.get(&id.0).cloned())
        }
        fn find_partial_unit_by_id(&self, _: &EntityId, _: usize)
            -> std::result::Result<Option<StoredObjective>, String> {
            unimplemented!()
        }
        fn find_entire_unit_by_id(&self, _: &EntityId) -> std::result::Result<Option<Unit>, String> {
            unimplemented!()
        }
        fn find_unit_with_single_objective(&self, _: &EntityId, _: usize)
            -> std::result::Result<Option<Unit>, String> {
            unimplemented!()
        }
        fn put_unit(&self, _: &Unit) -> std::result::Result<EntityId, String> {
            unimplemented!()
        }
        fn update_unit(&self, _: &Unit) -> std::result::Result<(), String> {
            unimplemented!()
        }
        fn list_unit_infos(&self, _: &EntityId) -> std::result::Result<Vec<UnitInfo>, String> {
            unimplemented!()
        }
        fn find_record(&self, user_id: &EntityId, unit_id: &EntityId)
            -> std::result::Result<Option<Record>, String> {
            Ok(self.records.lock().unwrap().get(&(user_id.0.clone(), unit_id.0.clone())).cloned())
        }
        fn get_record_entry(&self, _: &EntityId, _: &EntityId, _: usize)
            -> std::result::Result<Option<RecordEntry>, String> {
            unimplemented!()
        }
        fn recent_records_of(&self, _: &EntityId, _: usize)
            -> std::result::Result<Vec<Record>, String> {
            unimplemented!()
        }
        fn insert_record(&self, record: &Record) -> std::result::Result<EntityId, String> {
            let id = EntityId(format!("{}:{}", record.user_id.0, record.unit_id.0));
            let mut record = record.clone();
            record.id = id.clone();
            self.records.lock().unwrap()
                .insert((record.user_id.0.clone(), record.unit_id.0.clone()), record);
            Ok(id)
        }
        fn update_record_entry_if_improved(
            &self,
            user_id: &EntityId,
            unit_id: &EntityId,
            objective_index: usize,
            entry: &RecordEntry,
        ) -> std::result::Result<bool, String> {
            let mut records = self.records.lock().unwrap();
            let record = records.get_mut(&(user_id.0.clone(), unit_id.0.clone())).unwrap();
            let improved = match &record.entries[objective_index] {
                Some(existing) => entry.passed >= existing.passed,
                None => true,
            };
            if improved {
                record.entries[objective_index] = Some(entry.clone());
            }
            Ok(improved)
        }
        fn list_groups(&self) -> std::result::Result<HashMap<String, usize>, String> {
            unimplemented!()
        }
        fn stats(&self) -> std::result::Result<SystemStats, String> {
            unimplemented!()
        }
    }

    fn entry(passed: usize, total: usize) -> RecordEntry {
        RecordEntry { passed, total, code: ResultCode::WA }
    }

    #[test]
    fn first_attempt_creates_a_record() {
        let repo = MemRepo::with_unit("u1", 3);
        let (id, applied) = update_record(
            &repo, &EntityId("alice".into()), &EntityId("u1".into()), 1, entry(2, 5)).unwrap();

        assert!(id.is_some());
        assert!(applied);
    }

    #[test]
    fn worse_attempt_does_not_overwrite() {
        let repo = MemRepo::with_unit("u1", 3);
        let user = EntityId("alice".into());
        let unit = EntityId("u1".into());

        update_record(&repo, &user, &unit, 0, entry(5, 5)).unwrap();
        let (id, applied) = update_record(&repo, &user, &unit, 0, entry(2, 5)).unwrap();

        assert!(id.is_none());
        assert!(!applied);

        let stored = repo.find_record(&user, &unit).unwrap().unwrap();
        assert_eq!(stored.entries[0].as_ref().unwrap().passed, 5);
    }

    #[test]
    fn better_attempt_overwrites() {
        let repo = MemRepo::with_unit("u1", 3);
        let user = EntityId("alice".into());
        let unit = EntityId("u1".into());

        update_record(&repo, &user, &unit, 0, entry(2, 5)).unwrap();
        let (id, applied) = update_record(&repo, &user, &unit, 0, entry(5, 5)).unwrap();

        assert!(id.is_none());
        assert!(applied);
    }

    #[test]
    fn equal_passed_rejudge_still_overwrites_total() {
        // Per the repository trait's own doc comment, an equal `passed` is not a regression: a
        // rejudge against a changed point total must still win so `total` stays current.
        let repo = MemRepo::with_unit("u1", 3);
        let user = EntityId("alice".into());
        let unit = EntityId("u1".into());

        update_record(&repo, &user, &unit, 0, entry(3, 5)).unwrap();
        let (id, applied) = update_record(&repo, &user, &unit, 0, entry(3, 8)).unwrap();

        assert!(id.is_none());
        assert!(applied);

        let stored = repo.find_record(&user, &unit).unwrap().unwrap();
        assert_eq!(stored.entries[0].as_ref().unwrap().total, 8);
    }
}
