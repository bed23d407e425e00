//! Reconciliation engine.
//!
//! [`reconcile`] turns the desired job list and the scheduler's current job
//! list into a [`ReconciliationPlan`]. It is a greedy single pass:
//!
//! 1. Walk remote jobs in the order the scheduler listed them.
//! 2. Each claims the first unclaimed desired job with an equal [`MatchKey`]
//!    and becomes a merge carrying the remote id.
//! 3. A remote job that claims nothing is deleted.
//! 4. Unclaimed desired jobs are added, in configuration order.
//!
//! Lists are tens of entries long, so the quadratic scan is fine and keeps the
//! output stable across runs with unchanged input.
//!
//! [`MatchKey`]: crate::types::MatchKey

use crate::types::{DesiredJob, MergedJob, RemoteJob};

/// Operations needed to move remote state to desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub to_add: Vec<DesiredJob>,
    pub to_merge: Vec<MergedJob>,
    pub to_delete: Vec<RemoteJob>,
}

/// Per-set counts of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub add: usize,
    pub merge: usize,
    pub delete: usize,
}

impl ReconciliationPlan {
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            add: self.to_add.len(),
            merge: self.to_merge.len(),
            delete: self.to_delete.len(),
        }
    }

    /// Number of remote calls applying this plan takes.
    pub fn operation_count(&self) -> usize {
        self.to_add.len() + self.to_merge.len() + self.to_delete.len()
    }

    pub fn is_noop(&self) -> bool {
        self.operation_count() == 0
    }
}

impl PlanSummary {
    pub fn total(&self) -> usize {
        self.add + self.merge + self.delete
    }
}

/// Compute the add/merge/delete plan. Pure; inputs are left untouched.
pub fn reconcile(desired: &[DesiredJob], remote: &[RemoteJob]) -> ReconciliationPlan {
    let mut claimed = vec![false; desired.len()];
    let mut plan = ReconciliationPlan::default();

    for remote_job in remote {
        let key = remote_job.match_key();
        let slot = desired
            .iter()
            .enumerate()
            .position(|(i, job)| !claimed[i] && job.match_key() == key);

        match slot {
            Some(i) => {
                claimed[i] = true;
                plan.to_merge.push(MergedJob {
                    remote_id: remote_job.remote_id.clone(),
                    job: desired[i].clone(),
                });
            }
            None => plan.to_delete.push(remote_job.clone()),
        }
    }

    plan.to_add = desired
        .iter()
        .zip(&claimed)
        .filter(|(_, taken)| !**taken)
        .map(|(job, _)| job.clone())
        .collect();

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Priority, RemoteId};

    fn desired(spider: &str, minute: &str) -> DesiredJob {
        let mut job = DesiredJob::new(spider);
        job.schedule.minute = minute.to_string();
        job
    }

    fn remote(id: &str, spider: &str, minute: &str) -> RemoteJob {
        RemoteJob {
            remote_id: RemoteId::from(id),
            job: desired(spider, minute),
        }
    }

    #[test]
    fn empty_inputs_give_empty_plan() {
        let plan = reconcile(&[], &[]);
        assert!(plan.is_noop());
        assert_eq!(plan.summary(), PlanSummary::default());
    }

    #[test]
    fn new_job_is_added() {
        let plan = reconcile(&[desired("s1", "5")], &[]);
        assert_eq!(
            plan.summary(),
            PlanSummary {
                add: 1,
                merge: 0,
                delete: 0,
            }
        );
    }

    #[test]
    fn matching_job_is_merged_with_remote_id() {
        let plan = reconcile(&[desired("s1", "5")], &[remote("42", "s1", "5")]);
        assert_eq!(
            plan.summary(),
            PlanSummary {
                add: 0,
                merge: 1,
                delete: 0,
            }
        );
        assert_eq!(plan.to_merge[0].remote_id, RemoteId::from("42"));
    }

    #[test]
    fn non_identity_differences_still_merge() {
        let mut want = desired("s1", "5");
        want.priority = Priority::Highest;
        want.spider_arguments = Some("full=1".into());
        let plan = reconcile(&[want.clone()], &[remote("1", "s1", "5")]);
        assert_eq!(plan.to_merge.len(), 1);
        assert_eq!(plan.to_merge[0].job, want);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn schedule_change_is_add_plus_delete() {
        let plan = reconcile(&[desired("s1", "10")], &[remote("1", "s1", "5")]);
        assert_eq!(
            plan.summary(),
            PlanSummary {
                add: 1,
                merge: 0,
                delete: 1,
            }
        );
    }

    #[test]
    fn remote_duplicates_beyond_first_are_deleted() {
        let plan = reconcile(
            &[desired("s1", "5")],
            &[remote("1", "s1", "5"), remote("2", "s1", "5")],
        );
        assert_eq!(plan.to_merge[0].remote_id, RemoteId::from("1"));
        assert_eq!(plan.to_delete.len(), 1);
        assert_eq!(plan.to_delete[0].remote_id, RemoteId::from("2"));
    }

    #[test]
    fn desired_duplicates_beyond_remote_count_are_added() {
        let plan = reconcile(
            &[desired("s1", "5"), desired("s1", "5"), desired("s1", "5")],
            &[remote("1", "s1", "5")],
        );
        assert_eq!(
            plan.summary(),
            PlanSummary {
                add: 2,
                merge: 1,
                delete: 0,
            }
        );
    }

    #[test]
    fn inputs_are_not_mutated() {
        let want = vec![desired("s1", "5")];
        let have = vec![remote("1", "s1", "5")];
        let before = (want.clone(), have.clone());
        let _ = reconcile(&want, &have);
        assert_eq!((want, have), before);
    }
}
