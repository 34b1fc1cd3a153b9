//! In-memory repository for driving the orchestrator

use prgate::error::{Error, Result};
use prgate::vcs::{SquashOutcome, Vcs};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Branch everything starts on
pub const MAIN: &str = "main";

#[derive(Debug)]
struct RepoState {
    /// Change ids committed on each branch, oldest first
    branches: HashMap<String, Vec<u64>>,
    current: String,
    staged: Option<u64>,
    merging: bool,
}

/// Mock repository
///
/// A commit is identified by the change ids below it, so two branches with
/// the same history point at the same commit. Changes are looked up from
/// the first number in the refspec.
///
/// Features:
/// - Conflict injection per change, or per pair of changes
/// - Dirty working tree flag
/// - Error injection per operation
/// - Call log for verification
pub struct MockRepo {
    state: Mutex<RepoState>,
    conflicts: Mutex<HashSet<u64>>,
    /// Change id to the changes it conflicts with when already applied
    pair_conflicts: Mutex<HashMap<u64, HashSet<u64>>>,
    dirty: Mutex<bool>,
    fail_on: Mutex<Option<&'static str>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRepo {
    /// Repository with an empty `main` checked out
    pub fn new() -> Self {
        let mut branches = HashMap::new();
        branches.insert(MAIN.to_string(), Vec::new());
        Self {
            state: Mutex::new(RepoState {
                branches,
                current: MAIN.to_string(),
                staged: None,
                merging: false,
            }),
            conflicts: Mutex::new(HashSet::new()),
            pair_conflicts: Mutex::new(HashMap::new()),
            dirty: Mutex::new(false),
            fail_on: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make `id` fail to merge
    pub fn conflict_on(&self, id: u64) {
        self.conflicts.lock().unwrap().insert(id);
    }

    /// Make `id` fail to merge while `other` is on the checked-out branch
    pub fn conflict_when(&self, id: u64, other: u64) {
        self.pair_conflicts
            .lock()
            .unwrap()
            .entry(id)
            .or_default()
            .insert(other);
    }

    /// Pretend tracked files were modified
    pub fn set_dirty(&self, dirty: bool) {
        *self.dirty.lock().unwrap() = dirty;
    }

    /// Make every call to `operation` fail
    pub fn fail_on(&self, operation: &'static str) {
        *self.fail_on.lock().unwrap() = Some(operation);
    }

    /// Stop injecting errors
    pub fn clear_failure(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    /// Add a branch with the given history
    pub fn add_branch(&self, name: &str, history: &[u64]) {
        self.state
            .lock()
            .unwrap()
            .branches
            .insert(name.to_string(), history.to_vec());
    }

    /// Checked-out branch
    pub fn current_branch(&self) -> String {
        self.state.lock().unwrap().current.clone()
    }

    /// Changes committed on the checked-out branch
    pub fn applied(&self) -> Vec<u64> {
        let state = self.state.lock().unwrap();
        state.branches[&state.current].clone()
    }

    /// Changes committed on `branch`, if it exists
    pub fn history(&self, branch: &str) -> Option<Vec<u64>> {
        self.state.lock().unwrap().branches.get(branch).cloned()
    }

    /// Whether a merge is in progress
    pub fn is_merging(&self) -> bool {
        self.state.lock().unwrap().merging
    }

    /// Every operation performed, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls to `operation`
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count()
    }

    fn record(&self, operation: &'static str, detail: &str) -> Result<()> {
        let entry = if detail.is_empty() {
            operation.to_string()
        } else {
            format!("{operation} {detail}")
        };
        self.calls.lock().unwrap().push(entry);
        if *self.fail_on.lock().unwrap() == Some(operation) {
            return Err(Error::Git {
                command: operation.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn commit_id(history: &[u64]) -> String {
        std::iter::once("c".to_string())
            .chain(history.iter().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join("-")
    }

    fn resolve(state: &RepoState, reference: &str) -> Option<Vec<u64>> {
        if let Some(history) = state.branches.get(reference) {
            return Some(history.clone());
        }
        state
            .branches
            .values()
            .find(|h| Self::commit_id(h) == reference)
            .cloned()
    }
}

fn change_id(refspec: &str) -> Option<u64> {
    refspec.split('/').find_map(|part| part.parse().ok())
}

impl Vcs for MockRepo {
    fn current_ref(&self) -> Result<String> {
        self.record("current_ref", "")?;
        Ok(self.current_branch())
    }

    fn head(&self) -> Result<String> {
        self.record("head", "")?;
        Ok(Self::commit_id(&self.applied()))
    }

    fn is_clean(&self) -> Result<bool> {
        self.record("is_clean", "")?;
        Ok(!*self.dirty.lock().unwrap())
    }

    fn create_branch(&self, name: &str, start: &str) -> Result<()> {
        self.record("create_branch", &format!("{name} {start}"))?;
        let mut state = self.state.lock().unwrap();
        let history = Self::resolve(&state, start).ok_or_else(|| Error::Git {
            command: format!("checkout -B {name} {start}"),
            message: format!("unknown revision {start}"),
        })?;
        state.branches.insert(name.to_string(), history);
        state.current = name.to_string();
        state.staged = None;
        state.merging = false;
        Ok(())
    }

    fn fetch_and_squash(
        &self,
        remote: &str,
        refspec: &str,
        _ff_only: bool,
    ) -> Result<SquashOutcome> {
        self.record("fetch_and_squash", &format!("{remote} {refspec}"))?;
        let Some(id) = change_id(refspec) else {
            return Ok(SquashOutcome::Conflict(format!(
                "couldn't find remote ref {refspec}"
            )));
        };

        let mut state = self.state.lock().unwrap();
        let applied = &state.branches[&state.current];
        let clashes = self
            .pair_conflicts
            .lock()
            .unwrap()
            .get(&id)
            .is_some_and(|others| applied.iter().any(|a| others.contains(a)));
        if clashes || self.conflicts.lock().unwrap().contains(&id) {
            state.merging = true;
            return Ok(SquashOutcome::Conflict(format!(
                "CONFLICT (content): Merge conflict in file{id}.txt"
            )));
        }
        state.staged = Some(id);
        Ok(SquashOutcome::Clean)
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.record("commit", message)?;
        let mut state = self.state.lock().unwrap();
        let id = state.staged.take().unwrap_or(0);
        let current = state.current.clone();
        state.branches.entry(current).or_default().push(id);
        Ok(())
    }

    fn abort_merge(&self) -> Result<()> {
        self.record("abort_merge", "")?;
        let mut state = self.state.lock().unwrap();
        state.staged = None;
        state.merging = false;
        Ok(())
    }

    fn reset_hard(&self, offset: usize) -> Result<()> {
        self.record("reset_hard", &offset.to_string())?;
        let mut state = self.state.lock().unwrap();
        let current = state.current.clone();
        let history = state.branches.entry(current).or_default();
        if offset > history.len() {
            return Err(Error::Git {
                command: format!("reset --hard HEAD~{offset}"),
                message: "not enough history".to_string(),
            });
        }
        history.truncate(history.len() - offset);
        state.staged = None;
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        self.record("delete_branch", name)?;
        let mut state = self.state.lock().unwrap();
        if state.current == name {
            return Err(Error::Git {
                command: format!("branch -D {name}"),
                message: "cannot delete the checked-out branch".to_string(),
            });
        }
        state.branches.remove(name);
        Ok(())
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        self.record("branch_exists", name)?;
        Ok(self.state.lock().unwrap().branches.contains_key(name))
    }

    fn checkout(&self, reference: &str) -> Result<()> {
        self.record("checkout", reference)?;
        let mut state = self.state.lock().unwrap();
        if !state.branches.contains_key(reference) {
            return Err(Error::Git {
                command: format!("checkout {reference}"),
                message: format!("pathspec '{reference}' did not match"),
            });
        }
        state.current = reference.to_string();
        Ok(())
    }
}
