//! Client-side document state.
//!
//! The state tracks the last server snapshot (`baseline`), the locally
//! edited copy (`working`) and the server version of the baseline. The
//! pending local change is always `diff(baseline, working)`, so there is no
//! separate edit log to keep in sync.
//!
//! When a newer server snapshot arrives the pending change is replayed onto
//! it with best-effort application. Operations that no longer fit are
//! dropped and reported through [`RebaseReport`].

use deckscribe_json_patch::{apply_op, apply_patch_lenient, diff, LenientResult, Op, Patch, PatchApplyError};
use deckscribe_json_pointer::{format_json_pointer, get, parse_json_pointer, validate_json_pointer};
use deckscribe_protocol::{Version, VersionedSnapshot};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq)]
struct Tracked {
    baseline: Value,
    working: Value,
    version: Version,
    dirty: bool,
}

/// Outcome of replaying local edits onto a newer snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebaseReport {
    /// Number of operations in the replayed local change.
    pub replayed: usize,
    /// Operations that did not fit the new snapshot and were dropped.
    pub dropped: Vec<PatchApplyError>,
}

impl RebaseReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveOutcome {
    /// First snapshot for this document.
    Adopted,
    Rebased(RebaseReport),
    /// Not newer than what is tracked.
    Ignored,
}

/// A patch handed to the server, computed by [`SyncState::begin_submit`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmit {
    pub expected: Version,
    pub patch: Patch,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    tracked: Option<Tracked>,
    /// `working` as it was when the in-flight patch was computed.
    in_flight: Option<Value>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.tracked.is_some()
    }

    pub fn version(&self) -> Option<Version> {
        self.tracked.as_ref().map(|t| t.version)
    }

    pub fn is_dirty(&self) -> bool {
        self.tracked.as_ref().is_some_and(|t| t.dirty)
    }

    pub fn baseline(&self) -> Option<&Value> {
        self.tracked.as_ref().map(|t| &t.baseline)
    }

    pub fn working(&self) -> Option<&Value> {
        self.tracked.as_ref().map(|t| &t.working)
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Stops tracking the document.
    pub fn clear(&mut self) {
        self.tracked = None;
        self.in_flight = None;
    }

    /// Accepts a snapshot read from the server.
    pub fn receive(&mut self, remote: VersionedSnapshot) -> ReceiveOutcome {
        if let Some(tracked) = self.tracked.as_mut() {
            if remote.version > tracked.version {
                return ReceiveOutcome::Rebased(rebase(tracked, remote));
            }
            debug!(remote = %remote.version, tracked = %tracked.version, "ignoring snapshot that is not newer");
            return ReceiveOutcome::Ignored;
        }
        debug!(version = %remote.version, "adopting server snapshot");
        self.tracked = Some(Tracked {
            working: remote.snapshot.clone(),
            baseline: remote.snapshot,
            version: remote.version,
            dirty: false,
        });
        ReceiveOutcome::Adopted
    }

    /// Replays local edits onto `remote` even if its version is not newer.
    ///
    /// Used after the server rejected a patch as not applicable: rebasing
    /// onto the current snapshot drops the operations that no longer fit.
    pub fn rebase_onto(&mut self, remote: VersionedSnapshot) -> Result<RebaseReport, SyncError> {
        let tracked = self.tracked.as_mut().ok_or(SyncError::Uninitialized)?;
        Ok(rebase(tracked, remote))
    }

    fn tracked_mut(&mut self) -> Result<&mut Tracked, SyncError> {
        self.tracked.as_mut().ok_or(SyncError::Uninitialized)
    }

    /// Sets a top-level field of the working snapshot.
    pub fn set_field(&mut self, field: &str, value: Value) -> Result<(), SyncError> {
        let tracked = self.tracked_mut()?;
        let map = tracked.working.as_object_mut().ok_or_else(|| SyncError::InvalidEdit {
            path: format_json_pointer(&[field.to_string()]),
            reason: "snapshot is not an object".into(),
        })?;
        map.insert(field.to_string(), value);
        tracked.dirty = true;
        Ok(())
    }

    /// Sets the value at a JSON Pointer, creating the last step if needed.
    pub fn set_path(&mut self, pointer: &str, value: Value) -> Result<(), SyncError> {
        let invalid = |reason: String| SyncError::InvalidEdit { path: pointer.to_string(), reason };
        validate_json_pointer(pointer).map_err(|e| invalid(e.to_string()))?;
        let path = parse_json_pointer(pointer);

        let tracked = self.tracked_mut()?;
        let op = if !path.is_empty() && get(&tracked.working, &path).is_some() {
            Op::Replace { path, value }
        } else {
            Op::Add { path, value }
        };
        apply_op(&mut tracked.working, &op).map_err(|e| invalid(e.to_string()))?;
        tracked.dirty = true;
        Ok(())
    }

    /// Replaces the whole working snapshot.
    pub fn set_working(&mut self, snapshot: Value) -> Result<(), SyncError> {
        let tracked = self.tracked_mut()?;
        tracked.working = snapshot;
        tracked.dirty = true;
        Ok(())
    }

    /// Inserts or overwrites entries of the object stored under `field`,
    /// e.g. the deck's `files` map keyed by full path.
    pub fn update_entries<I>(&mut self, field: &str, entries: I) -> Result<(), SyncError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let tracked = self.tracked_mut()?;
        let invalid = |reason: &str| SyncError::InvalidEdit {
            path: format_json_pointer(&[field.to_string()]),
            reason: reason.to_string(),
        };
        let root = tracked.working.as_object_mut().ok_or_else(|| invalid("snapshot is not an object"))?;
        let target = root
            .entry(field.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| invalid("not an object"))?;
        target.extend(entries);
        tracked.dirty = true;
        Ok(())
    }

    /// Computes the patch to send. `None` when there is nothing to send, in
    /// which case the state is marked clean.
    pub fn begin_submit(&mut self) -> Result<Option<PendingSubmit>, SyncError> {
        let tracked = self.tracked.as_mut().ok_or(SyncError::Uninitialized)?;
        let patch = diff(&tracked.baseline, &tracked.working);
        if patch.is_empty() {
            tracked.dirty = false;
            return Ok(None);
        }
        self.in_flight = Some(tracked.working.clone());
        Ok(Some(PendingSubmit { expected: tracked.version, patch }))
    }

    /// Adopts the server's answer to the in-flight patch.
    ///
    /// Edits made after [`begin_submit`](Self::begin_submit) are replayed on
    /// top of the committed snapshot; the submitted ones are already in it.
    pub fn confirm_submit(&mut self, result: VersionedSnapshot) -> Result<RebaseReport, SyncError> {
        let tracked = self.tracked.as_mut().ok_or(SyncError::Uninitialized)?;
        let submitted = self.in_flight.take().unwrap_or_else(|| tracked.baseline.clone());
        let later = diff(&submitted, &tracked.working);
        let LenientResult { doc, skipped } = apply_patch_lenient(&result.snapshot, &later);
        report_dropped(&skipped, result.version);

        tracked.baseline = result.snapshot;
        tracked.working = doc;
        tracked.version = result.version;
        tracked.dirty = !diff(&tracked.baseline, &tracked.working).is_empty();
        Ok(RebaseReport { replayed: later.len(), dropped: skipped })
    }

    /// Forgets the in-flight patch. `baseline` and `working` are untouched,
    /// so the edits are sent again by the next submission.
    pub fn abort_submit(&mut self) {
        self.in_flight = None;
    }
}

fn rebase(tracked: &mut Tracked, remote: VersionedSnapshot) -> RebaseReport {
    let local = diff(&tracked.baseline, &tracked.working);
    let LenientResult { doc, skipped } = apply_patch_lenient(&remote.snapshot, &local);
    report_dropped(&skipped, remote.version);
    debug!(
        from = %tracked.version,
        to = %remote.version,
        replayed = local.len(),
        dropped = skipped.len(),
        "rebased local edits"
    );

    tracked.baseline = remote.snapshot;
    tracked.working = doc;
    tracked.version = remote.version;
    tracked.dirty = !diff(&tracked.baseline, &tracked.working).is_empty();
    RebaseReport { replayed: local.len(), dropped: skipped }
}

fn report_dropped(skipped: &[PatchApplyError], version: Version) {
    for err in skipped {
        warn!(%version, error = %err, "local edit dropped while rebasing");
    }
}
