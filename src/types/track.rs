//! Per-cell track records
//!
//! A [`TrackSet`] accumulates one [`CellTrack`] per cell lineage segment. A track
//! continues while its cell moves; divisions and merges end the parent tracks and
//! start new ones linked back to them.

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::region::{CellRegion, Frame};
use crate::solve::{FrameAssignment, Origin};
use crate::{Result, TrackingError};

// ============================================================================
// Track Identifier
// ============================================================================

/// A stable identifier for a track.
///
/// The tuple `(birth_frame, index)` is unique within a [`TrackSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackId {
    /// Frame in which the track's first cell was observed
    pub birth_frame: usize,
    /// Index among tracks born in the same frame
    pub index: usize,
}

impl TrackId {
    #[inline]
    pub const fn new(birth_frame: usize, index: usize) -> Self {
        Self { birth_frame, index }
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.birth_frame, self.index)
    }
}

/// Hands out unique track identifiers frame by frame.
#[derive(Debug, Clone)]
struct TrackIdGenerator {
    frame: usize,
    next_index: usize,
}

impl TrackIdGenerator {
    fn at_frame(frame: usize) -> Self {
        Self {
            frame,
            next_index: 0,
        }
    }

    fn next_id(&mut self) -> TrackId {
        let id = TrackId::new(self.frame, self.next_index);
        self.next_index += 1;
        id
    }
}

// ============================================================================
// Snapshot / Track
// ============================================================================

/// A track's observation in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    pub frame: usize,
    pub centroid: Point2<f64>,
    pub area: f64,
}

impl Snapshot {
    pub fn of(frame: usize, region: &CellRegion) -> Self {
        Self {
            frame,
            centroid: region.centroid,
            area: region.area,
        }
    }
}

/// How a track ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrackEnd {
    /// The cell left the field of view or was lost
    Disappeared,
    /// The cell divided into two daughter tracks
    Divided,
    /// The cell merged with another into a new track
    Merged,
}

/// The lineage segment of one cell.
///
/// Holds at least one snapshot, on consecutive frames.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "CellTrackRecord"))]
pub struct CellTrack {
    id: TrackId,
    parents: Vec<TrackId>,
    snapshots: Vec<Snapshot>,
    end: Option<TrackEnd>,
}

impl CellTrack {
    /// Starts a track from its first observation.
    pub fn new(id: TrackId, first: Snapshot, parents: Vec<TrackId>) -> Self {
        Self {
            id,
            parents,
            snapshots: vec![first],
            end: None,
        }
    }

    #[inline]
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Tracks this one descends from (one for a division, two for a merge).
    #[inline]
    pub fn parents(&self) -> &[TrackId] {
        &self.parents
    }

    /// Observations in frame order.
    #[inline]
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    #[inline]
    pub fn end(&self) -> Option<TrackEnd> {
        self.end
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.end.is_none()
    }

    pub fn first_frame(&self) -> usize {
        self.snapshots[0].frame
    }

    pub fn last(&self) -> &Snapshot {
        // Never empty: built from a first snapshot, only appended to, and
        // checked on deserialization.
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn last_frame(&self) -> usize {
        self.last().frame
    }

    fn extend(&mut self, snapshot: Snapshot) -> Result<()> {
        if snapshot.frame != self.last_frame() + 1 {
            return Err(TrackingError::inconsistency(format!(
                "track {} cannot jump from frame {} to {}",
                self.id,
                self.last_frame(),
                snapshot.frame
            )));
        }
        self.snapshots.push(snapshot);
        Ok(())
    }
}

/// Unchecked form of a [`CellTrack`] as read from a serialized record.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct CellTrackRecord {
    id: TrackId,
    parents: Vec<TrackId>,
    snapshots: Vec<Snapshot>,
    end: Option<TrackEnd>,
}

#[cfg(feature = "serde")]
impl TryFrom<CellTrackRecord> for CellTrack {
    type Error = TrackingError;

    fn try_from(record: CellTrackRecord) -> Result<Self> {
        if record.snapshots.is_empty() {
            return Err(TrackingError::inconsistency(format!(
                "track {} has no snapshots",
                record.id
            )));
        }
        if let Some(gap) = record
            .snapshots
            .windows(2)
            .find(|pair| pair[1].frame != pair[0].frame + 1)
        {
            return Err(TrackingError::inconsistency(format!(
                "track {} jumps from frame {} to {}",
                record.id, gap[0].frame, gap[1].frame
            )));
        }
        Ok(Self {
            id: record.id,
            parents: record.parents,
            snapshots: record.snapshots,
            end: record.end,
        })
    }
}

// ============================================================================
// Track Set
// ============================================================================

/// What happens to a previous-frame cell's track within one frame pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Continued,
    Ended(TrackEnd),
}

/// Running track records for a frame sequence.
///
/// `active` is aligned with the regions of the most recent frame, so index `i`
/// of the next pair's previous frame maps to `active[i]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackSet {
    #[cfg_attr(feature = "serde", serde(with = "track_list"))]
    tracks: BTreeMap<TrackId, CellTrack>,
    active: Vec<TrackId>,
    frame: usize,
}

impl TrackSet {
    /// Starts one track per cell of the first frame (frame index 0).
    pub fn initialise(frame: &Frame) -> Self {
        Self::starting_at(0, frame)
    }

    /// Starts one track per cell of `frame`, numbered as frame `index`.
    pub fn starting_at(index: usize, frame: &Frame) -> Self {
        let mut ids = TrackIdGenerator::at_frame(index);
        let mut tracks = BTreeMap::new();
        let mut active = Vec::with_capacity(frame.len());

        for region in &frame.regions {
            let id = ids.next_id();
            tracks.insert(id, CellTrack::new(id, Snapshot::of(index, region), Vec::new()));
            active.push(id);
        }

        Self {
            tracks,
            active,
            frame: index,
        }
    }

    /// Index of the most recent committed frame.
    #[inline]
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Track ids aligned with the most recent frame's regions.
    #[inline]
    pub fn active(&self) -> &[TrackId] {
        &self.active
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: TrackId) -> Option<&CellTrack> {
        self.tracks.get(&id)
    }

    /// Tracks in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &CellTrack> + '_ {
        self.tracks.values()
    }

    /// Commits one frame pair's assignment for the cells of `current`.
    ///
    /// Either the whole update is applied or, on error, nothing changes.
    pub fn apply(&mut self, assignment: &FrameAssignment, current: &Frame) -> Result<()> {
        if assignment.origins.len() != current.len() {
            return Err(TrackingError::inconsistency(format!(
                "assignment covers {} cells but the frame holds {}",
                assignment.origins.len(),
                current.len()
            )));
        }

        let frame = self.frame + 1;
        let mut ids = TrackIdGenerator::at_frame(frame);
        let mut fates: Vec<Option<Fate>> = vec![None; self.active.len()];
        let mut continued: Vec<(TrackId, Snapshot)> = Vec::new();
        let mut born: Vec<CellTrack> = Vec::new();
        let mut next_active = Vec::with_capacity(current.len());

        for (origin, region) in assignment.origins.iter().zip(&current.regions) {
            let snapshot = Snapshot::of(frame, region);
            let id = match *origin {
                Origin::Moved { from } => {
                    let id = self.settle(&mut fates, from, Fate::Continued)?;
                    continued.push((id, snapshot));
                    id
                }
                Origin::Appeared => {
                    let id = ids.next_id();
                    born.push(CellTrack::new(id, snapshot, Vec::new()));
                    id
                }
                Origin::Divided { parent } => {
                    let parent = self.settle(&mut fates, parent, Fate::Ended(TrackEnd::Divided))?;
                    let id = ids.next_id();
                    born.push(CellTrack::new(id, snapshot, vec![parent]));
                    id
                }
                Origin::Merged { parents: (a, b) } => {
                    let a = self.settle(&mut fates, a, Fate::Ended(TrackEnd::Merged))?;
                    let b = self.settle(&mut fates, b, Fate::Ended(TrackEnd::Merged))?;
                    let id = ids.next_id();
                    born.push(CellTrack::new(id, snapshot, vec![a, b]));
                    id
                }
            };
            next_active.push(id);
        }

        // Stage continued tracks on copies so a failure leaves the set untouched.
        let mut extended = Vec::with_capacity(continued.len());
        for (id, snapshot) in continued {
            let mut track = self.track(id)?.clone();
            track.extend(snapshot)?;
            extended.push(track);
        }

        for (slot, fate) in fates.iter().enumerate() {
            let end = match fate {
                Some(Fate::Continued) => continue,
                Some(Fate::Ended(end)) => *end,
                None => TrackEnd::Disappeared,
            };
            if let Some(track) = self.tracks.get_mut(&self.active[slot]) {
                track.end = Some(end);
            }
        }
        for track in extended.into_iter().chain(born) {
            self.tracks.insert(track.id, track);
        }
        self.active = next_active;
        self.frame = frame;
        Ok(())
    }

    fn track(&self, id: TrackId) -> Result<&CellTrack> {
        self.tracks
            .get(&id)
            .ok_or_else(|| TrackingError::inconsistency(format!("unknown track {id}")))
    }

    /// Records the fate of previous-frame cell `index`, rejecting contradictions.
    fn settle(&self, fates: &mut [Option<Fate>], index: usize, fate: Fate) -> Result<TrackId> {
        let id = *self.active.get(index).ok_or_else(|| {
            TrackingError::inconsistency(format!("previous cell {index} has no active track"))
        })?;
        match fates[index] {
            None => fates[index] = Some(fate),
            // Both daughters of a division name the same parent.
            Some(existing) if existing == fate && fate != Fate::Continued => {}
            Some(existing) => {
                return Err(TrackingError::inconsistency(format!(
                    "previous cell {index} is both {existing:?} and {fate:?}"
                )));
            }
        }
        Ok(id)
    }
}

/// Tracks are stored as a list since each record carries its own id.
#[cfg(feature = "serde")]
mod track_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::{CellTrack, TrackId};

    pub fn serialize<S>(
        tracks: &BTreeMap<TrackId, CellTrack>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(tracks.values())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<TrackId, CellTrack>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let list = Vec::<CellTrack>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|track| (track.id, track)).collect())
    }
}
