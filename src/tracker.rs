//! Frame sequence orchestration
//!
//! Runs graph construction, program assembly, solving and interpretation for
//! each consecutive frame pair and commits the result to the running tracks.

use std::fmt;

use log::{debug, info};

use crate::config::TrackingConfig;
use crate::graph::GraphBuilder;
use crate::model::LinearProgram;
use crate::solve::{interpret, BinarySolver, FrameAssignment};
use crate::types::region::Frame;
use crate::types::track::TrackSet;
use crate::{FrameSide, Result, TrackingError};

/// A failure while tracking into frame `frame`.
///
/// Tracks committed for earlier frames stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameError {
    /// Index of the current frame of the failing pair
    pub frame: usize,
    pub source: TrackingError,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tracking failed at frame {}: {}", self.frame, self.source)
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Solves one frame pair.
///
/// `previous` and `current` are used as given; debris filtering is up to the
/// caller (see [`CellTracker`]).
pub fn track_pair<S>(
    config: &TrackingConfig,
    previous: &Frame,
    current: &Frame,
    solver: &S,
) -> Result<FrameAssignment>
where
    S: BinarySolver + ?Sized,
{
    let graph = GraphBuilder::new(config).build(previous, current)?;
    let program = LinearProgram::assemble(&graph)?;
    let selection = solver.solve(&program)?;
    interpret(&program, &selection)
}

#[derive(Debug, Clone)]
struct Committed {
    frame: Frame,
    tracks: TrackSet,
}

/// Tracks cells over a sequence of frames.
///
/// Frames are pushed in order; the first one seeds the tracks and every later
/// one is linked to its predecessor.
#[derive(Debug, Clone)]
pub struct CellTracker<S> {
    config: TrackingConfig,
    solver: S,
    committed: Option<Committed>,
}

impl<S: BinarySolver> CellTracker<S> {
    /// Creates a tracker; fails if `config` is out of range.
    pub fn new(config: TrackingConfig, solver: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            solver,
            committed: None,
        })
    }

    #[inline]
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Index the next pushed frame will get.
    pub fn next_frame(&self) -> usize {
        self.committed
            .as_ref()
            .map_or(0, |c| c.tracks.frame() + 1)
    }

    /// Tracks up to the last committed frame, if any frame was pushed.
    pub fn tracks(&self) -> Option<&TrackSet> {
        self.committed.as_ref().map(|c| &c.tracks)
    }

    pub fn into_tracks(self) -> Option<TrackSet> {
        self.committed.map(|c| c.tracks)
    }

    /// Adds the next frame.
    ///
    /// Returns the frame pair's events, or `None` for the first frame. On error
    /// the tracker is left exactly as it was before the call.
    pub fn push_frame(
        &mut self,
        frame: Frame,
    ) -> ::core::result::Result<Option<FrameAssignment>, FrameError> {
        let index = self.next_frame();
        let at = |source: TrackingError| FrameError {
            frame: index,
            source,
        };

        let frame = frame.without_debris(self.config.min_area);

        let Some(committed) = self.committed.as_mut() else {
            frame.validate(FrameSide::Previous).map_err(at)?;
            debug!("seeding {} tracks from frame {index}", frame.len());
            let tracks = TrackSet::starting_at(index, &frame);
            self.committed = Some(Committed { frame, tracks });
            return Ok(None);
        };

        let assignment =
            track_pair(&self.config, &committed.frame, &frame, &self.solver).map_err(at)?;
        committed.tracks.apply(&assignment, &frame).map_err(at)?;
        committed.frame = frame;

        info!("frame {index}: {}", assignment.counts());
        Ok(Some(assignment))
    }

    /// Pushes every frame in order, stopping at the first failure.
    pub fn track_sequence<I>(&mut self, frames: I) -> ::core::result::Result<(), FrameError>
    where
        I: IntoIterator<Item = Frame>,
    {
        for frame in frames {
            self.push_frame(frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HEAD, TAIL};
    use crate::solve::Origin;
    use crate::types::node::NodeKind;
    use crate::types::region::{CellRegion, ImageShape};
    use crate::Precondition;

    fn frame(cells: &[(f64, f64, f64)]) -> Frame {
        Frame::new(
            cells.iter().map(|&(x, y, a)| CellRegion::new(x, y, a)).collect(),
            ImageShape::new(100.0, 100.0),
        )
    }

    /// Keeps the single cell moving: selects L0 -> R0 and the conduit.
    fn single_move(program: &LinearProgram) -> Result<Vec<bool>> {
        let incidence = program.incidence();
        let row = |k| incidence.row_of(k).unwrap();
        let wanted = [
            vec![(row(NodeKind::Previous(0)), TAIL), (row(NodeKind::Current(0)), HEAD)],
            vec![(row(NodeKind::Appear), TAIL), (row(NodeKind::Disappear), HEAD)],
        ];
        Ok((0..program.num_variables())
            .map(|c| wanted.contains(&incidence.column_entries(c)))
            .collect())
    }

    fn failing(_: &LinearProgram) -> Result<Vec<bool>> {
        Err(TrackingError::no_solution("infeasible"))
    }

    fn config() -> TrackingConfig {
        TrackingConfig::new(110.0, 1.0, 0.0)
    }

    #[test]
    fn test_push_frames() {
        let mut tracker = CellTracker::new(config(), single_move).unwrap();
        assert!(tracker.tracks().is_none());

        assert_eq!(tracker.push_frame(frame(&[(20.0, 20.0, 100.0)])), Ok(None));
        let assignment = tracker
            .push_frame(frame(&[(22.0, 20.0, 100.0)]))
            .unwrap()
            .unwrap();
        assert_eq!(assignment.origins, vec![Origin::Moved { from: 0 }]);

        tracker.push_frame(frame(&[(24.0, 21.0, 100.0)])).unwrap();
        assert_eq!(tracker.next_frame(), 3);

        let tracks = tracker.into_tracks().unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks.iter().next().unwrap().snapshots().len(), 3);
    }

    #[test]
    fn test_failure_leaves_state() {
        let mut tracker = CellTracker::new(config(), failing).unwrap();
        tracker.push_frame(frame(&[(20.0, 20.0, 100.0)])).unwrap();
        let before = tracker.tracks().cloned();

        let err = tracker.push_frame(frame(&[(22.0, 20.0, 100.0)])).unwrap_err();
        assert_eq!(err.frame, 1);
        assert!(matches!(err.source, TrackingError::NoSolution { .. }));
        assert!(err.to_string().contains("frame 1"));
        assert_eq!(tracker.tracks().cloned(), before);
        assert_eq!(tracker.next_frame(), 1);
    }

    #[test]
    fn test_debris_filtered_before_tracking() {
        let mut tracker = CellTracker::new(config().with_min_area(50.0), single_move).unwrap();
        tracker
            .push_frame(frame(&[(20.0, 20.0, 100.0), (70.0, 70.0, 30.0)]))
            .unwrap();
        assert_eq!(tracker.tracks().unwrap().active().len(), 1);

        // Only debris left: the seed frame is rejected.
        let mut tracker = CellTracker::new(config().with_min_area(50.0), single_move).unwrap();
        let err = tracker.push_frame(frame(&[(70.0, 70.0, 50.0)])).unwrap_err();
        assert_eq!(
            err.source,
            TrackingError::PreconditionViolation(Precondition::EmptyFrame {
                side: FrameSide::Previous
            })
        );
        assert!(tracker.tracks().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = CellTracker::new(TrackingConfig::new(110.0, 1.5, 0.2), single_move);
        assert!(matches!(
            result,
            Err(TrackingError::PreconditionViolation(Precondition::InvalidConfig { .. }))
        ));
    }
}
