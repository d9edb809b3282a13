//! Reading a solver selection back as per-cell events

use std::fmt;

use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::model::{LinearProgram, HEAD, TAIL};
use crate::types::node::NodeKind;
use crate::{Result, TrackingError};

/// Where a current-frame cell came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Origin {
    /// No predecessor: the cell entered the frame
    Appeared,
    /// The same cell as previous cell `from`
    Moved { from: usize },
    /// One of two daughters of previous cell `parent`
    Divided { parent: usize },
    /// The union of two previous cells
    Merged { parents: (usize, usize) },
}

/// Events of one frame pair, indexed by current-frame cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameAssignment {
    /// Origin of each current cell, aligned with the current frame
    pub origins: Vec<Origin>,
    /// Previous cells that disappeared, ascending
    pub vanished: Vec<usize>,
}

impl FrameAssignment {
    /// Tallies the events in this assignment.
    pub fn counts(&self) -> EventCounts {
        let mut counts = EventCounts {
            vanished: self.vanished.len(),
            ..EventCounts::default()
        };
        for origin in &self.origins {
            match origin {
                Origin::Appeared => counts.appeared += 1,
                Origin::Moved { .. } => counts.moved += 1,
                Origin::Divided { .. } => counts.divided += 1,
                Origin::Merged { .. } => counts.merged += 1,
            }
        }
        counts
    }
}

/// Per-kind event totals; `divided` counts daughters, not parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventCounts {
    pub moved: usize,
    pub appeared: usize,
    pub vanished: usize,
    pub divided: usize,
    pub merged: usize,
}

impl fmt::Display for EventCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} moved, {} appeared, {} vanished, {} daughters, {} merged",
            self.moved, self.appeared, self.vanished, self.divided, self.merged
        )
    }
}

/// Classifies every current-frame cell from a solver selection.
///
/// Each R cell must be reached by exactly one selected column and each L cell
/// must leave through exactly one; the tails of the column reaching an R cell
/// are its predecessors:
///
/// | Predecessors | Origin |
/// |--------------|--------|
/// | `A` | appeared |
/// | `L_i` | moved from `i` |
/// | `L_i`, `A` | divided from `i` |
/// | `L_a`, `L_b` | merged from `a` and `b` |
///
/// # Errors
///
/// [`TrackingError::NoSolution`] if the selection has the wrong length or
/// leaves a cell unserved or over-served, or if a cell has zero or more than
/// two predecessors. [`TrackingError::ModelInconsistency`] for any other
/// predecessor combination.
pub fn interpret(program: &LinearProgram, selection: &[bool]) -> Result<FrameAssignment> {
    if selection.len() != program.num_variables() {
        return Err(TrackingError::no_solution(format!(
            "selection has {} entries for {} columns",
            selection.len(),
            program.num_variables()
        )));
    }

    let vertices = program.vertices();
    let incidence = program.incidence();
    let num_previous = vertices
        .iter()
        .filter(|k| matches!(k, NodeKind::Previous(_)))
        .count();
    let num_current = vertices
        .iter()
        .filter(|k| matches!(k, NodeKind::Current(_)))
        .count();

    let mut incoming: Vec<Option<usize>> = vec![None; num_current];
    let mut departures = vec![0usize; num_previous];

    for col in (0..selection.len()).filter(|&c| selection[c]) {
        for (row, value) in incidence.column_entries(col) {
            match (vertices[row], value) {
                (NodeKind::Current(j), HEAD) => {
                    if incoming[j].replace(col).is_some() {
                        return Err(TrackingError::no_solution(format!(
                            "R{j} is reached by more than one selected edge"
                        )));
                    }
                }
                (NodeKind::Previous(i), TAIL) => departures[i] += 1,
                _ => {}
            }
        }
    }

    if let Some((i, &n)) = departures.iter().enumerate().find(|&(_, &n)| n != 1) {
        return Err(TrackingError::no_solution(format!(
            "L{i} leaves through {n} selected edges"
        )));
    }

    let origins = incoming
        .iter()
        .enumerate()
        .map(|(j, col)| {
            let col = col.ok_or_else(|| {
                TrackingError::no_solution(format!("R{j} has no selected incoming edge"))
            })?;
            let predecessors: Vec<NodeKind> = incidence
                .column_entries(col)
                .into_iter()
                .filter(|&(_, v)| v == TAIL)
                .map(|(row, _)| vertices[row])
                .collect();
            classify(j, &predecessors)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut referenced = vec![false; num_previous];
    for origin in &origins {
        match *origin {
            Origin::Appeared => {}
            Origin::Moved { from: i } | Origin::Divided { parent: i } => referenced[i] = true,
            Origin::Merged { parents: (a, b) } => {
                referenced[a] = true;
                referenced[b] = true;
            }
        }
    }
    let vanished = (0..num_previous).filter(|&i| !referenced[i]).collect();

    let assignment = FrameAssignment { origins, vanished };
    debug!("interpreted selection: {}", assignment.counts());
    Ok(assignment)
}

fn classify(current: usize, predecessors: &[NodeKind]) -> Result<Origin> {
    match predecessors {
        [NodeKind::Appear] => Ok(Origin::Appeared),
        &[NodeKind::Previous(from)] => Ok(Origin::Moved { from }),
        &[NodeKind::Previous(parent), NodeKind::Appear]
        | &[NodeKind::Appear, NodeKind::Previous(parent)] => Ok(Origin::Divided { parent }),
        &[NodeKind::Previous(a), NodeKind::Previous(b)] => Ok(Origin::Merged {
            parents: (a.min(b), a.max(b)),
        }),
        [] => Err(TrackingError::no_solution(format!(
            "R{current} has no predecessor"
        ))),
        many if many.len() > 2 => Err(TrackingError::no_solution(format!(
            "R{current} has {} predecessors",
            many.len()
        ))),
        other => Err(TrackingError::inconsistency(format!(
            "R{current} has unexpected predecessors {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackingConfig;
    use crate::graph::GraphBuilder;
    use crate::types::region::{CellRegion, Frame, ImageShape};

    fn frame(cells: &[(f64, f64, f64)]) -> Frame {
        Frame::new(
            cells.iter().map(|&(x, y, a)| CellRegion::new(x, y, a)).collect(),
            ImageShape::new(100.0, 100.0),
        )
    }

    fn program(previous: &Frame, current: &Frame) -> LinearProgram {
        let config = TrackingConfig::new(110.0, 1.0, 1.0);
        let graph = GraphBuilder::new(&config).build(previous, current).unwrap();
        LinearProgram::assemble(&graph).unwrap()
    }

    /// Selects each column once whose sorted entries match, by vertex kind.
    fn select(program: &LinearProgram, columns: &[&[(NodeKind, i8)]]) -> Vec<bool> {
        let incidence = program.incidence();
        let mut remaining: Vec<Vec<(usize, i8)>> = columns
            .iter()
            .map(|entries| {
                let mut rows: Vec<_> = entries
                    .iter()
                    .map(|&(k, v)| (incidence.row_of(k).unwrap(), v))
                    .collect();
                rows.sort();
                rows
            })
            .collect();
        (0..program.num_variables())
            .map(|c| {
                let entries = incidence.column_entries(c);
                match remaining.iter().position(|w| *w == entries) {
                    Some(i) => {
                        remaining.remove(i);
                        true
                    }
                    None => false,
                }
            })
            .collect()
    }

    use NodeKind::{Appear as A, Current as R, Disappear as D, Previous as L};

    #[test]
    fn test_moves_and_disappearance() {
        let p = program(
            &frame(&[(20.0, 20.0, 100.0), (50.0, 50.0, 100.0), (80.0, 80.0, 100.0)]),
            &frame(&[(81.0, 80.0, 100.0), (21.0, 20.0, 100.0)]),
        );
        let selection = select(
            &p,
            &[
                &[(L(0), -1), (R(1), 1)],
                &[(L(2), -1), (R(0), 1)],
                &[(L(1), -1), (D, 1)],
                &[(A, -1), (D, 1)],
                &[(A, -1), (D, 1)],
            ],
        );
        assert!(p.is_feasible(&selection));

        let assignment = interpret(&p, &selection).unwrap();
        assert_eq!(
            assignment.origins,
            vec![Origin::Moved { from: 2 }, Origin::Moved { from: 0 }]
        );
        assert_eq!(assignment.vanished, vec![1]);
        assert_eq!(assignment.counts().moved, 2);
    }

    #[test]
    fn test_split_and_appearance() {
        let p = program(
            &frame(&[(50.0, 50.0, 200.0)]),
            &frame(&[(45.0, 50.0, 100.0), (10.0, 90.0, 80.0), (55.0, 50.0, 100.0)]),
        );
        let selection = select(
            &p,
            &[
                &[(L(0), -1), (A, -1), (R(0), 1), (R(2), 1)],
                &[(A, -1), (R(1), 1)],
                &[(A, -1), (D, 1)],
            ],
        );
        assert!(p.is_feasible(&selection));

        let assignment = interpret(&p, &selection).unwrap();
        assert_eq!(
            assignment.origins,
            vec![
                Origin::Divided { parent: 0 },
                Origin::Appeared,
                Origin::Divided { parent: 0 },
            ]
        );
        assert!(assignment.vanished.is_empty());
        assert_eq!(assignment.counts().divided, 2);
    }

    #[test]
    fn test_merge() {
        let p = program(
            &frame(&[(45.0, 50.0, 100.0), (55.0, 50.0, 100.0)]),
            &frame(&[(50.0, 50.0, 200.0)]),
        );
        let selection = select(
            &p,
            &[
                &[(L(0), -1), (L(1), -1), (R(0), 1), (D, 1)],
                &[(A, -1), (D, 1)],
            ],
        );
        assert!(p.is_feasible(&selection));

        let assignment = interpret(&p, &selection).unwrap();
        assert_eq!(assignment.origins, vec![Origin::Merged { parents: (0, 1) }]);
        assert!(assignment.vanished.is_empty());
    }

    #[test]
    fn test_rejects_unusable_selections() {
        let p = program(
            &frame(&[(20.0, 20.0, 100.0), (80.0, 80.0, 100.0)]),
            &frame(&[(21.0, 20.0, 100.0), (80.0, 81.0, 100.0)]),
        );
        let no_solution = |r: Result<FrameAssignment>| matches!(r, Err(TrackingError::NoSolution { .. }));

        assert!(no_solution(interpret(&p, &[])));
        assert!(no_solution(interpret(&p, &vec![false; p.num_variables()])));

        // R1 unserved
        let partial = select(&p, &[&[(L(0), -1), (R(0), 1)], &[(L(1), -1), (D, 1)]]);
        assert!(no_solution(interpret(&p, &partial)));

        // R0 served twice
        let doubled = select(
            &p,
            &[
                &[(L(0), -1), (R(0), 1)],
                &[(A, -1), (R(0), 1)],
                &[(L(1), -1), (R(1), 1)],
            ],
        );
        assert!(no_solution(interpret(&p, &doubled)));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(0, &[L(3), L(1)]).unwrap(), Origin::Merged { parents: (1, 3) });
        assert!(matches!(
            classify(0, &[L(0), A, L(1)]),
            Err(TrackingError::NoSolution { .. })
        ));
        assert!(matches!(classify(0, &[]), Err(TrackingError::NoSolution { .. })));
        assert!(matches!(
            classify(0, &[D]),
            Err(TrackingError::ModelInconsistency { .. })
        ));
        assert!(matches!(
            classify(0, &[A, A]),
            Err(TrackingError::ModelInconsistency { .. })
        ));
    }
}
