use crate::normalize::{NormalizedTest, Position};

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved { from: Position, to: Position },
    /// Boundary reached; the position did not change.
    Stay,
    /// `next()` was requested on the final stop of the final part.
    End,
}

impl Step {
    #[must_use]
    pub fn moved_to(&self) -> Option<Position> {
        match self {
            Step::Moved { to, .. } => Some(*to),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PartLayout {
    steps: usize,
    indexed: bool,
}

/// Two-level cursor over parts and their stops.
///
/// Forward motion enters a part at its first stop; backward motion re-enters
/// the previous part at its last stop.
#[derive(Debug, Clone)]
pub struct Navigator {
    layout: Vec<PartLayout>,
    position: Position,
}

impl Navigator {
    /// Returns `None` for a test without parts.
    #[must_use]
    pub fn new(test: &NormalizedTest) -> Option<Self> {
        let layout: Vec<PartLayout> = test
            .parts
            .iter()
            .map(|p| PartLayout {
                steps: p.step_count().max(1),
                indexed: p.is_indexed(),
            })
            .collect();
        let first = *layout.first()?;
        Some(Self {
            position: Position::new(0, first.indexed.then_some(0)),
            layout,
        })
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn part_count(&self) -> usize {
        self.layout.len()
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.position.part == 0 && self.step() == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        let part = self.position.part;
        part + 1 == self.layout.len() && self.step() + 1 == self.layout[part].steps
    }

    pub fn next(&mut self) -> Step {
        let part = self.position.part;
        let step = self.step();
        let target = if step + 1 < self.layout[part].steps {
            Position::new(part, Some(step + 1))
        } else if part + 1 < self.layout.len() {
            self.first_of(part + 1)
        } else {
            return Step::End;
        };
        self.move_to(target)
    }

    pub fn back(&mut self) -> Step {
        let part = self.position.part;
        let step = self.step();
        let target = if step > 0 {
            Position::new(part, Some(step - 1))
        } else if part > 0 {
            self.last_of(part - 1)
        } else {
            return Step::Stay;
        };
        self.move_to(target)
    }

    /// Enter `part` at its first stop. Out-of-range parts are ignored.
    pub fn jump_to_part(&mut self, part: usize) -> Step {
        if part >= self.layout.len() {
            return Step::Stay;
        }
        let target = self.first_of(part);
        if target == self.position {
            return Step::Stay;
        }
        self.move_to(target)
    }

    fn step(&self) -> usize {
        self.position.sub_unit.unwrap_or(0)
    }

    fn first_of(&self, part: usize) -> Position {
        Position::new(part, self.layout[part].indexed.then_some(0))
    }

    fn last_of(&self, part: usize) -> Position {
        let layout = self.layout[part];
        Position::new(part, layout.indexed.then_some(layout.steps - 1))
    }

    fn move_to(&mut self, to: Position) -> Step {
        let from = self.position;
        self.position = to;
        Step::Moved { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Part, PartBody, PartId};
    use crate::normalize::fixtures::*;
    use crate::normalize::normalize;
    use proptest::prelude::*;

    fn nav(parts: Vec<Part>) -> (NormalizedTest, Navigator) {
        let test = normalize(&document(parts));
        let nav = Navigator::new(&test).unwrap();
        (test, nav)
    }

    #[test]
    fn starts_at_first_stop() {
        let (_, grouped) = nav(vec![conversations(1, 3)]);
        assert_eq!(grouped.position(), Position::new(0, Some(0)));
        assert!(grouped.is_first());

        let (_, single) = nav(vec![monologue(1, 3)]);
        assert_eq!(single.position(), Position::new(0, None));
        assert!(single.is_last());
    }

    #[test]
    fn empty_test_has_no_navigator() {
        let test = normalize(&document(Vec::new()));
        assert!(Navigator::new(&test).is_none());
    }

    #[test]
    fn four_steps_from_discrete_reach_second_conversation() {
        let (test, mut nav) = nav(vec![discrete(1, 3), conversations(2, 2)]);
        for _ in 0..4 {
            assert!(matches!(nav.next(), Step::Moved { .. }));
        }
        assert_eq!(nav.position(), Position::new(1, Some(1)));
        assert_eq!(test.question_number(nav.position()), Some(5));
        assert_eq!(nav.next(), Step::End);
        assert_eq!(nav.position(), Position::new(1, Some(1)));
    }

    #[test]
    fn back_reenters_previous_part_at_its_end() {
        let (_, mut nav) = nav(vec![lectures(1, &[2, 2, 1]), conversations(2, 2)]);
        nav.jump_to_part(1);
        assert_eq!(nav.position(), Position::new(1, Some(0)));

        let step = nav.back();
        assert_eq!(
            step,
            Step::Moved {
                from: Position::new(1, Some(0)),
                to: Position::new(0, Some(2)),
            }
        );
    }

    #[test]
    fn back_at_start_is_a_no_op() {
        let (_, mut nav) = nav(vec![discrete(1, 2)]);
        assert_eq!(nav.back(), Step::Stay);
        assert_eq!(nav.position(), Position::new(0, Some(0)));
    }

    #[test]
    fn unsupported_parts_are_stepped_over_like_any_other() {
        let (test, mut nav) = nav(vec![
            discrete(1, 1),
            Part::new(PartId::new(2), PartBody::Unsupported),
            monologue(3, 2),
        ]);
        nav.next();
        assert!(test.unit(nav.position()).unwrap().is_unsupported());
        nav.next();
        assert_eq!(nav.position(), Position::new(2, None));
    }

    #[test]
    fn jump_ignores_out_of_range_and_current() {
        let (_, mut nav) = nav(vec![discrete(1, 2), monologue(2, 1)]);
        assert_eq!(nav.jump_to_part(5), Step::Stay);
        assert_eq!(nav.jump_to_part(0), Step::Stay);
        assert_eq!(nav.jump_to_part(1).moved_to(), Some(Position::new(1, None)));
    }

    fn part_strategy() -> impl Strategy<Value = (u8, u64)> {
        (0u8..5, 0u64..4)
    }

    fn build_part(index: usize, (kind, size): (u8, u64)) -> Part {
        let id = index as u64 + 1;
        match kind {
            0 => discrete(id, size),
            1 => conversations(id, size),
            2 => monologue(id, size),
            3 => lectures(id, &vec![2; size as usize]),
            _ => Part::new(PartId::new(id), PartBody::Unsupported),
        }
    }

    proptest! {
        #[test]
        fn navigation_stays_in_bounds(
            shapes in prop::collection::vec(part_strategy(), 1..6),
            moves in prop::collection::vec(any::<bool>(), 0..40),
        ) {
            let parts = shapes.into_iter().enumerate().map(|(i, s)| build_part(i, s)).collect();
            let (test, mut nav) = nav(parts);
            for forward in moves {
                if forward { nav.next(); } else { nav.back(); }
                prop_assert!(test.unit(nav.position()).is_some());
            }
        }

        #[test]
        fn next_then_back_is_identity(
            shapes in prop::collection::vec(part_strategy(), 1..6),
            warmup in 0usize..20,
        ) {
            let parts = shapes.into_iter().enumerate().map(|(i, s)| build_part(i, s)).collect();
            let (_, mut nav) = nav(parts);
            for _ in 0..warmup {
                nav.next();
            }
            let before = nav.position();
            if let Step::Moved { from, .. } = nav.next() {
                prop_assert_eq!(from, before);
                nav.back();
                prop_assert_eq!(nav.position(), before);
            } else {
                prop_assert!(nav.is_last());
            }
        }
    }
}
