use std::fmt;

/// Verdict of a single decider or of the whole decider chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Yes,
    No,
    /// Allowed in principle, but not now. Retry on a later pass.
    Throttle,
}

impl Decision {
    /// Folds verdicts in order: any `No` wins, then any `Throttle`, else `Yes`.
    ///
    /// Stops pulling from `decisions` at the first `No`.
    pub fn combine<I>(decisions: I) -> Decision
    where
        I: IntoIterator<Item = Decision>,
    {
        let mut aggregate = Decision::Yes;
        for decision in decisions {
            match decision {
                Decision::No => return Decision::No,
                Decision::Throttle => aggregate = Decision::Throttle,
                Decision::Yes => {}
            }
        }
        aggregate
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Decision::Yes)
    }

    pub fn is_no(&self) -> bool {
        matches!(self, Decision::No)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Decision::Yes => "YES",
            Decision::No => "NO",
            Decision::Throttle => "THROTTLE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_no_wins_regardless_of_position() {
        use Decision::*;
        assert_eq!(Decision::combine([No, Yes, Throttle]), No);
        assert_eq!(Decision::combine([Yes, Throttle, No]), No);
        assert_eq!(Decision::combine([Throttle, No, Yes]), No);
    }

    #[test]
    fn test_throttle_without_no() {
        use Decision::*;
        assert_eq!(Decision::combine([Yes, Throttle, Yes]), Throttle);
        assert_eq!(Decision::combine([Throttle, Throttle]), Throttle);
    }

    #[test]
    fn test_all_yes_and_empty() {
        use Decision::*;
        assert_eq!(Decision::combine([Yes, Yes, Yes]), Yes);
        assert_eq!(Decision::combine(Vec::<Decision>::new()), Yes);
    }

    #[test]
    fn test_short_circuits_on_no() {
        let mut pulled = 0;
        let decisions = [Decision::Yes, Decision::No, Decision::Throttle]
            .into_iter()
            .inspect(|_| pulled += 1);
        assert_eq!(Decision::combine(decisions), Decision::No);
        assert_eq!(pulled, 2);
    }
}
