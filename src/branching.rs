//! Arc branching on aggregated route flows.

use crate::route::Route;
use crate::view::{ArcFix, FixKind, NodeView};

/// Flows at or below this value count as zero
pub const FLOW_EPSILON: f64 = 1e-6;

/// Open interval of flows that count as one
const NEAR_ONE: (f64, f64) = (0.9999999999, 1.0000000001);

/// Outcome of the branching rule on a node's flow matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BranchChoice {
    Integral,
    Fractional {
        from: usize,
        to: usize,
        /// Aggregated flow on the arc
        value: f64,
        /// Side explored first
        first: FixKind,
    },
}

impl BranchChoice {
    /// Child fixes, first-explored side first
    pub fn children(&self) -> Option<[ArcFix; 2]> {
        match *self {
            BranchChoice::Integral => None,
            BranchChoice::Fractional { from, to, first, .. } => Some([
                ArcFix { from, to, kind: first },
                ArcFix {
                    from,
                    to,
                    kind: first.opposite(),
                },
            ]),
        }
    }
}

#[inline]
pub fn is_fractional(flow: f64) -> bool {
    flow > FLOW_EPSILON && (flow < NEAR_ONE.0 || flow > NEAR_ONE.1)
}

/// Most fractional arc of `edges`, scanning rows then columns. The first arc
/// reaching the best score wins.
pub fn choose_branch_arc(edges: &[Vec<f64>]) -> BranchChoice {
    let mut best_score = f64::NEG_INFINITY;
    let mut choice = BranchChoice::Integral;
    for (i, row) in edges.iter().enumerate() {
        for (j, &c) in row.iter().enumerate() {
            if !is_fractional(c) {
                continue;
            }
            let score = 0.5 - (c - 0.5).abs();
            if score > best_score {
                best_score = score;
                let first = if (1.0 - c).abs() > c {
                    FixKind::Forbid
                } else {
                    FixKind::Impose
                };
                choice = BranchChoice::Fractional {
                    from: i,
                    to: j,
                    value: c,
                    first,
                };
            }
        }
    }
    choice
}

/// Seed columns of a child created by `fix`. `view` must already hold the
/// child's `dist`. Trivial routes are always kept.
pub fn filter_routes(view: &NodeView, routes: &[Route], fix: &ArcFix) -> Vec<Route> {
    routes
        .iter()
        .filter(|route| {
            route.is_trivial()
                || match fix.kind {
                    FixKind::Forbid => !route.uses_arc(fix.from, fix.to),
                    FixKind::Impose => view.allows(route),
                }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{GeneratorConfig, Instance};

    fn flows(n: usize, entries: &[(usize, usize, f64)]) -> Vec<Vec<f64>> {
        let mut edges = vec![vec![0.0; n]; n];
        for &(i, j, c) in entries {
            edges[i][j] = c;
        }
        edges
    }

    #[test]
    fn test_integral_window() {
        assert!(!is_fractional(0.0));
        assert!(!is_fractional(1e-7));
        assert!(!is_fractional(1.0));
        assert!(!is_fractional(0.99999999999));
        assert!(!is_fractional(1.00000000001));
        assert!(is_fractional(0.999999));
        assert!(is_fractional(1.5));
        assert!(is_fractional(0.3));
        let edges = flows(4, &[(0, 1, 1.0), (1, 3, 1.0), (0, 2, 2.0)]);
        // a flow of 2 on a depot arc is still branched on
        assert!(matches!(choose_branch_arc(&edges), BranchChoice::Fractional { from: 0, to: 2, .. }));
        let edges = flows(4, &[(0, 1, 1.0), (1, 3, 1.0)]);
        assert_eq!(choose_branch_arc(&edges), BranchChoice::Integral);
    }

    #[test]
    fn test_most_fractional_first_wins_ties() {
        let edges = flows(5, &[(0, 1, 0.3), (1, 2, 0.5), (2, 3, 0.5), (3, 4, 0.7)]);
        match choose_branch_arc(&edges) {
            BranchChoice::Fractional { from, to, value, .. } => {
                assert_eq!((from, to), (1, 2));
                assert_eq!(value, 0.5);
            }
            BranchChoice::Integral => panic!("expected a fractional arc"),
        }
    }

    #[test]
    fn test_first_branch_direction() {
        let low = choose_branch_arc(&flows(3, &[(0, 1, 0.3)]));
        assert!(matches!(low, BranchChoice::Fractional { first: FixKind::Forbid, .. }));
        let high = choose_branch_arc(&flows(3, &[(0, 1, 0.7)]));
        assert!(matches!(high, BranchChoice::Fractional { first: FixKind::Impose, .. }));
        let half = choose_branch_arc(&flows(3, &[(0, 1, 0.5)]));
        assert!(matches!(half, BranchChoice::Fractional { first: FixKind::Impose, .. }));

        let [a, b] = high.children().unwrap();
        assert_eq!(a, ArcFix::impose(0, 1));
        assert_eq!(b, ArcFix::forbid(0, 1));
        assert!(BranchChoice::Integral.children().is_none());
    }

    #[test]
    fn test_filter_routes() {
        let instance = Instance::random("filter", 5, 1, &GeneratorConfig::default()).unwrap();
        let routes = vec![
            Route::new(vec![0, 1, 6]),
            Route::new(vec![0, 1, 2, 6]),
            Route::new(vec![0, 2, 1, 6]),
            Route::new(vec![0, 3, 2, 6]),
            Route::new(vec![0, 4, 5, 6]),
        ];

        let forbid = ArcFix::forbid(1, 2);
        let mut view = NodeView::new(&instance);
        view.install(&instance, &[forbid]);
        let kept = filter_routes(&view, &routes, &forbid);
        let paths: Vec<_> = kept.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths.len(), 4);
        assert!(!paths.contains(&vec![0, 1, 2, 6]));

        let impose = ArcFix::impose(1, 2);
        view.install(&instance, &[impose]);
        let kept = filter_routes(&view, &routes, &impose);
        let paths: Vec<_> = kept.iter().map(|r| r.path.clone()).collect();
        // 1 must be followed by 2 and 2 preceded by 1
        assert_eq!(
            paths,
            vec![vec![0, 1, 6], vec![0, 1, 2, 6], vec![0, 4, 5, 6]]
        );
    }
}
