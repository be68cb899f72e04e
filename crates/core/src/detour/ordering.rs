//! Ordering resolution for one target's applied hooks
//!
//! Produces the total order the chain rebuilder installs: index 0 intercepts
//! the call first and forwards, directly or indirectly, down to the original
//! body. Explicit before/after constraints are hard edges; priority only
//! orders records with no constraint path between them; the global creation
//! index breaks remaining ties (oldest first) so the result never depends on
//! container iteration order.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;

use super::record::HookKey;

/// Ordering-relevant view of one applied record.
pub(crate) struct OrderingNode<'a> {
    pub key: HookKey,
    pub index: u64,
    pub priority: i32,
    pub id: &'a str,
    pub before: &'a [String],
    pub after: &'a [String],
}

/// Resolver output.
pub(crate) struct Resolution {
    /// Total order, outermost first
    pub order: Vec<HookKey>,
    /// Constraint edges ignored to break cycles: (from id, to id)
    pub dropped: Vec<(String, String)>,
}

/// Ready-set entry; the heap pops the highest priority, then the oldest.
#[derive(PartialEq, Eq)]
struct Ready {
    priority: i32,
    index: u64,
    pos: usize,
}

impl Ord for Ready {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then(other.index.cmp(&self.index))
    }
}

impl PartialOrd for Ready {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// Resolve a total order over `nodes`.
///
/// Never panics and always terminates: contradictory constraints are broken
/// deterministically by emitting the best remaining record (priority, then
/// creation order) and reporting the edges that had to be ignored.
pub(crate) fn resolve(nodes: &[OrderingNode<'_>]) -> Resolution {
    if nodes.len() <= 1 {
        return Resolution {
            order: nodes.iter().map(|n| n.key).collect(),
            dropped: Vec::new(),
        };
    }

    // Normalize by creation index so input order never matters.
    let mut sorted: Vec<&OrderingNode<'_>> = nodes.iter().collect();
    sorted.sort_by_key(|n| n.index);
    let n = sorted.len();

    // edge[i][j]: record i must run before record j. Hook counts per target
    // are single digits to low tens, so the dense pairwise form is fine.
    let mut edge = vec![vec![false; n]; n];
    let mut indegree = vec![0usize; n];
    for i in 0..n {
        for j in 0..n {
            if i == j || edge[i][j] {
                continue;
            }
            let (a, b) = (sorted[i], sorted[j]);
            if a.before.iter().any(|id| id == b.id) || b.after.iter().any(|id| id == a.id) {
                edge[i][j] = true;
                indegree[j] += 1;
            }
        }
    }

    let mut heap: BinaryHeap<Ready> = (0..n)
        .filter(|&i| indegree[i] == 0)
        .map(|i| Ready {
            priority: sorted[i].priority,
            index: sorted[i].index,
            pos: i,
        })
        .collect();

    let mut emitted = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut dropped = Vec::new();

    while order.len() < n {
        let pos = match heap.pop() {
            Some(ready) => ready.pos,
            None => {
                // Constraint cycle: emit the best remaining record and
                // ignore the edges still pointing at it.
                let Some(pos) = (0..n).filter(|&i| !emitted[i]).max_by(|&a, &b| {
                    sorted[a]
                        .priority
                        .cmp(&sorted[b].priority)
                        .then(sorted[b].index.cmp(&sorted[a].index))
                }) else {
                    break;
                };
                for i in (0..n).filter(|&i| !emitted[i]) {
                    if edge[i][pos] {
                        dropped.push((sorted[i].id.to_string(), sorted[pos].id.to_string()));
                    }
                }
                pos
            }
        };

        emitted[pos] = true;
        order.push(sorted[pos].key);
        for j in 0..n {
            if edge[pos][j] && !emitted[j] {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    heap.push(Ready {
                        priority: sorted[j].priority,
                        index: sorted[j].index,
                        pos: j,
                    });
                }
            }
        }
    }

    Resolution { order, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    struct HookDecl {
        id: &'static str,
        priority: i32,
        before: Vec<String>,
        after: Vec<String>,
    }

    impl HookDecl {
        fn new(id: &'static str) -> Self {
            Self {
                id,
                priority: 0,
                before: Vec::new(),
                after: Vec::new(),
            }
        }

        fn priority(mut self, p: i32) -> Self {
            self.priority = p;
            self
        }

        fn before(mut self, id: &str) -> Self {
            self.before.push(id.to_string());
            self
        }

        fn after(mut self, id: &str) -> Self {
            self.after.push(id.to_string());
            self
        }
    }

    /// Builds keys + nodes in creation order, then resolves the given
    /// permutation of them and returns the resolved ids.
    fn resolve_ids(decls: &[HookDecl], permutation: &[usize]) -> Vec<&'static str> {
        let mut keys: SlotMap<HookKey, &'static str> = SlotMap::with_key();
        let minted: Vec<(HookKey, u64)> = decls
            .iter()
            .enumerate()
            .map(|(i, s)| (keys.insert(s.id), i as u64))
            .collect();

        let nodes: Vec<OrderingNode<'_>> = permutation
            .iter()
            .map(|&i| OrderingNode {
                key: minted[i].0,
                index: minted[i].1,
                priority: decls[i].priority,
                id: decls[i].id,
                before: &decls[i].before,
                after: &decls[i].after,
            })
            .collect();

        resolve(&nodes).order.iter().map(|&k| keys[k]).collect()
    }

    fn identity(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_empty_and_single() {
        assert!(resolve(&[]).order.is_empty());
        assert_eq!(resolve_ids(&[HookDecl::new("only")], &[0]), vec!["only"]);
    }

    #[test]
    fn test_creation_order_breaks_ties() {
        let decls = [HookDecl::new("a"), HookDecl::new("b"), HookDecl::new("c")];
        assert_eq!(resolve_ids(&decls, &identity(3)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_higher_priority_sorts_earlier() {
        let decls = [HookDecl::new("low"), HookDecl::new("high").priority(10)];
        assert_eq!(resolve_ids(&decls, &identity(2)), vec!["high", "low"]);
    }

    #[test]
    fn test_before_constraint_satisfied() {
        let decls = [HookDecl::new("a"), HookDecl::new("b").before("a")];
        assert_eq!(resolve_ids(&decls, &identity(2)), vec!["b", "a"]);
    }

    #[test]
    fn test_after_constraint_satisfied() {
        let decls = [HookDecl::new("a").after("b"), HookDecl::new("b")];
        assert_eq!(resolve_ids(&decls, &identity(2)), vec!["b", "a"]);
    }

    #[test]
    fn test_constraint_overrides_priority() {
        // "strong" would sort first by priority, but explicitly runs after
        // "weak".
        let decls = [HookDecl::new("weak"), HookDecl::new("strong").priority(100).after("weak")];
        assert_eq!(resolve_ids(&decls, &identity(2)), vec!["weak", "strong"]);
    }

    #[test]
    fn test_three_hook_scenario() {
        // H1(p0,"A"), H2(p0,"B",after A), H3(p10,"C") created in that order
        // resolves to [C, A, B].
        let decls = [
            HookDecl::new("A"),
            HookDecl::new("B").after("A"),
            HookDecl::new("C").priority(10),
        ];
        assert_eq!(resolve_ids(&decls, &identity(3)), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let decls = [
            HookDecl::new("A").priority(3),
            HookDecl::new("B").after("A"),
            HookDecl::new("C").priority(-5),
            HookDecl::new("D").before("A"),
            HookDecl::new("E"),
        ];
        let baseline = resolve_ids(&decls, &identity(5));
        let permutations = [
            vec![4, 3, 2, 1, 0],
            vec![1, 3, 0, 4, 2],
            vec![2, 0, 4, 1, 3],
            vec![3, 4, 1, 2, 0],
        ];
        for perm in &permutations {
            assert_eq!(resolve_ids(&decls, perm), baseline);
        }
    }

    #[test]
    fn test_cycle_terminates_and_reports() {
        let decls = [HookDecl::new("a").before("b"), HookDecl::new("b").before("a")];

        let mut keys: SlotMap<HookKey, ()> = SlotMap::with_key();
        let ka = keys.insert(());
        let kb = keys.insert(());
        let nodes = vec![
            OrderingNode {
                key: ka,
                index: 0,
                priority: 0,
                id: decls[0].id,
                before: &decls[0].before,
                after: &decls[0].after,
            },
            OrderingNode {
                key: kb,
                index: 1,
                priority: 0,
                id: decls[1].id,
                before: &decls[1].before,
                after: &decls[1].after,
            },
        ];

        let resolution = resolve(&nodes);
        assert_eq!(resolution.order.len(), 2);
        // Oldest wins the tie, so "a" is emitted first and the b->a edge is
        // the one dropped.
        assert_eq!(resolution.order[0], ka);
        assert_eq!(resolution.dropped, vec![("b".to_string(), "a".to_string())]);
    }

    #[test]
    fn test_cycle_among_three_keeps_remaining_constraints() {
        // a -> b -> c -> a; breaking at the oldest keeps b and c ordered.
        let decls = [
            HookDecl::new("a").before("b"),
            HookDecl::new("b").before("c"),
            HookDecl::new("c").before("a"),
        ];
        let order = resolve_ids(&decls, &identity(3));
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_constraint_edges_counted_once() {
        // Both a.before=b and b.after=a describe the same edge.
        let decls = [HookDecl::new("a").before("b"), HookDecl::new("b").after("a")];
        assert_eq!(resolve_ids(&decls, &identity(2)), vec!["a", "b"]);
    }
}
