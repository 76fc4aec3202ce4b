use serde::{Deserialize, Serialize};

/// Classifiers none of which differ significantly from each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clique {
    pub members: Vec<String>,
}

/// Find cliques in a no-difference matrix whose rows are in rank order.
///
/// Starting from each classifier `i`, the candidate grows with every `j > i`
/// that is similar to `i` and to every member taken so far. Single-member
/// candidates and subsets of an accepted clique are dropped. A pair that
/// shares one member with an accepted pair is dropped too, so a chain
/// `A~B, B~C, A≁C` gives `{A,B}` alone.
/// Returns member indices in discovery order.
pub fn find_cliques(no_difference: &[Vec<bool>]) -> Vec<Vec<usize>> {
    let n = no_difference.len();
    let mut cliques: Vec<Vec<usize>> = Vec::new();

    for i in 0..n {
        let mut candidate = vec![i];
        for j in (i + 1)..n {
            if candidate.iter().all(|&m| no_difference[m][j]) {
                candidate.push(j);
            }
        }
        if candidate.len() < 2 {
            continue;
        }
        let redundant = cliques.iter().any(|accepted| {
            let shared = candidate.iter().filter(|&m| accepted.contains(m)).count();
            shared == candidate.len() || (candidate.len() == 2 && accepted.len() == 2 && shared == 1)
        });
        if !redundant {
            cliques.push(candidate);
        }
    }
    cliques
}

/// Run [`find_cliques`] over `order` (best first) and name the members.
///
/// `no_difference` is indexed in configured classifier order.
pub fn cliques_in_order(no_difference: &[Vec<bool>], order: &[usize], names: &[String]) -> Vec<Clique> {
    let permuted: Vec<Vec<bool>> = order
        .iter()
        .map(|&a| order.iter().map(|&b| no_difference[a][b]).collect())
        .collect();
    find_cliques(&permuted)
        .into_iter()
        .map(|members| Clique {
            members: members.into_iter().map(|m| names[order[m]].clone()).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[u8]]) -> Vec<Vec<bool>> {
        rows.iter().map(|r| r.iter().map(|&v| v == 1).collect()).collect()
    }

    #[test]
    fn test_all_similar_gives_one_clique() {
        let m = matrix(&[&[1, 1, 1], &[1, 1, 1], &[1, 1, 1]]);
        assert_eq!(find_cliques(&m), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_subset_suppressed() {
        // A~B, A~C, B~C, C~D, B≁D: {B,C} is inside {A,B,C}
        let m = matrix(&[
            &[1, 1, 1, 0],
            &[1, 1, 1, 0],
            &[1, 1, 1, 1],
            &[0, 0, 1, 1],
        ]);
        assert_eq!(find_cliques(&m), vec![vec![0, 1, 2], vec![2, 3]]);
    }

    #[test]
    fn test_chain_gives_single_clique() {
        // A~B, B~C, A≁C
        let m = matrix(&[&[1, 1, 0], &[1, 1, 1], &[0, 1, 1]]);
        assert_eq!(find_cliques(&m), vec![vec![0, 1]]);
    }

    #[test]
    fn test_longer_chain() {
        // A~B~C~D, nothing else: {B,C} hangs off {A,B}, {C,D} is disjoint from it
        let m = matrix(&[
            &[1, 1, 0, 0],
            &[1, 1, 1, 0],
            &[0, 1, 1, 1],
            &[0, 0, 1, 1],
        ]);
        assert_eq!(find_cliques(&m), vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn test_disjoint_groups() {
        // {A,B} and {C,D} with nothing in between
        let m = matrix(&[
            &[1, 1, 0, 0],
            &[1, 1, 0, 0],
            &[0, 0, 1, 1],
            &[0, 0, 1, 1],
        ]);
        assert_eq!(find_cliques(&m), vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn test_overlapping_cliques() {
        // {B,C,D} brings two classifiers beyond {A,B}, so both are kept
        let m = matrix(&[
            &[1, 1, 0, 0],
            &[1, 1, 1, 1],
            &[0, 1, 1, 1],
            &[0, 1, 1, 1],
        ]);
        assert_eq!(find_cliques(&m), vec![vec![0, 1], vec![1, 2, 3]]);
    }

    #[test]
    fn test_candidate_respects_earlier_members() {
        // A~B, A~C but B≁C: only {A,B} grows from A
        let m = matrix(&[&[1, 1, 1], &[1, 1, 0], &[1, 0, 1]]);
        assert_eq!(find_cliques(&m), vec![vec![0, 1]]);
    }

    #[test]
    fn test_all_different_gives_none() {
        let m = matrix(&[&[1, 0], &[0, 1]]);
        assert!(find_cliques(&m).is_empty());
    }

    #[test]
    fn test_block_example() {
        let m = matrix(&[
            &[1, 1, 1, 0, 0],
            &[1, 1, 1, 1, 0],
            &[1, 1, 1, 1, 0],
            &[0, 1, 1, 1, 1],
            &[0, 0, 0, 1, 1],
        ]);
        assert_eq!(find_cliques(&m), vec![vec![0, 1, 2], vec![1, 2, 3], vec![3, 4]]);
    }

    #[test]
    fn test_named_in_rank_order() {
        let names: Vec<String> = vec!["A".into(), "B".into(), "C".into()];
        // configured order A, B, C; C~B only
        let m = matrix(&[&[1, 0, 0], &[0, 1, 1], &[0, 1, 1]]);
        let cliques = cliques_in_order(&m, &[2, 1, 0], &names);
        assert_eq!(
            cliques,
            vec![Clique {
                members: vec!["C".into(), "B".into()]
            }]
        );
    }
}
