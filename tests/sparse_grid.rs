use float_cmp::assert_approx_eq;
use itertools::iproduct;
use sparsegrid::{GridPoint, SparseGrid};

fn quadratic_bump(coords: &[f32]) -> f32 {
    coords.iter().map(|&x| x * (1.0 - x)).sum()
}

fn tolerance(expected: f32) -> f32 {
    1e-4 * expected.abs().max(1.0)
}

#[test]
fn hierarchize_then_evaluate_reconstructs_nodal_values() {
    for (d, n) in iproduct!(1..4usize, 1..4usize) {
        let mut grid = SparseGrid::new(d, n, &quadratic_bump).unwrap();
        grid.hierarchize().unwrap();

        for k in 0..grid.size() {
            let coord = sparsegrid::idx_to_coord(k, d, n).unwrap();
            let expected = quadratic_bump(&coord);
            let got = grid.evaluate(&coord).unwrap();
            assert!(
                (got - expected).abs() <= tolerance(expected),
                "d={d} n={n} k={k} got={got} expected={expected}"
            );
        }
    }
}

#[test]
fn evaluate_batch_agrees_with_sequential_evaluate() {
    let d = 4;
    let n = 3;
    let mut grid = SparseGrid::new(d, n, &quadratic_bump).unwrap();
    grid.hierarchize().unwrap();

    let coords: Vec<Vec<f32>> = (0..grid.size())
        .map(|k| sparsegrid::idx_to_coord(k, d, n).unwrap())
        .collect();

    let batch = grid.evaluate_batch(&coords).unwrap();
    let sequential: Vec<f32> = coords.iter().map(|c| grid.evaluate(c).unwrap()).collect();

    for (a, b) in batch.iter().zip(sequential.iter()) {
        assert_approx_eq!(f32, *a, *b);
    }
}

#[test]
fn zero_dimensional_grid_is_a_constant() {
    let mut grid = SparseGrid::new(0, 0, &|_: &[f32]| 3.5f32).unwrap();
    assert_eq!(grid.size(), 1);
    grid.hierarchize().unwrap();
    assert_approx_eq!(f32, grid.evaluate(&[]).unwrap(), 3.5);
}

#[test]
fn next_visits_one_point_per_subgrid() {
    let d = 3;
    let n = 2;
    let grid = SparseGrid::new(d, n, &|_: &[f32]| 0.0f32).unwrap();

    let mut visited = std::collections::HashSet::new();
    let mut point = sparsegrid::idx_to_li(0, d, n).unwrap();
    visited.insert(sparsegrid::li_to_idx(&point, n).unwrap());

    while let Some(next) = grid.next(&point).unwrap() {
        let idx = sparsegrid::li_to_idx(&next, n).unwrap();
        assert!(visited.insert(idx), "index {idx} visited twice");
        point = next;
    }

    // `next` steps between sub-grids, visiting one representative point per
    // sub-grid: Σ_{n0=0..=d} 2^n0 · C(d,n0) = 3^d of them.
    assert_eq!(visited.len(), 3usize.pow(d as u32));
}

#[test]
fn parents_of_a_level_zero_point_are_the_boundary() {
    let grid = SparseGrid::new(1, 3, &|_: &[f32]| 0.0f32).unwrap();
    let point = GridPoint {
        levels: vec![0],
        indices: vec![0],
    };

    let left = grid.left_parent(&point, 0).unwrap().unwrap();
    assert_eq!(left.levels, vec![-1]);
    assert_eq!(left.indices, vec![0]);

    let right = grid.right_parent(&point, 0).unwrap().unwrap();
    assert_eq!(right.levels, vec![-1]);
    assert_eq!(right.indices, vec![1]);
}

#[test]
fn out_of_domain_coordinates_are_rejected() {
    let grid = SparseGrid::new(2, 2, &|_: &[f32]| 0.0f32).unwrap();
    assert!(grid.evaluate(&[0.5, 1.2]).is_err());
    assert!(grid.evaluate(&[0.5]).is_err());
}
