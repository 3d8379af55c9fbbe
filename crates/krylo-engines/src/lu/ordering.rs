//! Fill-reducing column orderings.

use std::collections::BTreeSet;

use log::trace;

use super::{ColPerm, CompCol};

/// Fill `perm_c` so that column `j` of `A` is placed at position `perm_c[j]`.
///
/// `perm_c` must hold at least `ncol` entries; `A` is assumed validated.
pub fn get_perm_c<T: Copy>(kind: ColPerm, a: &CompCol<T>, perm_c: &mut [i32]) {
    let n = a.ncol().max(0) as usize;
    let order = match kind {
        ColPerm::Natural => (0..n).collect(),
        ColPerm::MmdAtA => minimum_degree(at_a_graph(a)),
        ColPerm::MmdAtPlusA => minimum_degree(at_plus_a_graph(a)),
        ColPerm::Colamd => colamd(a),
    };
    for (pos, &col) in order.iter().enumerate() {
        perm_c[col] = pos as i32;
    }
    trace!("get_perm_c: {:?} ordering for {} columns", kind, n);
}

fn column_rows<T: Copy>(a: &CompCol<T>, j: usize) -> impl Iterator<Item = usize> + '_ {
    a.column(j).0.iter().map(|&r| r as usize)
}

/// Column adjacency of `A^T A`: columns sharing a row are connected.
fn at_a_graph<T: Copy>(a: &CompCol<T>) -> Vec<BTreeSet<usize>> {
    let n = a.ncol() as usize;
    let mut row_cols: Vec<Vec<usize>> = vec![Vec::new(); a.nrow() as usize];
    for j in 0..n {
        for r in column_rows(a, j) {
            row_cols[r].push(j);
        }
    }
    let mut adj = vec![BTreeSet::new(); n];
    for cols in &row_cols {
        for &u in cols {
            for &v in cols {
                if u != v {
                    adj[u].insert(v);
                }
            }
        }
    }
    adj
}

/// Symmetric pattern of `A^T + A`, diagonal excluded.
fn at_plus_a_graph<T: Copy>(a: &CompCol<T>) -> Vec<BTreeSet<usize>> {
    let n = a.ncol() as usize;
    let mut adj = vec![BTreeSet::new(); n];
    for j in 0..n {
        for i in column_rows(a, j) {
            if i != j && i < n {
                adj[i].insert(j);
                adj[j].insert(i);
            }
        }
    }
    adj
}

/// Exact minimum degree with explicit fill. Ties go to the lowest index.
fn minimum_degree(mut adj: Vec<BTreeSet<usize>>) -> Vec<usize> {
    let n = adj.len();
    let mut queue: BTreeSet<(usize, usize)> = adj.iter().enumerate().map(|(v, s)| (s.len(), v)).collect();
    let mut order = Vec::with_capacity(n);

    while let Some((_, v)) = queue.pop_first() {
        order.push(v);
        let nbrs = std::mem::take(&mut adj[v]);
        for &u in &nbrs {
            queue.remove(&(adj[u].len(), u));
            adj[u].remove(&v);
            for &w in &nbrs {
                if w != u {
                    adj[u].insert(w);
                }
            }
            queue.insert((adj[u].len(), u));
        }
    }
    order
}

/// Column approximate minimum degree.
///
/// Eliminates columns of `A` directly: the rows touched by the pivot column
/// collapse into a single element row, and each column is scored by the sum
/// of its element sizes. Dense rows are ignored and dense columns are
/// ordered last.
fn colamd<T: Copy>(a: &CompCol<T>) -> Vec<usize> {
    let n = a.ncol() as usize;
    let m = a.nrow() as usize;
    if n == 0 {
        return Vec::new();
    }
    let dense = (10.0 * (n.max(m) as f64).sqrt()).max(16.0) as usize;

    let mut rows: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); m];
    let mut dense_cols = Vec::new();
    let mut live = vec![false; n];
    for j in 0..n {
        if a.column(j).0.len() > dense {
            dense_cols.push(j);
            continue;
        }
        live[j] = true;
        for r in column_rows(a, j) {
            rows[r].insert(j);
        }
    }
    for row in rows.iter_mut() {
        if row.len() > dense {
            row.clear();
        }
    }

    let mut cols: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for (r, row) in rows.iter().enumerate() {
        for &j in row {
            cols[j].insert(r);
        }
    }

    let score = |j: usize, rows: &[BTreeSet<usize>], cols: &[BTreeSet<usize>]| -> usize {
        cols[j].iter().map(|&r| rows[r].len().saturating_sub(1)).sum::<usize>().min(n)
    };
    let mut scores = vec![0usize; n];
    let mut queue = BTreeSet::new();
    for j in (0..n).filter(|&j| live[j]) {
        scores[j] = score(j, &rows, &cols);
        queue.insert((scores[j], j));
    }

    let mut order = Vec::with_capacity(n);
    while let Some((_, p)) = queue.pop_first() {
        order.push(p);

        // Merge the pivot's rows into one element row.
        let merged_rows = std::mem::take(&mut cols[p]);
        let Some(&element) = merged_rows.first() else { continue };
        let mut pattern = BTreeSet::new();
        for &r in &merged_rows {
            for c in std::mem::take(&mut rows[r]) {
                if c != p {
                    pattern.insert(c);
                }
                if r != element {
                    cols[c].remove(&r);
                }
            }
        }
        for &c in &pattern {
            cols[c].insert(element);
        }
        rows[element] = pattern;

        let touched: Vec<usize> = rows[element].iter().copied().collect();
        for c in touched {
            queue.remove(&(scores[c], c));
            scores[c] = score(c, &rows, &cols);
            queue.insert((scores[c], c));
        }
    }
    order.extend(dense_cols);
    order
}
