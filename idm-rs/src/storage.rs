//! Row-partitioned matrix storage.
//!
//! Each worker fills a [`RowBlock`] covering the rows it owns. [`commit`] is
//! the collective step that joins the blocks into a [`DistributedMatrix`],
//! which is read-only afterwards.

use std::ops::Range;

use nalgebra::DMatrix;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("row {row} is not owned by this block ({start}..{end})")]
    RowNotOwned {
        row: usize,
        start: usize,
        end: usize,
    },
    #[error("column {col} is out of range (0..{ncols})")]
    ColumnOutOfRange { col: usize, ncols: usize },
    #[error("cannot commit matrix: {0}")]
    Layout(String),
}

pub trait RowBlock {
    fn owned_row_range(&self) -> Range<usize>;

    fn ncols(&self) -> usize;

    /// Insert semantics: a second write to the same entry replaces it.
    fn set_value(&mut self, row: usize, col: usize, value: f64) -> Result<(), BackendError>;

    /// Value at a global `(row, col)`, `None` if the row is not owned.
    fn get(&self, row: usize, col: usize) -> Option<f64>;

    fn nnz(&self) -> usize;
}

fn check_index(
    rows: &Range<usize>,
    ncols: usize,
    row: usize,
    col: usize,
) -> Result<(), BackendError> {
    if !rows.contains(&row) {
        return Err(BackendError::RowNotOwned {
            row,
            start: rows.start,
            end: rows.end,
        });
    }
    if col >= ncols {
        return Err(BackendError::ColumnOutOfRange { col, ncols });
    }
    Ok(())
}

/// Dense row block.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseBlock {
    rows: Range<usize>,
    values: DMatrix<f64>,
}

impl DenseBlock {
    pub fn new(rows: Range<usize>, ncols: usize) -> Self {
        let values = DMatrix::zeros(rows.len(), ncols);
        Self { rows, values }
    }

    /// Local values; row `i` is global row `owned_row_range().start + i`.
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }
}

impl RowBlock for DenseBlock {
    fn owned_row_range(&self) -> Range<usize> {
        self.rows.clone()
    }

    fn ncols(&self) -> usize {
        self.values.ncols()
    }

    fn set_value(&mut self, row: usize, col: usize, value: f64) -> Result<(), BackendError> {
        check_index(&self.rows, self.ncols(), row, col)?;
        self.values[(row - self.rows.start, col)] = value;
        Ok(())
    }

    fn get(&self, row: usize, col: usize) -> Option<f64> {
        check_index(&self.rows, self.ncols(), row, col).ok()?;
        Some(self.values[(row - self.rows.start, col)])
    }

    fn nnz(&self) -> usize {
        self.values.len()
    }
}

/// Sparse row block: each row keeps its entries sorted by column.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseBlock {
    rows: Range<usize>,
    ncols: usize,
    entries: Vec<Vec<(usize, f64)>>,
}

impl SparseBlock {
    /// Preallocates `per_row` entries for every owned row.
    pub fn with_capacity(rows: Range<usize>, ncols: usize, per_row: usize) -> Self {
        let entries = (0..rows.len())
            .map(|_| Vec::with_capacity(per_row))
            .collect();
        Self {
            rows,
            ncols,
            entries,
        }
    }

    /// Entries of a global row, `None` if the row is not owned.
    pub fn row(&self, row: usize) -> Option<&[(usize, f64)]> {
        if !self.rows.contains(&row) {
            return None;
        }
        Some(&self.entries[row - self.rows.start])
    }
}

impl RowBlock for SparseBlock {
    fn owned_row_range(&self) -> Range<usize> {
        self.rows.clone()
    }

    fn ncols(&self) -> usize {
        self.ncols
    }

    fn set_value(&mut self, row: usize, col: usize, value: f64) -> Result<(), BackendError> {
        check_index(&self.rows, self.ncols, row, col)?;
        let entries = &mut self.entries[row - self.rows.start];
        match entries.binary_search_by_key(&col, |&(c, _)| c) {
            Ok(pos) => entries[pos].1 = value,
            Err(pos) => entries.insert(pos, (col, value)),
        }
        Ok(())
    }

    fn get(&self, row: usize, col: usize) -> Option<f64> {
        let entries = self.row(row)?;
        if col >= self.ncols {
            return None;
        }
        Some(
            entries
                .binary_search_by_key(&col, |&(c, _)| c)
                .map_or(0.0, |pos| entries[pos].1),
        )
    }

    fn nnz(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributedMatrix<B> {
    nrows: usize,
    ncols: usize,
    blocks: Vec<B>,
}

/// Joins per-worker blocks, ordered by rank, into one matrix.
///
/// The blocks must be contiguous from row 0, cover exactly `nrows` rows and
/// agree on `ncols`.
pub fn commit<B: RowBlock>(
    nrows: usize,
    ncols: usize,
    blocks: Vec<B>,
) -> Result<DistributedMatrix<B>, BackendError> {
    let mut next = 0;
    for (rank, block) in blocks.iter().enumerate() {
        let rows = block.owned_row_range();
        if rows.start != next {
            return Err(BackendError::Layout(format!(
                "block {rank} starts at row {} but row {next} was expected",
                rows.start
            )));
        }
        if block.ncols() != ncols {
            return Err(BackendError::Layout(format!(
                "block {rank} has {} columns, expected {ncols}",
                block.ncols()
            )));
        }
        next = rows.end;
    }
    if next != nrows {
        return Err(BackendError::Layout(format!(
            "blocks cover {next} rows, expected {nrows}"
        )));
    }
    Ok(DistributedMatrix {
        nrows,
        ncols,
        blocks,
    })
}

impl<B: RowBlock> DistributedMatrix<B> {
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn blocks(&self) -> &[B] {
        &self.blocks
    }

    pub fn ownership_range(&self, rank: usize) -> Option<Range<usize>> {
        self.blocks.get(rank).map(RowBlock::owned_row_range)
    }

    pub fn owner_of_row(&self, row: usize) -> Option<usize> {
        if row >= self.nrows {
            return None;
        }
        Some(
            self.blocks
                .partition_point(|b| b.owned_row_range().end <= row),
        )
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let rank = self.owner_of_row(row)?;
        self.blocks[rank].get(row, col)
    }

    pub fn nnz(&self) -> usize {
        self.blocks.iter().map(RowBlock::nnz).sum()
    }
}

impl DistributedMatrix<SparseBlock> {
    pub fn row(&self, row: usize) -> Option<&[(usize, f64)]> {
        let rank = self.owner_of_row(row)?;
        self.blocks[rank].row(row)
    }

    pub fn rows(&self) -> impl Iterator<Item = (usize, &[(usize, f64)])> {
        (0..self.nrows).filter_map(|row| self.row(row).map(|entries| (row, entries)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_block_bounds() {
        let mut block = DenseBlock::new(3..5, 2);
        block.set_value(4, 1, 2.5).unwrap();
        assert_eq!(block.get(4, 1), Some(2.5));
        assert_eq!(block.get(3, 0), Some(0.0));
        assert_eq!(block.get(5, 0), None);
        assert_eq!(
            block.set_value(2, 0, 1.0),
            Err(BackendError::RowNotOwned {
                row: 2,
                start: 3,
                end: 5,
            })
        );
        assert_eq!(
            block.set_value(3, 2, 1.0),
            Err(BackendError::ColumnOutOfRange { col: 2, ncols: 2 })
        );
    }

    #[test]
    fn test_sparse_block_insert_replaces() {
        let mut block = SparseBlock::with_capacity(0..2, 10, 4);
        block.set_value(1, 7, 0.25).unwrap();
        block.set_value(1, 3, 0.5).unwrap();
        block.set_value(1, 7, 0.5).unwrap();
        assert_eq!(block.row(1), Some(&[(3, 0.5), (7, 0.5)][..]));
        assert_eq!(block.nnz(), 2);
        assert_eq!(block.get(0, 3), Some(0.0));
        assert_eq!(block.get(1, 10), None);
    }

    #[test]
    fn test_commit_checks_layout() {
        let ok = commit(5, 3, vec![DenseBlock::new(0..2, 3), DenseBlock::new(2..5, 3)]);
        let matrix = ok.unwrap();
        assert_eq!(matrix.owner_of_row(2), Some(1));
        assert_eq!(matrix.ownership_range(0), Some(0..2));
        assert_eq!(matrix.nnz(), 15);

        let gap = commit(5, 3, vec![DenseBlock::new(0..2, 3), DenseBlock::new(3..5, 3)]);
        assert!(matches!(gap, Err(BackendError::Layout(_))));
        let short = commit(6, 3, vec![DenseBlock::new(0..2, 3), DenseBlock::new(2..5, 3)]);
        assert!(matches!(short, Err(BackendError::Layout(_))));
        let cols = commit(5, 3, vec![DenseBlock::new(0..2, 3), DenseBlock::new(2..5, 4)]);
        assert!(matches!(cols, Err(BackendError::Layout(_))));
    }

    #[test]
    fn test_owner_skips_empty_blocks() {
        let blocks = vec![
            SparseBlock::with_capacity(0..2, 2, 1),
            SparseBlock::with_capacity(2..2, 2, 1),
            SparseBlock::with_capacity(2..3, 2, 1),
        ];
        let matrix = commit(3, 2, blocks).unwrap();
        assert_eq!(matrix.owner_of_row(1), Some(0));
        assert_eq!(matrix.owner_of_row(2), Some(2));
        assert_eq!(matrix.owner_of_row(3), None);
        assert_eq!(matrix.rows().count(), 3);
    }
}
