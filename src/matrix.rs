//! Sample Matrix
//!
//! A row-major table of `rows` samples by `columns` channels as returned by
//! the instrument. Column 0 is the timestamp / elapsed-time channel.

use std::io::{self, Write};

use crate::error::{Result, TensormeterError};

/// Boundary rule of the recency filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowEdge {
    /// Keep rows strictly closer than `max_elapsed` to the newest row
    #[default]
    Exclusive,

    /// Also keep rows exactly `max_elapsed` from the newest row
    Inclusive,
}

impl WindowEdge {
    /// Whether a row `distance` away from the newest row lies in the window
    pub fn admits(&self, distance: f64, max_elapsed: f64) -> bool {
        match self {
            WindowEdge::Exclusive => distance < max_elapsed,
            WindowEdge::Inclusive => distance <= max_elapsed,
        }
    }
}

/// Row-major matrix of f64 samples
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatrix {
    rows: usize,
    columns: usize,
    data: Vec<f64>,
}

impl SampleMatrix {
    /// Build a matrix from row-major values
    pub fn from_vec(rows: usize, columns: usize, data: Vec<f64>) -> Result<Self> {
        let expected = rows.checked_mul(columns).ok_or_else(|| {
            TensormeterError::Protocol(format!("Matrix shape {} x {} overflows", rows, columns))
        })?;
        if data.len() != expected {
            return Err(TensormeterError::Protocol(format!(
                "{} x {} matrix needs {} values, got {}",
                rows,
                columns,
                expected,
                data.len()
            )));
        }
        Ok(Self { rows, columns, data })
    }

    /// Build a matrix from equally long rows
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let columns = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * columns);
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != columns {
                return Err(TensormeterError::Protocol(format!(
                    "Row {} has {} values, expected {}",
                    index,
                    row.len(),
                    columns
                )));
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(rows.len(), columns, data)
    }

    /// A matrix with no rows
    pub fn empty(columns: usize) -> Self {
        Self { rows: 0, columns, data: Vec::new() }
    }

    /// Number of samples
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of channels
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Row-major view of all values
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Take the row-major values
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Value at `(row, column)`, `None` when out of range
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        Some(self.data[row * self.columns + column])
    }

    /// One sample across all channels
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.columns;
        Some(&self.data[start..start + self.columns])
    }

    /// The newest sample
    pub fn last_row(&self) -> Option<&[f64]> {
        self.rows.checked_sub(1).and_then(|last| self.row(last))
    }

    /// Iterate over the rows in order
    pub fn iter_rows(&self) -> impl DoubleEndedIterator<Item = &[f64]> + '_ {
        (0..self.rows).filter_map(move |r| self.row(r))
    }

    /// Iterate over one channel, top to bottom
    pub fn column(&self, column: usize) -> Result<impl Iterator<Item = f64> + '_> {
        if column >= self.columns {
            return Err(TensormeterError::ColumnOutOfRange {
                column,
                columns: self.columns,
            });
        }
        Ok(self.data.iter().skip(column).step_by(self.columns).copied())
    }

    /// Keep the trailing contiguous run of rows whose column 0 lies within
    /// `max_elapsed` of the last row's column 0
    ///
    /// Scanning stops at the first row (walking backwards) outside the
    /// window, so older rows never re-enter even if their timestamp would
    /// match. A matrix without rows or without columns is returned as is.
    pub fn trailing_window(mut self, max_elapsed: f64, edge: WindowEdge) -> Self {
        let Some(t_last) = self.get(self.rows.saturating_sub(1), 0) else {
            return self;
        };

        let keep = self
            .iter_rows()
            .rev()
            .take_while(|row| edge.admits((t_last - row[0]).abs(), max_elapsed))
            .count();

        let first = self.rows - keep;
        self.data.drain(..first * self.columns);
        self.rows = keep;
        self
    }

    /// Arithmetic mean of one channel, `None` when there are no rows
    pub fn column_mean(&self, column: usize) -> Result<Option<f64>> {
        let rows = self.rows;
        let sum: f64 = self.column(column)?.sum();
        Ok((rows > 0).then(|| sum / rows as f64))
    }

    /// Write the matrix as comma-separated rows
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for row in self.iter_rows() {
            let mut first = true;
            for value in row {
                if !first {
                    writer.write_all(b",")?;
                }
                write!(writer, "{}", value)?;
                first = false;
            }
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }
}
