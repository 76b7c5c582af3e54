//! Uniform longitude/latitude grid used to narrow bounding-box candidates.

use std::collections::{HashMap, HashSet};

use crate::model::{ViewportRect, MIN_LATITUDE, MIN_LONGITUDE};

pub(crate) const DEFAULT_CELL_DEGREES: f64 = 1.0;

type Cell = (i64, i64);

pub(crate) struct GridIndex {
    cell_degrees: f64,
    cols: i64,
    rows: i64,
    cells: HashMap<Cell, HashSet<String>>,
}

impl GridIndex {
    /// Non-positive or non-finite sizes fall back to one degree.
    pub(crate) fn new(cell_degrees: f64) -> Self {
        let cell_degrees = if cell_degrees.is_finite() && cell_degrees > 0.0 {
            cell_degrees.min(180.0)
        } else {
            DEFAULT_CELL_DEGREES
        };
        Self {
            cell_degrees,
            cols: (360.0 / cell_degrees).ceil() as i64,
            rows: (180.0 / cell_degrees).ceil() as i64,
            cells: HashMap::new(),
        }
    }

    pub(crate) fn cell_degrees(&self) -> f64 {
        self.cell_degrees
    }

    fn col(&self, lon: f64) -> i64 {
        let raw = ((lon - MIN_LONGITUDE) / self.cell_degrees).floor() as i64;
        raw.clamp(0, self.cols - 1)
    }

    fn row(&self, lat: f64) -> i64 {
        let raw = ((lat - MIN_LATITUDE) / self.cell_degrees).floor() as i64;
        raw.clamp(0, self.rows - 1)
    }

    pub(crate) fn insert(&mut self, id: &str, lon: f64, lat: f64) {
        let cell = (self.col(lon), self.row(lat));
        self.cells.entry(cell).or_default().insert(id.to_string());
    }

    pub(crate) fn remove(&mut self, id: &str, lon: f64, lat: f64) {
        let cell = (self.col(lon), self.row(lat));
        if let Some(ids) = self.cells.get_mut(&cell) {
            ids.remove(id);
            if ids.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    /// Ids in every cell touched by `rect`. A superset of the exact answer;
    /// callers still apply `ViewportRect::contains`.
    pub(crate) fn candidates(&self, rect: &ViewportRect) -> HashSet<&str> {
        let rows = (self.row(rect.sw_lat), self.row(rect.ne_lat));
        let col_ranges: Vec<(i64, i64)> = rect
            .longitude_spans()
            .into_iter()
            .map(|(west, east)| (self.col(west), self.col(east)))
            .collect();

        let covered: i64 = col_ranges
            .iter()
            .map(|(west, east)| east - west + 1)
            .sum::<i64>()
            * (rows.1 - rows.0 + 1);

        let mut out = HashSet::new();
        if covered as usize > self.cells.len() {
            // Sparse grid: walk the occupied cells instead of the covered ones.
            for ((col, row), ids) in &self.cells {
                let in_rows = *row >= rows.0 && *row <= rows.1;
                let in_cols = col_ranges
                    .iter()
                    .any(|(west, east)| col >= west && col <= east);
                if in_rows && in_cols {
                    out.extend(ids.iter().map(String::as_str));
                }
            }
        } else {
            for (west, east) in &col_ranges {
                for col in *west..=*east {
                    for row in rows.0..=rows.1 {
                        if let Some(ids) = self.cells.get(&(col, row)) {
                            out.extend(ids.iter().map(String::as_str));
                        }
                    }
                }
            }
        }
        out
    }
}
