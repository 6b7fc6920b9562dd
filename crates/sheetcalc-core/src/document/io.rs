use super::Document;
use crate::error::{Result, SheetError};
use crate::storage::{Snapshot, parse_calc, write_calc};
use std::path::{Path, PathBuf};
use tracing::info;

impl Document {
    /// Raw inputs of every non-empty cell, row-major, with the grid bounds.
    pub fn snapshot(&self) -> Snapshot {
        let mut cells: Vec<_> = self
            .grid
            .non_empty()
            .into_iter()
            .filter(|(cell, _)| !self.formulas.contains_key(cell))
            .chain(self.formulas.iter().map(|(cell, f)| (*cell, f.clone())))
            .collect();
        cells.sort_by_key(|(cell, _)| *cell);
        Snapshot {
            rows: self.grid.rows(),
            cols: self.grid.cols(),
            cells,
        }
    }

    /// Save to current file path.
    /// Returns the path saved to.
    pub fn save_file(&mut self) -> Result<PathBuf> {
        let Some(path) = self.file_path.clone() else {
            return Err(SheetError::NoFilePath);
        };

        write_calc(&path, &self.snapshot())?;
        self.modified = false;
        Ok(path)
    }

    /// Save to `path` and make it the current file path.
    pub fn save_as(&mut self, path: &Path) -> Result<()> {
        write_calc(path, &self.snapshot())?;
        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    /// Load from file, replacing the whole sheet.
    ///
    /// The file is parsed before anything is touched, so a malformed file
    /// leaves the document as it was.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let snapshot = parse_calc(path)?;

        self.clear();
        self.grid.ensure_size(snapshot.rows, snapshot.cols);
        for (cell, input) in &snapshot.cells {
            self.set_cell(*cell, input);
        }
        // Replay order is row-major, so settle forward references.
        self.recalculate_all();

        info!(path = %path.display(), cells = snapshot.cells.len(), "loaded sheet");
        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }
}
