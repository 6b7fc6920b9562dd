use crate::error::Result;
use sheetcalc_engine::engine::{CellRef, DependencyIndex, EvalOptions, Grid};
use std::collections::HashMap;
use std::path::PathBuf;

use super::CellListener;

/// UI-agnostic document state for the spreadsheet.
pub struct Document {
    /// Displayed values (evaluation results for formula cells)
    pub grid: Grid,
    /// Original formula text, including the leading `=`, for formula cells only
    pub formulas: HashMap<CellRef, String>,
    /// Formula cell -> cells it reads, replaced whenever the formula is evaluated
    pub dependencies: DependencyIndex,
    /// Evaluation options (error policy, range limit)
    pub options: EvalOptions,
    /// Current file path
    pub file_path: Option<PathBuf>,
    /// Whether the document has been modified
    pub modified: bool,
    pub(crate) listeners: Vec<Box<dyn CellListener>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a new, empty document.
    ///
    /// This constructor is side-effect free: it does not touch the filesystem.
    pub fn new() -> Self {
        Self::with_options(EvalOptions::default())
    }

    pub fn with_options(options: EvalOptions) -> Self {
        Document {
            grid: Grid::new(),
            formulas: HashMap::new(),
            dependencies: DependencyIndex::new(),
            options,
            file_path: None,
            modified: false,
            listeners: Vec::new(),
        }
    }

    /// Create a new document and load a file if provided.
    pub fn with_file(path: Option<PathBuf>, options: EvalOptions) -> Result<Self> {
        let mut doc = Self::with_options(options);
        if let Some(ref p) = path {
            if p.exists() {
                doc.load_file(p)?;
            } else {
                doc.file_path = Some(p.clone());
                doc.modified = false;
            }
        }
        Ok(doc)
    }

    /// Register a listener for cell updates.
    pub fn add_listener(&mut self, listener: impl CellListener + 'static) {
        self.listeners.push(Box::new(listener));
    }
}
