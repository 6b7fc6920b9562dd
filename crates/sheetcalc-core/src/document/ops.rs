use super::{CellChange, ChangeCause, Document};
use crate::error::Result;
use sheetcalc_engine::engine::{
    CellRef, CellState, FormulaError, adjust_formula, detect_cycle, evaluate,
    extract_dependencies, is_formula, is_on_cycle, is_on_cycle_within,
};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info_span, warn};

impl Document {
    /// Set a cell from raw input and recalculate everything that reads it.
    ///
    /// Input starting with `=` is stored as a formula and evaluated; any
    /// other input is a literal stored verbatim. Formula failures become the
    /// cell's value (`#REF!`, `#DIV/0!`, ...), so this never fails.
    pub fn set_cell(&mut self, cell: CellRef, input: &str) {
        let _span = info_span!("set_cell", %cell).entered();
        self.apply_input(cell, input, ChangeCause::Edit);
        self.cascade(&[cell]);
    }

    /// Store input for one cell and evaluate it, without cascading.
    fn apply_input(&mut self, cell: CellRef, input: &str, cause: ChangeCause) {
        self.grid.ensure_contains(&cell);
        if is_formula(input) {
            self.formulas.insert(cell, input.to_string());
            self.evaluate_cell(&cell);
        } else {
            self.formulas.remove(&cell);
            self.dependencies.remove(&cell);
            self.grid.set(cell, input.to_string());
        }
        self.modified = true;
        self.notify(cell, cause);
    }

    /// Re-evaluate a formula cell, replacing its dependency entry.
    fn evaluate_cell(&mut self, cell: &CellRef) {
        let Some(formula) = self.formulas.get(cell).cloned() else {
            return;
        };

        let mut deps = extract_dependencies(&formula, &self.options);
        self.dependencies.insert(*cell, deps.clone());
        if is_on_cycle(cell, &self.dependencies) {
            warn!(%cell, formula = %formula, "circular reference");
            self.grid.set(*cell, FormulaError::Cycle.tag().to_string());
            return;
        }

        let result = evaluate(&formula, cell, &self.grid, &self.options);
        deps.extend(result.dependencies);
        self.dependencies.insert(*cell, deps);
        self.grid.set(*cell, result.value);
    }

    fn notify(&mut self, cell: CellRef, cause: ChangeCause) {
        if self.listeners.is_empty() {
            return;
        }
        let change = CellChange {
            cell,
            value: self.grid.get(&cell),
            state: self.cell_state(&cell),
            cause,
        };
        for listener in &mut self.listeners {
            listener.cell_changed(&change);
        }
    }

    /// Formula cells whose dependency set contains `cell`.
    ///
    /// Found by scanning the whole dependency index; entries left behind by
    /// cells that are no longer formulas are ignored.
    pub fn dependents_of(&self, cell: &CellRef) -> BTreeSet<CellRef> {
        self.dependencies
            .iter()
            .filter(|(dependent, deps)| self.formulas.contains_key(dependent) && deps.contains(cell))
            .map(|(dependent, _)| *dependent)
            .collect()
    }

    fn transitive_dependents(&self, roots: &[CellRef]) -> BTreeSet<CellRef> {
        let mut found = BTreeSet::new();
        let mut frontier = roots.to_vec();
        while let Some(cell) = frontier.pop() {
            for dependent in self.dependents_of(&cell) {
                if found.insert(dependent) {
                    frontier.push(dependent);
                }
            }
        }
        found
    }

    /// Recalculate every cell that (transitively) reads one of `roots`.
    fn cascade(&mut self, roots: &[CellRef]) {
        let affected = self.transitive_dependents(roots);
        if affected.is_empty() {
            return;
        }
        let _span = info_span!("cascade", cells = affected.len()).entered();
        self.recalculate_cells(affected, ChangeCause::Cascade);
    }

    /// Evaluate `pending` in dependency order, each cell exactly once.
    ///
    /// A cell is evaluated once every pending cell it reads is done. When no
    /// cell is ready, the ones left are on or behind a cycle: cells on a
    /// cycle get `#CYCLE!`, and the walk continues with the rest.
    fn recalculate_cells(&mut self, mut pending: BTreeSet<CellRef>, cause: ChangeCause) {
        let mut waiting_on: HashMap<CellRef, usize> = HashMap::new();
        let mut readers: HashMap<CellRef, Vec<CellRef>> = HashMap::new();
        for cell in &pending {
            let mut count = 0;
            if let Some(deps) = self.dependencies.get(cell) {
                for dep in deps.iter().filter(|d| pending.contains(d)) {
                    count += 1;
                    readers.entry(*dep).or_default().push(*cell);
                }
            }
            waiting_on.insert(*cell, count);
        }
        let mut ready: BTreeSet<CellRef> = waiting_on
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(cell, _)| *cell)
            .collect();

        while !pending.is_empty() {
            if let Some(cell) = ready.pop_first() {
                pending.remove(&cell);
                self.evaluate_cell(&cell);
                self.notify(cell, cause);
                release(&cell, &readers, &mut waiting_on, &mut ready, &pending);
                continue;
            }

            let cyclic: Vec<CellRef> = pending
                .iter()
                .filter(|cell| is_on_cycle_within(cell, &self.dependencies, &pending))
                .copied()
                .collect();
            if cyclic.is_empty() {
                break;
            }
            warn!(cells = cyclic.len(), first = %cyclic[0], "circular reference in cascade");
            for cell in &cyclic {
                pending.remove(cell);
            }
            for cell in cyclic {
                self.grid.set(cell, FormulaError::Cycle.tag().to_string());
                self.notify(cell, cause);
                release(&cell, &readers, &mut waiting_on, &mut ready, &pending);
            }
        }
    }

    /// Re-evaluate every formula in dependency order.
    pub fn recalculate_all(&mut self) {
        let all: BTreeSet<CellRef> = self.formulas.keys().copied().collect();
        let _span = info_span!("recalculate_all", cells = all.len()).entered();
        self.recalculate_cells(all, ChangeCause::Cascade);
    }

    /// Displayed value of a cell (`""` when empty).
    pub fn get_value(&self, cell: &CellRef) -> String {
        self.grid.get(cell)
    }

    /// Formula text of a cell, if it holds one.
    pub fn formula(&self, cell: &CellRef) -> Option<&str> {
        self.formulas.get(cell).map(String::as_str)
    }

    /// What the user typed: the formula for formula cells, else the value.
    pub fn raw_input(&self, cell: &CellRef) -> String {
        match self.formula(cell) {
            Some(formula) => formula.to_string(),
            None => self.grid.get(cell),
        }
    }

    pub fn cell_state(&self, cell: &CellRef) -> CellState {
        if self.formulas.contains_key(cell) {
            CellState::for_formula_result(&self.grid.get(cell))
        } else {
            CellState::Literal
        }
    }

    /// The circular reference path reachable from `cell`, if any.
    pub fn find_cycle(&self, cell: &CellRef) -> Option<Vec<CellRef>> {
        detect_cycle(cell, &self.dependencies)
    }

    /// Append an empty row; returns its index.
    pub fn add_row(&mut self) -> usize {
        self.modified = true;
        self.grid.add_row()
    }

    /// Append an empty column; returns its index.
    pub fn add_column(&mut self) -> usize {
        self.modified = true;
        self.grid.add_column()
    }

    /// Remove every value, formula and dependency, and reset the bounds.
    pub fn clear(&mut self) {
        self.grid.clear();
        self.formulas.clear();
        self.dependencies.clear();
        self.modified = true;
    }

    /// Cells a fill from `source` towards `target_end` writes to.
    ///
    /// Fills run along a single row or column; any other shape is empty.
    /// The source itself is never a target.
    pub fn fill_targets(source: &CellRef, target_end: &CellRef) -> Vec<CellRef> {
        let targets: Vec<CellRef> = if source.row == target_end.row {
            let (lo, hi) = min_max(source.col, target_end.col);
            (lo..=hi).map(|col| CellRef::new(source.row, col)).collect()
        } else if source.col == target_end.col {
            let (lo, hi) = min_max(source.row, target_end.row);
            (lo..=hi).map(|row| CellRef::new(row, source.col)).collect()
        } else {
            Vec::new()
        };
        targets.into_iter().filter(|c| c != source).collect()
    }

    /// Copy `source` into every cell up to `target_end` along its row or
    /// column. Formulas are adjusted for each destination; literals are
    /// copied as-is. Returns the cells written.
    ///
    /// Nothing is written if any adjusted formula would be malformed.
    pub fn fill(&mut self, source: CellRef, target_end: CellRef) -> Result<Vec<CellRef>> {
        let targets = Self::fill_targets(&source, &target_end);
        let input = self.raw_input(&source);

        let mut writes = Vec::with_capacity(targets.len());
        for target in &targets {
            writes.push((*target, adjust_formula(&input, &source, target)?));
        }

        let _span = info_span!("fill", %source, %target_end, cells = writes.len()).entered();
        for (target, text) in &writes {
            debug!(cell = %target, input = %text, "fill");
            self.apply_input(*target, text, ChangeCause::Fill);
        }
        self.cascade(&targets);
        Ok(targets)
    }

    /// Last row of an automatic downward fill from `cell`.
    ///
    /// With a column to the left, extends while that column has values in
    /// the following rows. Falls back to one row down when a row exists, and
    /// to `cell.row` (nothing to fill) otherwise.
    pub fn fill_down_extent(&self, cell: &CellRef) -> usize {
        let rows = self.grid.rows();
        let mut end = cell.row;
        if cell.col > 0 {
            let left = cell.col - 1;
            while end + 1 < rows && !self.grid.get(&CellRef::new(end + 1, left)).is_empty() {
                end += 1;
            }
        }
        if end == cell.row && cell.row + 1 < rows {
            end = cell.row + 1;
        }
        end
    }

    /// Fill `cell` down to [`fill_down_extent`](Self::fill_down_extent).
    pub fn fill_down(&mut self, cell: CellRef) -> Result<Vec<CellRef>> {
        let end = self.fill_down_extent(&cell);
        self.fill(cell, CellRef::new(end, cell.col))
    }
}

fn min_max(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

fn release(
    cell: &CellRef,
    readers: &HashMap<CellRef, Vec<CellRef>>,
    waiting_on: &mut HashMap<CellRef, usize>,
    ready: &mut BTreeSet<CellRef>,
    pending: &BTreeSet<CellRef>,
) {
    let Some(cells) = readers.get(cell) else {
        return;
    };
    for reader in cells {
        if let Some(count) = waiting_on.get_mut(reader) {
            *count = count.saturating_sub(1);
            if *count == 0 && pending.contains(reader) {
                ready.insert(*reader);
            }
        }
    }
}
