/*!
 * Spreadsheet fragment extraction.
 *
 * Like word-processing documents, spreadsheets cross the converter boundary
 * as a structured model: sheets of addressed cells plus merged-range and
 * selected-region metadata. Only plain text cells become fragments; numbers,
 * booleans and formulas pass through untouched (translating a formula body
 * would corrupt it). The insert mode governs how translated text lands in a
 * cell.
 */

use serde::{Deserialize, Serialize};

use crate::document::{Document, FragmentContext, FragmentId};
use crate::errors::AppError;

use super::{
    Extraction, FormatAdapter, FragmentBuilder, ReinsertPolicy, ReinsertionPlan, TranslatedMap,
    plan_mismatch,
};

/// Cell payload variants of the workbook model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
    /// Formula cell, e.g. {"formula": "=SUM(A1:A3)"}
    Formula {
        /// Formula source, never translated
        formula: String,
    },
    /// Plain text cell
    Text(String),
    /// Numeric cell
    Number(f64),
    /// Boolean cell
    Bool(bool),
}

/// One addressed cell
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellModel {
    /// 1-based row
    pub row: u32,
    /// 1-based column
    pub col: u32,
    /// Cell payload
    pub value: CellValue,
}

/// One sheet of the workbook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetModel {
    /// Sheet name
    pub name: String,
    /// Cells, in reading order
    pub cells: Vec<CellModel>,
    /// Merged ranges in "A1:B2" notation, passed through verbatim
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged: Vec<String>,
}

/// Bounds of the region selected for translation, inclusive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegionBounds {
    pub min_row: u32,
    pub max_row: u32,
    pub min_col: u32,
    pub max_col: u32,
}

impl RegionBounds {
    /// Whether a cell address falls inside the region
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.min_row && row <= self.max_row && col >= self.min_col && col <= self.max_col
    }
}

/// Structured model of one workbook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkbookModel {
    /// Sheets in workbook order
    pub sheets: Vec<SheetModel>,
    /// Optional translation region; cells outside it are left alone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionBounds>,
}

/// Address of one extracted text cell: (sheet index, cell index, fragment)
#[derive(Debug, Clone)]
pub struct CellRef {
    pub sheet: usize,
    pub cell: usize,
    pub fragment: FragmentId,
}

/// Adapter for spreadsheets
pub struct XlsxAdapter;

impl XlsxAdapter {
    /// Create the adapter
    pub fn new() -> Self {
        XlsxAdapter
    }
}

impl Default for XlsxAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatAdapter for XlsxAdapter {
    fn extract(&self, document: &Document) -> Result<Extraction, AppError> {
        let model: WorkbookModel = serde_json::from_slice(&document.content).map_err(|e| {
            AppError::InvalidInput(format!("Invalid workbook model: {}", e))
        })?;

        let mut builder = FragmentBuilder::new();
        let mut cells: Vec<CellRef> = Vec::new();

        for (s_index, sheet) in model.sheets.iter().enumerate() {
            for (c_index, cell) in sheet.cells.iter().enumerate() {
                let CellValue::Text(text) = &cell.value else {
                    continue;
                };
                if text.trim().is_empty() {
                    continue;
                }
                if let Some(region) = &model.region {
                    if !region.contains(cell.row, cell.col) {
                        continue;
                    }
                }
                let id = builder.push(
                    text.clone(),
                    true,
                    FragmentContext::XlsxCell {
                        sheet: sheet.name.clone(),
                        row: cell.row,
                        col: cell.col,
                    },
                );
                cells.push(CellRef {
                    sheet: s_index,
                    cell: c_index,
                    fragment: id,
                });
            }
        }

        Ok(Extraction {
            fragments: builder.finish(),
            plan: ReinsertionPlan::Xlsx { model, cells },
        })
    }

    fn reassemble(
        &self,
        document: &Document,
        plan: &ReinsertionPlan,
        translated: &TranslatedMap,
        policy: &ReinsertPolicy,
    ) -> Result<Document, AppError> {
        let ReinsertionPlan::Xlsx { model, cells } = plan else {
            return Err(plan_mismatch("xlsx"));
        };

        let mut output = model.clone();
        for cell_ref in cells {
            let Some(text) = translated.get(&cell_ref.fragment) else {
                continue;
            };
            let slot = output
                .sheets
                .get_mut(cell_ref.sheet)
                .and_then(|s| s.cells.get_mut(cell_ref.cell));
            if let Some(cell) = slot {
                if let CellValue::Text(original) = &cell.value {
                    cell.value = CellValue::Text(policy.slot_text(original, text));
                }
            }
        }

        let serialized = serde_json::to_string(&output)
            .map_err(|e| AppError::Unknown(format!("Failed to serialize workbook model: {}", e)))?;
        let mut result = document.clone();
        result.content = serialized.into_bytes().into();
        Ok(result)
    }
}
