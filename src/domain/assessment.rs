use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

use super::validation::{require_text, Validate, ValidationError};
use super::{ResidentId, SpaceId};

pub type FormId = Uuid;
pub type CategoryId = Uuid;
pub type RowId = Uuid;
pub type AssessmentId = Uuid;

/// A scorable answer inside a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub category_id: CategoryId,
    pub title: String,
    pub score: f64,
}

impl Row {
    pub fn new(category_id: CategoryId, title: impl Into<String>, score: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_id,
            title: title.into(),
            score,
        }
    }
}

/// A group of rows. Unless `multi_item` is set, an assessment selects at most one of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub space_id: SpaceId,
    pub title: String,
    pub multi_item: bool,
    pub rows: Vec<Row>,
}

impl Category {
    pub fn new(space_id: SpaceId, title: impl Into<String>, multi_item: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            space_id,
            title: title.into(),
            multi_item,
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, title: impl Into<String>, score: f64) -> Self {
        let row = Row::new(self.id, title, score);
        self.rows.push(row);
        self
    }
}

impl Validate for Category {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, 100)?;
        for row in &self.rows {
            require_text("rows.title", &row.title, 255)?;
            if !row.score.is_finite() || row.score < 0.0 {
                return Err(ValidationError::Field {
                    field: "rows.score",
                    message: "must be a non-negative number".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Position of a category inside a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormCategory {
    pub category_id: CategoryId,
    pub order_number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    pub id: FormId,
    pub space_id: SpaceId,
    pub title: String,
    pub categories: Vec<FormCategory>,
}

impl Form {
    /// `categories` are numbered in the given order, starting at 1.
    pub fn new(space_id: SpaceId, title: impl Into<String>, categories: &[CategoryId]) -> Self {
        let mut form = Self {
            id: Uuid::new_v4(),
            space_id,
            title: title.into(),
            categories: Vec::new(),
        };
        form.set_categories(categories);
        form
    }

    pub fn set_categories(&mut self, categories: &[CategoryId]) {
        self.categories = categories
            .iter()
            .enumerate()
            .map(|(index, category_id)| FormCategory {
                category_id: *category_id,
                order_number: index as i64 + 1,
            })
            .collect();
    }

    pub fn contains_category(&self, category_id: CategoryId) -> bool {
        self.categories.iter().any(|fc| fc.category_id == category_id)
    }
}

impl Validate for Form {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, 100)?;
        let mut seen = HashSet::new();
        for fc in &self.categories {
            if !seen.insert(fc.category_id) {
                return Err(ValidationError::Field {
                    field: "categories",
                    message: format!("category {} is listed twice", fc.category_id),
                });
            }
        }
        Ok(())
    }
}

/// A selected row with the score it had when the assessment was saved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRow {
    pub row_id: RowId,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub resident_id: ResidentId,
    pub form_id: FormId,
    pub date: NaiveDate,
    pub performed_by: String,
    pub notes: Option<String>,
    pub score: f64,
    pub rows: Vec<AssessmentRow>,
}

impl Assessment {
    pub fn new(
        resident_id: ResidentId,
        form_id: FormId,
        date: NaiveDate,
        performed_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            resident_id,
            form_id,
            date,
            performed_by: performed_by.into(),
            notes: None,
            score: 0.0,
            rows: Vec::new(),
        }
    }
}

impl Validate for Assessment {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("performed_by", &self.performed_by, 100)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("row {0} does not belong to the form")]
    RowNotInForm(RowId),

    #[error("category '{0}' allows a single row")]
    CategoryMultiple(String),
}

/// Resolve selected row ids against the form's categories.
///
/// Every row must belong to a category of the form, and a category without
/// `multi_item` contributes at most one row. Duplicated ids count once.
pub fn validate_selection(
    form: &Form,
    categories: &[Category],
    selected: &[RowId],
) -> Result<Vec<AssessmentRow>, SelectionError> {
    let rows: HashMap<RowId, (&Category, &Row)> = categories
        .iter()
        .filter(|category| form.contains_category(category.id))
        .flat_map(|category| category.rows.iter().map(move |row| (row.id, (category, row))))
        .collect();

    let mut seen = HashSet::new();
    let mut per_category: HashMap<CategoryId, usize> = HashMap::new();
    let mut result = Vec::new();

    for row_id in selected {
        if !seen.insert(*row_id) {
            continue;
        }
        let (category, row) = rows
            .get(row_id)
            .ok_or(SelectionError::RowNotInForm(*row_id))?;

        let count = per_category.entry(category.id).or_insert(0);
        *count += 1;
        if *count > 1 && !category.multi_item {
            return Err(SelectionError::CategoryMultiple(category.title.clone()));
        }

        result.push(AssessmentRow {
            row_id: row.id,
            score: row.score,
        });
    }

    Ok(result)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub title: String,
    pub score: f64,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCategory {
    pub title: String,
    pub multi_item: bool,
    pub rows: Vec<ReportRow>,
    pub subtotal: f64,
}

/// Scored table of an assessment, categories in form order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub categories: Vec<ReportCategory>,
    pub total: f64,
}

impl AssessmentReport {
    pub fn build(form: &Form, categories: &[Category], selected: &[AssessmentRow]) -> Self {
        let by_id: HashMap<CategoryId, &Category> = categories.iter().map(|c| (c.id, c)).collect();
        let scores: HashMap<RowId, f64> = selected.iter().map(|r| (r.row_id, r.score)).collect();

        let mut ordered = form.categories.clone();
        ordered.sort_by_key(|fc| fc.order_number);

        let report_categories: Vec<ReportCategory> = ordered
            .iter()
            .filter_map(|fc| by_id.get(&fc.category_id))
            .map(|category| {
                let rows: Vec<ReportRow> = category
                    .rows
                    .iter()
                    .map(|row| {
                        let captured = scores.get(&row.id);
                        ReportRow {
                            title: row.title.clone(),
                            score: captured.copied().unwrap_or(row.score),
                            selected: captured.is_some(),
                        }
                    })
                    .collect();
                let subtotal = rows.iter().filter(|r| r.selected).map(|r| r.score).sum();
                ReportCategory {
                    title: category.title.clone(),
                    multi_item: category.multi_item,
                    rows,
                    subtotal,
                }
            })
            .collect();

        let total = report_categories.iter().map(|c| c.subtotal).sum();

        Self {
            categories: report_categories,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Form, Vec<Category>) {
        let space = Uuid::new_v4();
        let mobility = Category::new(space, "Mobility", false)
            .with_row("Independent", 0.0)
            .with_row("Needs walker", 2.0);
        let diet = Category::new(space, "Diet", true)
            .with_row("Diabetic", 1.0)
            .with_row("Low sodium", 1.5);
        let form = Form::new(space, "Care assessment", &[diet.id, mobility.id]);
        (form, vec![mobility, diet])
    }

    #[test]
    fn test_single_select_category_rejects_two_rows() {
        let (form, categories) = fixture();
        let mobility = &categories[0];
        let selected = [mobility.rows[0].id, mobility.rows[1].id];

        let err = validate_selection(&form, &categories, &selected).unwrap_err();
        assert_eq!(err, SelectionError::CategoryMultiple("Mobility".to_string()));

        let one = validate_selection(&form, &categories, &selected[..1]).unwrap();
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn test_multi_item_category_accepts_many_rows() {
        let (form, categories) = fixture();
        let diet = &categories[1];
        let selected = [diet.rows[0].id, diet.rows[1].id, diet.rows[0].id];

        let rows = validate_selection(&form, &categories, &selected).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_row_outside_form_is_rejected() {
        let (form, categories) = fixture();
        let stray = Uuid::new_v4();
        assert_eq!(
            validate_selection(&form, &categories, &[stray]),
            Err(SelectionError::RowNotInForm(stray))
        );
    }

    #[test]
    fn test_report_orders_categories_and_totals_scores() {
        let (form, categories) = fixture();
        let selected = validate_selection(
            &form,
            &categories,
            &[categories[0].rows[1].id, categories[1].rows[1].id],
        )
        .unwrap();

        let report = AssessmentReport::build(&form, &categories, &selected);
        assert_eq!(report.categories[0].title, "Diet");
        assert_eq!(report.categories[1].title, "Mobility");
        assert_eq!(report.categories[0].subtotal, 1.5);
        assert_eq!(report.categories[1].subtotal, 2.0);
        assert_eq!(report.total, 3.5);
        assert!(report.categories[1].rows[1].selected);
        assert!(!report.categories[1].rows[0].selected);
    }

    #[test]
    fn test_form_rejects_duplicate_categories() {
        let category = Uuid::new_v4();
        let form = Form::new(Uuid::new_v4(), "Intake", &[category, category]);
        assert!(form.validate().is_err());
    }
}
