use std::collections::HashSet;

use serde::Serialize;

use super::{invalid_choice, FieldErrors, FormData, TAMPERED_MANAGEMENT};

/// Hard ceiling on rows read from one submission.
pub const MAX_FORMSET_FORMS: usize = 1000;
/// Blank rows appended to an unbound formset.
pub const DEFAULT_EXTRA_FORMS: usize = 3;

/// A child form edited in rows under its parent decision.
pub trait InlineForm: Sized + Default {
    type Cleaned;

    /// Build the raw form from a row lookup (`field name -> submitted value`).
    fn from_row<F>(field: F) -> Self
    where
        F: Fn(&str) -> String;

    /// True when every field is empty, i.e. an untouched extra row.
    fn is_blank(&self) -> bool;

    fn clean(&self) -> Result<Self::Cleaned, FieldErrors>;
}

/// Row bookkeeping submitted alongside the rows themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ManagementForm {
    pub total_forms: usize,
    pub initial_forms: usize,
    pub max_num_forms: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormsetRow<F> {
    pub id: String,
    #[serde(rename = "DELETE")]
    pub delete: bool,
    #[serde(flatten)]
    pub form: F,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub errors: FieldErrors,
}

/// One cleaned row: `id` points at an existing child, `None` creates a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowChange<T> {
    pub id: Option<u64>,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineFormset<F> {
    pub prefix: &'static str,
    pub management: ManagementForm,
    pub forms: Vec<FormsetRow<F>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub non_form_errors: Vec<String>,
}

impl<F: InlineForm> InlineFormset<F> {
    /// Formset listing existing children followed by blank extra rows.
    pub fn unbound(prefix: &'static str, existing: Vec<(u64, F)>) -> Self {
        let initial_forms = existing.len();
        let mut forms: Vec<FormsetRow<F>> = existing
            .into_iter()
            .map(|(id, form)| FormsetRow {
                id: id.to_string(),
                delete: false,
                form,
                errors: FieldErrors::default(),
            })
            .collect();

        forms.extend((0..DEFAULT_EXTRA_FORMS).map(|_| FormsetRow {
            id: String::new(),
            delete: false,
            form: F::default(),
            errors: FieldErrors::default(),
        }));

        Self {
            prefix,
            management: ManagementForm {
                total_forms: forms.len(),
                initial_forms,
                max_num_forms: None,
            },
            forms,
            non_form_errors: Vec::new(),
        }
    }

    /// Bind the rows submitted under `prefix`. Returns `None` when the submission has no
    /// management data for this formset at all.
    pub fn bind(prefix: &'static str, data: &FormData) -> Option<Self> {
        let total_raw = data.get(&format!("{prefix}-TOTAL_FORMS"))?;
        let mut non_form_errors = Vec::new();

        let mut total_forms = parse_count(total_raw).unwrap_or_else(|| {
            non_form_errors.push(TAMPERED_MANAGEMENT.to_string());
            0
        });
        let initial_forms = data
            .get(&format!("{prefix}-INITIAL_FORMS"))
            .and_then(parse_count)
            .unwrap_or_else(|| {
                non_form_errors.push(TAMPERED_MANAGEMENT.to_string());
                0
            });
        let max_num_forms = match data.get(&format!("{prefix}-MAX_NUM_FORMS")) {
            None => None,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => {
                let parsed = parse_count(raw);
                if parsed.is_none() {
                    non_form_errors.push(TAMPERED_MANAGEMENT.to_string());
                }
                parsed
            }
        };

        if initial_forms > total_forms {
            non_form_errors.push(TAMPERED_MANAGEMENT.to_string());
        }
        if total_forms > MAX_FORMSET_FORMS {
            non_form_errors.push(format!(
                "Please submit {MAX_FORMSET_FORMS} or fewer forms."
            ));
            total_forms = MAX_FORMSET_FORMS;
        }
        non_form_errors.dedup();

        let forms = (0..total_forms)
            .map(|index| {
                let key = |field: &str| format!("{prefix}-{index}-{field}");
                FormsetRow {
                    id: data.value(&key("id")).trim().to_string(),
                    delete: data.checkbox(&key("DELETE")),
                    form: F::from_row(|field| data.value(&key(field))),
                    errors: FieldErrors::default(),
                }
            })
            .collect();

        Some(Self {
            prefix,
            management: ManagementForm {
                total_forms,
                initial_forms,
                max_num_forms,
            },
            forms,
            non_form_errors,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.non_form_errors.is_empty() && self.forms.iter().all(|row| row.errors.is_empty())
    }

    /// Clean every row against the ids of the children the parent currently owns.
    ///
    /// Deleted rows and untouched extra rows are dropped. Errors are recorded on the rows
    /// themselves; `None` means the formset must be shown again.
    pub fn validate(&mut self, existing_ids: &[u64]) -> Option<Vec<RowChange<F::Cleaned>>> {
        if !self.non_form_errors.is_empty() {
            return None;
        }

        let initial_forms = self.management.initial_forms;
        let mut seen = HashSet::new();
        let mut changes = Vec::new();

        for (index, row) in self.forms.iter_mut().enumerate() {
            row.errors = FieldErrors::default();
            if row.delete {
                continue;
            }

            let is_extra = index >= initial_forms;
            if is_extra && row.id.is_empty() && row.form.is_blank() {
                continue;
            }

            let id = if row.id.is_empty() {
                None
            } else {
                match row.id.parse::<u64>() {
                    Ok(id) if existing_ids.contains(&id) && seen.insert(id) => Some(id),
                    _ => {
                        row.errors.add("id", invalid_choice(&row.id));
                        None
                    }
                }
            };

            match row.form.clean() {
                Ok(value) if row.errors.is_empty() => changes.push(RowChange { id, value }),
                Ok(_) => {}
                Err(errors) => row.errors.extend(errors),
            }
        }

        if let Some(max) = self.management.max_num_forms {
            if changes.len() > max {
                self.non_form_errors
                    .push(format!("Please submit {max} or fewer forms."));
            }
        }

        self.is_valid().then_some(changes)
    }
}

fn parse_count(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok()
}
