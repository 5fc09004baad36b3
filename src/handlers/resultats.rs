// src/handlers/resultats.rs

use std::collections::HashMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::grade::{GradeResults, GradeRow, PeriodResult, ResultsByCodeRequest, YearResult},
    utils::jwt::Claims,
};

const YEARS: std::ops::RangeInclusive<i64> = 1..=3;
const PERIODS: std::ops::RangeInclusive<i64> = 1..=3;

/// Tolerance between the stored moyenne and the recomputed mean. Strictly
/// greater-than: a stored value off by exactly 0.01 is kept.
const MOYENNE_TOLERANCE: f64 = 0.01;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of the subject scores; an empty map averages to 0, never NaN.
fn mean(notes: &HashMap<String, f64>) -> f64 {
    if notes.is_empty() {
        return 0.0;
    }
    notes.values().sum::<f64>() / notes.len() as f64
}

/// Reconciles the stored average with the one recomputed from the notes.
///
/// The recomputed mean wins when the stored value is zero (indistinguishable
/// from "never stored" in the source data) or drifts from the mean by more
/// than the tolerance. Storage is never rewritten on read.
fn reconcile_moyenne(stored: f64, notes: &HashMap<String, f64>) -> f64 {
    let computed = mean(notes);
    if stored == 0.0 || (stored - computed).abs() > MOYENNE_TOLERANCE {
        round2(computed)
    } else {
        stored
    }
}

fn classe_label(option: &str, annee: i64) -> String {
    if option.is_empty() {
        format!("L{}", annee)
    } else {
        format!("{}{}", option, annee)
    }
}

/// Builds the nested year -> period -> subject transcript from raw rows.
///
/// Every period of the 3x3 domain gets a record, including cells with no
/// row (empty notes, moyenne 0); years with no graded period at all are
/// omitted. Periods come out sorted ascending.
fn assemble_results(option: &str, rows: Vec<GradeRow>) -> GradeResults {
    let mut by_cell: HashMap<(i64, i64), GradeRow> = rows
        .into_iter()
        .map(|r| ((r.annee, r.periode), r))
        .collect();

    let mut years = Vec::new();
    for annee in YEARS {
        let mut periods = Vec::new();
        let mut has_data = false;

        for periode in PERIODS {
            let (notes, moyenne) = match by_cell.remove(&(annee, periode)) {
                Some(row) => {
                    let moyenne = reconcile_moyenne(row.moyenne, &row.notes.0);
                    (row.notes.0, moyenne)
                }
                None => (HashMap::new(), 0.0),
            };

            if !notes.is_empty() {
                has_data = true;
            }

            periods.push(PeriodResult {
                periode,
                title: format!("Période {}", periode),
                notes,
                moyenne,
            });
        }

        if has_data {
            years.push(YearResult {
                annee,
                academic_year: format!("Année {}", annee),
                classe: classe_label(option, annee),
                periods,
            });
        }
    }

    GradeResults {
        option: option.to_string(),
        years,
    }
}

async fn fetch_option(pool: &PgPool, user_id: i64) -> Result<Option<String>, AppError> {
    Ok(
        sqlx::query_scalar::<_, String>("SELECT option_filiere FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?,
    )
}

/// Looks up a transcript by student code.
///
/// Any authenticated user may query any code; codes are treated as shared
/// lookup keys, so the result is not filtered by requester identity.
pub async fn resultats_by_code(
    State(pool): State<PgPool>,
    Extension(_claims): Extension<Claims>,
    Json(payload): Json<ResultsByCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let code = payload.code.trim();

    let rows = sqlx::query_as::<_, GradeRow>(
        "SELECT code_etudiant, annee, periode, user_id, notes, moyenne \
         FROM notes_periodes WHERE code_etudiant = $1 \
         ORDER BY annee, periode",
    )
    .bind(code)
    .fetch_all(&pool)
    .await?;

    if rows.is_empty() {
        return Err(AppError::NotFound(
            "Aucun résultat pour ce code étudiant".to_string(),
        ));
    }

    // The first linked row identifies the owning user, used only to pull
    // the program track.
    let owner = rows.iter().find_map(|r| r.user_id);
    let option = match owner {
        Some(user_id) => fetch_option(&pool, user_id).await?.unwrap_or_default(),
        None => String::new(),
    };

    let results = assemble_results(&option, rows);

    Ok(Json(json!({ "success": true, "results": results })))
}

/// Looks up the authenticated user's own transcript. Same assembly as the
/// by-code path, keyed by the session user id.
pub async fn resultats_for_session(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let option = fetch_option(&pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Utilisateur introuvable".to_string()))?;

    let rows = sqlx::query_as::<_, GradeRow>(
        "SELECT code_etudiant, annee, periode, user_id, notes, moyenne \
         FROM notes_periodes WHERE user_id = $1 \
         ORDER BY annee, periode",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let results = assemble_results(&option, rows);

    Ok(Json(json!({ "success": true, "results": results })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json as SqlxJson;

    fn notes(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn row(annee: i64, periode: i64, n: HashMap<String, f64>, moyenne: f64) -> GradeRow {
        GradeRow {
            code_etudiant: "ETU001".to_string(),
            annee,
            periode,
            user_id: Some(1),
            notes: SqlxJson(n),
            moyenne,
        }
    }

    #[test]
    fn test_mean_of_empty_notes_is_zero() {
        assert_eq!(mean(&HashMap::new()), 0.0);
    }

    #[test]
    fn test_zero_stored_moyenne_is_recomputed() {
        let n = notes(&[("math", 50.0), ("physique", 70.0)]);
        assert_eq!(reconcile_moyenne(0.0, &n), 60.0);
    }

    #[test]
    fn test_inconsistent_stored_moyenne_is_recomputed() {
        let n = notes(&[("math", 50.0), ("physique", 70.0)]);
        assert_eq!(reconcile_moyenne(61.0, &n), 60.0);
    }

    #[test]
    fn test_stored_moyenne_within_tolerance_is_kept() {
        // diff 0.005 <= 0.01: the stored value survives unchanged.
        let n = notes(&[("math", 50.0), ("physique", 70.0)]);
        assert_eq!(reconcile_moyenne(60.005, &n), 60.005);
    }

    #[test]
    fn test_tolerance_boundary_is_strict() {
        let n = notes(&[("math", 60.0)]);
        // Inside the tolerance the stored value is kept...
        assert_eq!(reconcile_moyenne(60.008, &n), 60.008);
        // ...just past it, the recomputed mean wins.
        assert_eq!(reconcile_moyenne(60.02, &n), 60.0);
    }

    #[test]
    fn test_assemble_fills_missing_periods() {
        let rows = vec![row(1, 2, notes(&[("math", 80.0)]), 80.0)];
        let results = assemble_results("GL", rows);

        assert_eq!(results.years.len(), 1);
        let year = &results.years[0];
        assert_eq!(year.annee, 1);
        assert_eq!(year.classe, "GL1");
        assert_eq!(year.periods.len(), 3);

        // Period order is ascending; the empty cells carry moyenne 0.
        assert_eq!(year.periods[0].periode, 1);
        assert!(year.periods[0].notes.is_empty());
        assert_eq!(year.periods[0].moyenne, 0.0);
        assert_eq!(year.periods[1].moyenne, 80.0);
        assert_eq!(year.periods[2].moyenne, 0.0);
    }

    #[test]
    fn test_assemble_omits_years_without_data() {
        let rows = vec![row(3, 1, notes(&[("info", 55.0)]), 55.0)];
        let results = assemble_results("", rows);

        assert_eq!(results.years.len(), 1);
        assert_eq!(results.years[0].annee, 3);
        assert_eq!(results.years[0].classe, "L3");
    }

    #[test]
    fn test_assemble_empty_rows_yields_no_years() {
        let results = assemble_results("GL", Vec::new());
        assert!(results.years.is_empty());
        assert_eq!(results.option, "GL");
    }

    #[test]
    fn test_assemble_never_fabricates_scores() {
        let n = notes(&[("math", 45.5)]);
        let rows = vec![row(2, 3, n.clone(), 0.0)];
        let results = assemble_results("RT", rows);

        let period = &results.years[0].periods[2];
        assert_eq!(period.notes, n);
        assert_eq!(period.moyenne, 45.5);
    }
}
