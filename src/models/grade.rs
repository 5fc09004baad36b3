// src/models/grade.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// A row of the 'notes_periodes' table: the grades of one student for one
/// (annee, periode) cell. The table is keyed by (code_etudiant, annee,
/// periode); the 3x3 cell domain is iterated as data by the aggregator.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GradeRow {
    pub code_etudiant: String,

    /// Academic year, 1 to 3.
    pub annee: i64,

    /// Grading period within the year, 1 to 3.
    pub periode: i64,

    /// Owning user, when the student account is linked.
    pub user_id: Option<i64>,

    /// Subject name -> numeric score.
    pub notes: Json<HashMap<String, f64>>,

    /// Stored average. Zero or inconsistent values are recomputed on read.
    pub moyenne: f64,
}

/// One grading period in the aggregated response. Built even when no row
/// exists for the cell (empty notes, moyenne 0).
#[derive(Debug, Serialize, PartialEq)]
pub struct PeriodResult {
    pub periode: i64,
    pub title: String,
    pub notes: HashMap<String, f64>,
    pub moyenne: f64,
}

/// One academic year in the aggregated response. Years with no graded
/// period at all are omitted.
#[derive(Debug, Serialize, PartialEq)]
pub struct YearResult {
    pub annee: i64,
    #[serde(rename = "academicYear")]
    pub academic_year: String,
    pub classe: String,
    pub periods: Vec<PeriodResult>,
}

/// Full transcript for one student.
#[derive(Debug, Serialize, PartialEq)]
pub struct GradeResults {
    pub option: String,
    pub years: Vec<YearResult>,
}

/// DTO for the grade search endpoint.
#[derive(Debug, Deserialize, Validate)]
pub struct ResultsByCodeRequest {
    #[validate(length(min = 1, max = 50, message = "Code étudiant requis"))]
    pub code: String,
}

/// DTO for the admin grade-entry endpoint.
#[derive(Debug, Deserialize)]
pub struct SaveNotesRequest {
    pub code: Option<String>,
    pub annee: Option<i64>,
    pub periode: Option<i64>,
    pub math: Option<f64>,
    pub physique: Option<f64>,
    pub info: Option<f64>,
    pub moyenne: Option<f64>,
}
