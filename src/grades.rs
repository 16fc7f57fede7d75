//! Letter grades, color bands and the 0-4 GPA equivalent of 0-20 grades.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{GradeRecord, GradeType};
use crate::models::grade::MAX_GRADE;

pub const GPA_SCALE: f64 = 4.0;

/// Inclusive lower bounds, highest first, with a label for everything below.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable<T> {
    steps: Vec<(f64, T)>,
    fallback: T,
}

impl<T: Copy> ThresholdTable<T> {
    pub fn new(mut steps: Vec<(f64, T)>, fallback: T) -> Self {
        steps.sort_by(|a, b| b.0.total_cmp(&a.0));
        Self { steps, fallback }
    }

    pub fn classify(&self, value: f64) -> T {
        self.steps
            .iter()
            .find(|(bound, _)| value >= *bound)
            .map(|(_, label)| *label)
            .unwrap_or(self.fallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
    F,
}

/// Color classification shown next to a grade or a GPA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Excellent,
    Good,
    Passing,
    Failing,
}

pub fn letter_table() -> ThresholdTable<Letter> {
    ThresholdTable::new(
        vec![(18.0, Letter::A), (16.0, Letter::B), (13.0, Letter::C), (10.0, Letter::D)],
        Letter::F,
    )
}

pub fn band_table() -> ThresholdTable<Band> {
    ThresholdTable::new(
        vec![(18.0, Band::Excellent), (15.0, Band::Good), (10.0, Band::Passing)],
        Band::Failing,
    )
}

pub fn gpa_band_table() -> ThresholdTable<Band> {
    ThresholdTable::new(
        vec![(3.6, Band::Excellent), (3.0, Band::Good), (2.0, Band::Passing)],
        Band::Failing,
    )
}

pub fn letter_for(grade: f64) -> Letter {
    letter_table().classify(grade)
}

/// Mean of each grade rescaled from 0-20 to 0-4. Zero for no grades.
pub fn gpa<I>(grades: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = grades
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), g| (sum + g / MAX_GRADE * GPA_SCALE, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// One decimal place, with ties rounded up. `{:.1}` alone rounds ties to
/// even, which turns 2.25 into "2.2".
pub fn format_gpa(gpa: f64) -> String {
    format!("{:.1}", (gpa * 10.0).round() / 10.0)
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeLine {
    pub id: i64,
    pub subject_id: Option<i64>,
    pub grade: f64,
    pub letter: Letter,
    pub band: Band,
    pub grade_type: Option<GradeType>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeSummary {
    pub gpa: String,
    pub gpa_band: Band,
    pub count: usize,
    pub grades: Vec<GradeLine>,
}

pub fn summarize_grades(records: &[GradeRecord]) -> GradeSummary {
    let letters = letter_table();
    let bands = band_table();
    let value = gpa(records.iter().map(|r| r.grade.value()));

    let grades = records
        .iter()
        .map(|r| GradeLine {
            id: r.id,
            subject_id: r.subject.id(),
            grade: r.grade.value(),
            letter: letters.classify(r.grade.value()),
            band: bands.classify(r.grade.value()),
            grade_type: r.grade_type.clone(),
            date: r.date_g,
        })
        .collect();

    GradeSummary {
        gpa: format_gpa(value),
        gpa_band: gpa_band_table().classify(value),
        count: records.len(),
        grades,
    }
}
