use std::sync::Arc;

use tracing::info;

use crate::error::AppError;
use crate::grades::{GradeSummary, summarize_grades};
use crate::models::{GradeValue, NewGradeRequest};
use crate::school_api::SchoolApi;

#[derive(Clone)]
pub struct GradeService {
    school: Arc<dyn SchoolApi>,
}

impl GradeService {
    pub fn new(school: Arc<dyn SchoolApi>) -> Self {
        Self { school }
    }

    pub async fn summary(&self, student_id: i64, subject_id: Option<i64>) -> Result<GradeSummary, AppError> {
        let records = self.school.fetch_grades(student_id, subject_id).await?;
        Ok(summarize_grades(&records))
    }

    pub async fn add(&self, req: NewGradeRequest) -> Result<GradeSummary, AppError> {
        validate(&req)?;
        self.school.create_grade(&req).await?;
        info!("Added grade {} for student {}", req.grade, req.student);
        self.summary(req.student, None).await
    }

    pub async fn edit(&self, id: i64, req: NewGradeRequest) -> Result<GradeSummary, AppError> {
        validate(&req)?;
        self.school.update_grade(id, &req).await?;
        info!("Updated grade {} for student {}", id, req.student);
        self.summary(req.student, None).await
    }

    pub async fn delete(
        &self,
        id: i64,
        student_id: i64,
        subject_id: Option<i64>,
    ) -> Result<GradeSummary, AppError> {
        self.school.delete_grade(id).await?;
        info!("Deleted grade {} for student {}", id, student_id);
        self.summary(student_id, subject_id).await
    }
}

fn validate(req: &NewGradeRequest) -> Result<(), AppError> {
    GradeValue::new(req.grade)
        .map(|_| ())
        .ok_or_else(|| AppError::BadRequest("Grade must be between 0 and 20.".to_string()))
}
