use std::path::Path;

use tracing::{debug, info};

use crate::error::{DashboardError, Result};
use crate::models::StudentRecord;

/// Columns every aggregation relies on. `internet_quality` is optional.
pub const REQUIRED_COLUMNS: [&str; 15] = [
    "student_id",
    "age",
    "gender",
    "study_hours_per_day",
    "social_media_hours",
    "netflix_hours",
    "part_time_job",
    "attendance_percentage",
    "sleep_hours",
    "diet_quality",
    "exercise_frequency",
    "parental_education_level",
    "mental_health_rating",
    "extracurricular_participation",
    "exam_score",
];

/// Reads the student table. Fails on missing columns, badly typed cells or an empty file.
pub fn load_students(csv_path: &Path) -> Result<Vec<StudentRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;
    read_students(&mut reader, &csv_path.display().to_string())
}

pub fn read_students<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    source: &str,
) -> Result<Vec<StudentRecord>> {
    let headers = reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DashboardError::MissingColumns {
            path: source.to_string(),
            columns: missing,
        });
    }

    let mut students = Vec::new();
    for result in reader.deserialize::<StudentRecord>() {
        students.push(result?);
    }

    if students.is_empty() {
        return Err(DashboardError::EmptyTable(source.to_string()));
    }

    let incomplete = students
        .iter()
        .filter(|s| s.exam_score.is_none())
        .count();
    debug!(incomplete, "students without an exam score");
    info!(rows = students.len(), source, "loaded student table");
    Ok(students)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DietQuality;
    use std::io::Write;

    const HEADER: &str = "student_id,age,gender,study_hours_per_day,social_media_hours,netflix_hours,part_time_job,attendance_percentage,sleep_hours,diet_quality,exercise_frequency,parental_education_level,internet_quality,mental_health_rating,extracurricular_participation,exam_score";

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn parses_rows_with_missing_cells() {
        let file = write_csv(
            "S1000,23,Female,0.0,1.2,1.1,No,85.0,8.0,Fair,6,Master,Average,8,Yes,56.2\n\
             S1001,20,Female,6.9,2.8,2.3,No,97.3,4.6,Good,6,High School,Average,8,No,\n\
             S1002,21,Male,1.4,,0.0,Yes,94.8,8.0,,1,,Poor,1,No,34.3\n",
        );
        let students = load_students(file.path()).unwrap();

        assert_eq!(students.len(), 3);
        assert_eq!(students[0].diet_quality, Some(DietQuality::Fair));
        assert_eq!(students[0].part_time_job, Some(false));
        assert_eq!(students[0].extracurricular_participation, Some(true));
        assert_eq!(students[1].exam_score, None);
        assert_eq!(students[1].parental_education_level.as_deref(), Some("High School"));
        assert_eq!(students[2].social_media_hours, None);
        assert_eq!(students[2].diet_quality, None);
        assert_eq!(students[2].parental_education_level, None);
    }

    #[test]
    fn missing_columns_fail_fast() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "student_id,age,exam_score").unwrap();
        writeln!(file, "S1,20,70").unwrap();

        match load_students(file.path()) {
            Err(DashboardError::MissingColumns { columns, .. }) => {
                assert!(columns.contains(&"sleep_hours".to_string()));
                assert!(!columns.contains(&"exam_score".to_string()));
            }
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn wrong_types_fail_fast() {
        let file = write_csv("S1,20,Male,lots,1,1,No,90,7,Good,3,Master,Good,5,No,70\n");
        assert!(matches!(load_students(file.path()), Err(DashboardError::Csv(_))));
    }

    #[test]
    fn empty_table_is_an_error() {
        let file = write_csv("");
        assert!(matches!(
            load_students(file.path()),
            Err(DashboardError::EmptyTable(_))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_students(Path::new("/definitely/not/here.csv")).is_err());
    }

    #[test]
    fn bundled_sample_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/student_habits_performance.csv");
        let students = load_students(&path).unwrap();
        assert!(students.len() >= 100);
    }
}
