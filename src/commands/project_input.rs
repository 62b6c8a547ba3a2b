use thiserror::Error;

use crate::services::calendar_yaml::{CalendarYamlError, load_calendars_from_yaml_dir};
use crate::services::project_yaml::{ProjectFile, ProjectYamlError, load_project_file};

#[derive(Error, Debug)]
pub enum InputError {
    #[error(transparent)]
    Project(#[from] ProjectYamlError),
    #[error(transparent)]
    Calendars(#[from] CalendarYamlError),
}

/// Loads a project file and merges any calendars found in `calendar_dir`.
pub fn load_project_input(input: &str, calendar_dir: Option<&str>) -> Result<ProjectFile, InputError> {
    let mut file = load_project_file(input)?;
    if let Some(dir) = calendar_dir {
        let loaded = load_calendars_from_yaml_dir(dir, &mut file.project.calendars)?;
        tracing::info!(calendars = loaded, dir, "loaded calendar directory");
    }
    Ok(file)
}
