use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::{
    errors::BookingResult,
    models::template::WorkingHoursTemplate,
    store::SchoolDirectory,
};

/// Resolves the working-hours template for a school, falling back to the
/// configured default.
#[derive(Clone)]
pub struct TemplateResolver {
    directory: Arc<dyn SchoolDirectory>,
    default_template: WorkingHoursTemplate,
}

impl TemplateResolver {
    pub fn new(directory: Arc<dyn SchoolDirectory>, default_template: WorkingHoursTemplate) -> Self {
        Self {
            directory,
            default_template,
        }
    }

    pub fn default_template(&self) -> &WorkingHoursTemplate {
        &self.default_template
    }

    /// Returns the school's own template, or the default one carrying the
    /// school's id. The result is always validated.
    pub async fn get_template(&self, school_id: Uuid) -> BookingResult<WorkingHoursTemplate> {
        let template = match self.directory.find_template(school_id).await? {
            Some(template) => template,
            None => {
                debug!("No template for school {}, using default", school_id);
                self.default_template.clone().for_school(school_id)
            }
        };

        template.validate()?;
        Ok(template)
    }
}
