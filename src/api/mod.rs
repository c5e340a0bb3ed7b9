//! REST endpoints grouped by the role that uses them

mod admin;
mod employee;
mod public;
mod superadmin;

pub use admin::AdminApi;
pub use employee::EmployeeApi;
pub use public::PublicApi;
pub use superadmin::SuperadminApi;

use serde::Deserialize;

use crate::models::ExtraField;

/// Field definitions arrive as `{extra_fields: [...]}` or as a bare list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExtraFieldsPayload {
    Wrapped {
        #[serde(default)]
        extra_fields: Vec<ExtraField>,
    },
    List(Vec<ExtraField>),
}

impl ExtraFieldsPayload {
    fn into_fields(self) -> Vec<ExtraField> {
        match self {
            ExtraFieldsPayload::Wrapped { extra_fields } => extra_fields,
            ExtraFieldsPayload::List(fields) => fields,
        }
    }
}
