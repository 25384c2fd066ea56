use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};
use shared_models::ids::AppointmentId;

use super::{AppointmentFilter, Ledger, SortOrder};
use crate::models::Appointment;

const TABLE: &str = "/rest/v1/appointments";

/// Ledger over the PostgREST `appointments` table. Overlap protection relies on
/// the table's exclusion constraint, surfaced by PostgREST as HTTP 409.
pub struct SupabaseLedger {
    supabase: SupabaseClient,
}

impl SupabaseLedger {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn query_path(filter: &AppointmentFilter, sort: SortOrder, skip: usize, limit: Option<usize>) -> String {
        let mut params: Vec<String> = vec!["select=*".to_string()];

        if let Some(patient_id) = filter.patient_id {
            params.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = filter.doctor_id {
            params.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(from) = filter.from_date {
            params.push(format!("appointment_date=gte.{}", urlencoding::encode(&from.to_string())));
        }
        if let Some(to) = filter.to_date {
            params.push(format!("appointment_date=lte.{}", urlencoding::encode(&to.to_string())));
        }
        if let Some(status) = filter.status {
            params.push(format!("status=eq.{}", status));
        }

        let order = match sort {
            SortOrder::CreatedAtDesc => "created_at.desc,id.desc",
            SortOrder::StartAsc => "appointment_date.asc,start_time.asc,id.asc",
        };
        params.push(format!("order={}", order));

        if skip > 0 {
            params.push(format!("offset={}", skip));
        }
        if let Some(limit) = limit {
            params.push(format!("limit={}", limit));
        }

        format!("{}?{}", TABLE, params.join("&"))
    }
}

#[async_trait]
impl Ledger for SupabaseLedger {
    async fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>, DatabaseError> {
        let path = format!("{}?id=eq.{}&limit=1", TABLE, id);
        let mut rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<AppointmentId, DatabaseError> {
        debug!("Inserting appointment {} for doctor {}", appointment.id, appointment.doctor_id);

        let body = serde_json::to_value(appointment)?;
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(Method::POST, TABLE, Some(body), Some(SupabaseClient::return_representation()))
            .await?;

        match rows.first() {
            Some(row) => Ok(row.id),
            None => {
                error!("Insert of appointment {} returned no rows", appointment.id);
                Err(DatabaseError::NotFound(format!("appointment {} after insert", appointment.id)))
            }
        }
    }

    async fn replace_appointment(&self, id: AppointmentId, appointment: &Appointment) -> Result<bool, DatabaseError> {
        let expected = appointment.version.saturating_sub(1);
        let path = format!("{}?id=eq.{}&version=eq.{}", TABLE, id, expected);

        let body = serde_json::to_value(appointment)?;
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(body), Some(SupabaseClient::return_representation()))
            .await?;

        Ok(!rows.is_empty())
    }

    async fn query_appointments(
        &self,
        filter: &AppointmentFilter,
        sort: SortOrder,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let path = Self::query_path(filter, sort, skip, limit);
        debug!("Querying appointments: {}", path);
        self.supabase.request(Method::GET, &path, None).await
    }
}
