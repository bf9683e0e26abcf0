use serde::{Deserialize, Serialize};

pub const MIN_DURATION_MINUTES: i64 = 15;
pub const MAX_DURATION_MINUTES: i64 = 240;
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppointmentStatus {
    Pending,
    #[default]
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    // Cancelled and completed appointments never participate in conflict checks.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Cancelled | Self::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
    Partial,
}

impl PaymentStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unpaid" => Some(Self::Unpaid),
            "paid" => Some(Self::Paid),
            "refunded" => Some(Self::Refunded),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
            Self::Partial => "partial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
}

// Stored as JSON text on the appointment row. Persisted only; nothing
// expands a rule into concrete occurrences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub frequency: RecurrenceFrequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_day: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRow {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub occupation: Option<String>,
    pub address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DogRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub sex: String,
    pub breed: Option<String>,
    pub dob: Option<String>,
    pub color: Option<String>,
    pub weight: Option<f64>,
    pub vet: Option<String>,
    pub medical_info: Option<String>,
    pub rabies_vaccine_date: Option<String>,
    pub are_vaccines_current: i64,
    pub is_fixed: i64,
    pub temperament: Option<String>,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub owner_email: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentRow {
    pub id: String,
    pub customer_id: String,
    pub dog_id: String,
    pub scheduled_for: String,
    pub duration_minutes: i64,
    pub cost: f64,
    pub notes: Option<String>,
    pub status: String,
    pub is_recurring: i64,
    pub recurrence_rule: Option<String>,
    pub conflict_flag: i64,
    pub conflict_note: Option<String>,
    pub payment_status: String,
    pub transaction_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub dog_name: Option<String>,
    pub dog_breed: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DogSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerBody {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CustomerRow> for CustomerBody {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            occupation: row.occupation,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DogBody {
    pub id: String,
    pub owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<CustomerSummary>,
    pub name: String,
    pub sex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rabies_vaccine_date: Option<String>,
    pub are_vaccines_current: bool,
    pub is_fixed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperament: Option<String>,
    #[serde(rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<DogRow> for DogBody {
    fn from(row: DogRow) -> Self {
        let owner = row.owner_name.map(|name| CustomerSummary {
            id: row.owner_id.clone(),
            name,
            phone: row.owner_phone.unwrap_or_default(),
            email: row.owner_email,
        });
        Self {
            id: row.id,
            owner_id: row.owner_id,
            owner,
            name: row.name,
            sex: row.sex,
            breed: row.breed,
            dob: row.dob,
            color: row.color,
            weight: row.weight,
            vet: row.vet,
            medical_info: row.medical_info,
            rabies_vaccine_date: row.rabies_vaccine_date,
            are_vaccines_current: row.are_vaccines_current != 0,
            is_fixed: row.is_fixed != 0,
            temperament: row.temperament,
            image_url: row.image_url,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentBody {
    pub id: String,
    pub customer_id: String,
    pub dog_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dog: Option<DogSummary>,
    pub date_time: String,
    pub duration_minutes: i64,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: String,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<RecurrenceRule>,
    pub conflict_flag: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_note: Option<String>,
    pub payment_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<AppointmentRow> for AppointmentBody {
    fn from(row: AppointmentRow) -> Self {
        let customer = row.customer_name.map(|name| CustomerSummary {
            id: row.customer_id.clone(),
            name,
            phone: row.customer_phone.unwrap_or_default(),
            email: row.customer_email,
        });
        let dog = row.dog_name.map(|name| DogSummary {
            id: row.dog_id.clone(),
            name,
            breed: row.dog_breed,
        });
        let recurrence_rule = row
            .recurrence_rule
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());
        Self {
            id: row.id,
            customer_id: row.customer_id,
            dog_id: row.dog_id,
            customer,
            dog,
            date_time: row.scheduled_for,
            duration_minutes: row.duration_minutes,
            cost: row.cost,
            notes: row.notes,
            status: row.status,
            is_recurring: row.is_recurring != 0,
            recurrence_rule,
            conflict_flag: row.conflict_flag != 0,
            conflict_note: row.conflict_note,
            payment_status: row.payment_status,
            transaction_id: row.transaction_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
