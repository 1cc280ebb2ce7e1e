//! Resource entities stored in the indexed entity store.
//!
//! JSON field names are camelCase to match the web client, except the ZIS
//! fields the API has always exposed in snake_case.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::hash_password;
use crate::error::StoreResult;
use crate::storage::{Entity, Storage};

/// Fixed ids of the demo rows written on first start.
pub mod demo {
    pub const TENANT_ID: &str = "5f0c3c2e-8a4b-4f1e-9d3a-1b2c3d4e5f60";
    pub const TENANT_SLUG: &str = "al-ikhlas";
    pub const PENDING_TENANT_ID: &str = "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d";
    pub const PENDING_TENANT_SLUG: &str = "an-nur";
    pub const SUPERADMIN_ID: &str = "00000000-0000-4000-8000-000000000001";
    pub const SUPERADMIN_EMAIL: &str = "superadmin@masjid.app";
    pub const SUPERADMIN_PASSWORD: &str = "admin123";
    pub const DKM_ADMIN_ID: &str = "00000000-0000-4000-8000-000000000002";
    pub const DKM_ADMIN_EMAIL: &str = "dkm@al-ikhlas.id";
    pub const DKM_ADMIN_PASSWORD: &str = "dkm12345";
    pub const AMIL_ID: &str = "00000000-0000-4000-8000-000000000003";
    pub const AMIL_EMAIL: &str = "amil@al-ikhlas.id";
    pub const AMIL_PASSWORD: &str = "amil12345";
    pub const EVENT_ID: &str = "e0000000-0000-4000-8000-000000000001";
}

// ---------------------------------------------------------------------------
// Tenant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Pending,
    Suspended,
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TenantStatus::Active => "active",
            TenantStatus::Pending => "pending",
            TenantStatus::Suspended => "suspended",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankInfo {
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
}

/// One onboarded mosque with its own data partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub name: String,
    /// URL-safe, globally unique.
    pub slug: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub status: TenantStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_info: Option<BankInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Entity for Tenant {
    const COLLECTION: &'static str = "tenants";

    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            slug: String::new(),
            owner_id: String::new(),
            created_at: Utc::now(),
            status: TenantStatus::Pending,
            address: None,
            bank_info: None,
            bio: None,
            phone: None,
        }
    }

    fn lookup_keys(&self) -> Vec<(&'static str, String)> {
        if self.slug.is_empty() {
            Vec::new()
        } else {
            vec![("slug", self.slug.clone())]
        }
    }

    fn seed() -> Vec<Self> {
        vec![
            Tenant {
                id: demo::TENANT_ID.to_string(),
                name: "Masjid Al-Ikhlas".to_string(),
                slug: demo::TENANT_SLUG.to_string(),
                owner_id: demo::DKM_ADMIN_ID.to_string(),
                created_at: Utc::now(),
                status: TenantStatus::Active,
                address: Some("Jl. Merdeka No. 10, Bandung".to_string()),
                bank_info: Some(BankInfo {
                    bank_name: "Bank Syariah Indonesia".to_string(),
                    account_number: "7123456789".to_string(),
                    account_holder: "DKM Masjid Al-Ikhlas".to_string(),
                }),
                bio: Some("Masjid jami' untuk warga Kelurahan Merdeka.".to_string()),
                phone: None,
            },
            Tenant {
                id: demo::PENDING_TENANT_ID.to_string(),
                name: "Masjid An-Nur".to_string(),
                slug: demo::PENDING_TENANT_SLUG.to_string(),
                owner_id: demo::DKM_ADMIN_ID.to_string(),
                created_at: Utc::now(),
                status: TenantStatus::Pending,
                address: Some("Jl. Sudirman No. 5, Bandung".to_string()),
                bank_info: None,
                bio: None,
                phone: None,
            },
        ]
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Platform role. `superadmin` and `mosque_admin` are legacy spellings
/// accepted on input only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[serde(alias = "superadmin")]
    SuperadminPlatform,
    #[serde(alias = "mosque_admin")]
    DkmAdmin,
    AmilZakat,
    Ustadz,
    Jamaah,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperadminPlatform => "superadmin_platform",
            UserRole::DkmAdmin => "dkm_admin",
            UserRole::AmilZakat => "amil_zakat",
            UserRole::Ustadz => "ustadz",
            UserRole::Jamaah => "jamaah",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub tenant_ids: BTreeSet<String>,
    /// bcrypt hash; never leaves the server (see [`UserProfile`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user, without credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub tenant_ids: BTreeSet<String>,
}

impl AppUser {
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            tenant_ids: self.tenant_ids.clone(),
        }
    }

    pub fn is_member_of(&self, tenant_id: &str) -> bool {
        self.tenant_ids.contains(tenant_id)
    }

    fn seeded(id: &str, name: &str, email: &str, password: &str, role: UserRole) -> Option<Self> {
        let password_hash = hash_password(password)
            .map_err(|e| warn!(email, error = %e, "Skipping seed user, hashing failed"))
            .ok()?;
        let tenant_ids = match role {
            UserRole::SuperadminPlatform => BTreeSet::new(),
            _ => BTreeSet::from([demo::TENANT_ID.to_string()]),
        };
        Some(Self {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            tenant_ids,
            password_hash: Some(password_hash),
            created_at: Utc::now(),
        })
    }
}

impl Entity for AppUser {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            email: String::new(),
            role: UserRole::Jamaah,
            tenant_ids: BTreeSet::new(),
            password_hash: None,
            created_at: Utc::now(),
        }
    }

    fn lookup_keys(&self) -> Vec<(&'static str, String)> {
        if self.email.is_empty() {
            Vec::new()
        } else {
            vec![("email", Self::normalize_email(&self.email))]
        }
    }

    fn seed() -> Vec<Self> {
        [
            AppUser::seeded(
                demo::SUPERADMIN_ID,
                "Platform Admin",
                demo::SUPERADMIN_EMAIL,
                demo::SUPERADMIN_PASSWORD,
                UserRole::SuperadminPlatform,
            ),
            AppUser::seeded(
                demo::DKM_ADMIN_ID,
                "Ahmad Fauzi",
                demo::DKM_ADMIN_EMAIL,
                demo::DKM_ADMIN_PASSWORD,
                UserRole::DkmAdmin,
            ),
            AppUser::seeded(
                demo::AMIL_ID,
                "Siti Aminah",
                demo::AMIL_EMAIL,
                demo::AMIL_PASSWORD,
                UserRole::AmilZakat,
            ),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

/// A mosque cash-book entry. Amounts are in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: u64,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Transaction {
    const COLLECTION: &'static str = "transactions";

    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            tenant_id: String::new(),
            kind: TransactionType::Income,
            amount: 0,
            category: String::new(),
            description: String::new(),
            date: now.date_naive(),
            created_by: String::new(),
            created_at: now,
        }
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }

    fn seed() -> Vec<Self> {
        let now = Utc::now();
        let rows = [
            ("f0000000-0000-4000-8000-000000000001", TransactionType::Income, 2_500_000, "Kotak Jumat", "Infaq Jumat pekan pertama"),
            ("f0000000-0000-4000-8000-000000000002", TransactionType::Expense, 750_000, "Listrik & Air", "Tagihan PLN bulan ini"),
            ("f0000000-0000-4000-8000-000000000003", TransactionType::Income, 1_000_000, "Donasi", "Donasi hamba Allah"),
        ];
        rows.into_iter()
            .map(|(id, kind, amount, category, description)| Transaction {
                id: id.to_string(),
                tenant_id: demo::TENANT_ID.to_string(),
                kind,
                amount,
                category: category.to_string(),
                description: description.to_string(),
                date: now.date_naive(),
                created_by: demo::DKM_ADMIN_ID.to_string(),
                created_at: now,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ZIS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZisType {
    ZakatFitrah,
    ZakatMaal,
    Fidyah,
    InfaqShadaqah,
}

/// `In` is a collection from a muzakki, `Out` a disbursement to a mustahik.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZisFlow {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZisTransaction {
    pub id: String,
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub kind: ZisType,
    pub flow: ZisFlow,
    pub amount: u64,
    #[serde(rename = "muzakki_name", default, skip_serializing_if = "Option::is_none")]
    pub muzakki_name: Option<String>,
    #[serde(rename = "mustahik_id", default, skip_serializing_if = "Option::is_none")]
    pub mustahik_id: Option<String>,
    #[serde(rename = "payment_status", default)]
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for ZisTransaction {
    const COLLECTION: &'static str = "zis_transactions";

    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            tenant_id: String::new(),
            kind: ZisType::InfaqShadaqah,
            flow: ZisFlow::In,
            amount: 0,
            muzakki_name: None,
            mustahik_id: None,
            payment_status: PaymentStatus::Pending,
            notes: None,
            date: now.date_naive(),
            created_by: String::new(),
            created_at: now,
        }
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }

    fn seed() -> Vec<Self> {
        let now = Utc::now();
        vec![
            ZisTransaction {
                id: "a0000000-0000-4000-8000-000000000001".to_string(),
                tenant_id: demo::TENANT_ID.to_string(),
                kind: ZisType::ZakatFitrah,
                flow: ZisFlow::In,
                amount: 450_000,
                muzakki_name: Some("Budi Santoso".to_string()),
                mustahik_id: None,
                payment_status: PaymentStatus::Paid,
                notes: Some("Zakat fitrah 10 jiwa".to_string()),
                date: now.date_naive(),
                created_by: demo::AMIL_ID.to_string(),
                created_at: now,
            },
            ZisTransaction {
                id: "a0000000-0000-4000-8000-000000000002".to_string(),
                tenant_id: demo::TENANT_ID.to_string(),
                kind: ZisType::ZakatFitrah,
                flow: ZisFlow::Out,
                amount: 135_000,
                muzakki_name: None,
                mustahik_id: Some("mustahik-001".to_string()),
                payment_status: PaymentStatus::Paid,
                notes: None,
                date: now.date_naive(),
                created_by: demo::AMIL_ID.to_string(),
                created_at: now,
            },
        ]
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    #[default]
    Good,
    NeedsRepair,
    Broken,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub condition: ItemCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for InventoryItem {
    const COLLECTION: &'static str = "inventory";

    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tenant_id: String::new(),
            name: String::new(),
            category: String::new(),
            quantity: 0,
            unit: String::new(),
            condition: ItemCondition::Good,
            location: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }

    fn seed() -> Vec<Self> {
        let now = Utc::now();
        vec![
            InventoryItem {
                id: "b0000000-0000-4000-8000-000000000001".to_string(),
                tenant_id: demo::TENANT_ID.to_string(),
                name: "Karpet Sajadah".to_string(),
                category: "Perlengkapan Sholat".to_string(),
                quantity: 40,
                unit: "gulung".to_string(),
                condition: ItemCondition::Good,
                location: Some("Ruang utama".to_string()),
                notes: None,
                created_at: now,
            },
            InventoryItem {
                id: "b0000000-0000-4000-8000-000000000002".to_string(),
                tenant_id: demo::TENANT_ID.to_string(),
                name: "Sound System".to_string(),
                category: "Elektronik".to_string(),
                quantity: 1,
                unit: "set".to_string(),
                condition: ItemCondition::NeedsRepair,
                location: Some("Mimbar".to_string()),
                notes: Some("Mic wireless sering putus".to_string()),
                created_at: now,
            },
        ]
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub tenant_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// `None` means unlimited seats.
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub current_registrations: u32,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.current_registrations >= capacity)
    }

    pub fn remaining_seats(&self) -> Option<u32> {
        self.capacity
            .map(|capacity| capacity.saturating_sub(self.current_registrations))
    }
}

impl Entity for Event {
    const COLLECTION: &'static str = "events";

    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            tenant_id: String::new(),
            title: String::new(),
            description: String::new(),
            date: now,
            location: String::new(),
            speaker: None,
            capacity: None,
            current_registrations: 0,
            created_at: now,
        }
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }

    fn seed() -> Vec<Self> {
        let now = Utc::now();
        vec![Event {
            id: demo::EVENT_ID.to_string(),
            tenant_id: demo::TENANT_ID.to_string(),
            title: "Kajian Tafsir Ahad Pagi".to_string(),
            description: "Kajian rutin tafsir Juz 'Amma".to_string(),
            date: now + Duration::days(7),
            location: "Ruang utama".to_string(),
            speaker: Some("Ustadz Hasan".to_string()),
            capacity: Some(50),
            current_registrations: 0,
            created_at: now,
        }]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistration {
    pub id: String,
    pub tenant_id: String,
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl Entity for EventRegistration {
    const COLLECTION: &'static str = "event_registrations";

    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tenant_id: String::new(),
            event_id: String::new(),
            user_id: None,
            name: String::new(),
            email: None,
            phone: None,
            registered_at: Utc::now(),
        }
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }
}

// ---------------------------------------------------------------------------
// Forum, prayer schedule, notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: String,
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub author_name: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for ForumPost {
    const COLLECTION: &'static str = "forum_posts";

    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tenant_id: String::new(),
            author_id: None,
            author_name: String::new(),
            title: String::new(),
            content: String::new(),
            category: String::new(),
            created_at: Utc::now(),
        }
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }

    fn seed() -> Vec<Self> {
        vec![ForumPost {
            id: "c0000000-0000-4000-8000-000000000001".to_string(),
            tenant_id: demo::TENANT_ID.to_string(),
            author_id: Some(demo::DKM_ADMIN_ID.to_string()),
            author_name: "Ahmad Fauzi".to_string(),
            title: "Jadwal kerja bakti".to_string(),
            content: "Kerja bakti membersihkan masjid Sabtu pagi ba'da Subuh.".to_string(),
            category: "pengumuman".to_string(),
            created_at: Utc::now(),
        }]
    }
}

/// Daily prayer times for one tenant. Stored under the tenant's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerSchedule {
    pub id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub fajr: Option<NaiveTime>,
    #[serde(default)]
    pub dhuhr: Option<NaiveTime>,
    #[serde(default)]
    pub asr: Option<NaiveTime>,
    #[serde(default)]
    pub maghrib: Option<NaiveTime>,
    #[serde(default)]
    pub isha: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jumuah_khatib: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PrayerSchedule {
    pub fn is_configured(&self) -> bool {
        [self.fajr, self.dhuhr, self.asr, self.maghrib, self.isha]
            .iter()
            .all(Option::is_some)
    }
}

impl Entity for PrayerSchedule {
    const COLLECTION: &'static str = "prayer_schedules";

    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tenant_id: id.to_string(),
            fajr: None,
            dhuhr: None,
            asr: None,
            maghrib: None,
            isha: None,
            jumuah_khatib: None,
            updated_at: Utc::now(),
        }
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }

    fn seed() -> Vec<Self> {
        vec![PrayerSchedule {
            id: demo::TENANT_ID.to_string(),
            tenant_id: demo::TENANT_ID.to_string(),
            fajr: NaiveTime::from_hms_opt(4, 35, 0),
            dhuhr: NaiveTime::from_hms_opt(11, 55, 0),
            asr: NaiveTime::from_hms_opt(15, 15, 0),
            maghrib: NaiveTime::from_hms_opt(17, 55, 0),
            isha: NaiveTime::from_hms_opt(19, 5, 0),
            jumuah_khatib: Some("Ustadz Hasan".to_string()),
            updated_at: Utc::now(),
        }]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub tenant_id: String,
    /// `None` broadcasts to every member of the tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Notification {
    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tenant_id: String::new(),
            user_id: None,
            title: String::new(),
            message: String::new(),
            read: false,
            created_at: Utc::now(),
        }
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }

    fn seed() -> Vec<Self> {
        vec![Notification {
            id: "d0000000-0000-4000-8000-000000000001".to_string(),
            tenant_id: demo::TENANT_ID.to_string(),
            user_id: None,
            title: "Selamat datang".to_string(),
            message: "Dashboard Masjid Al-Ikhlas sudah aktif.".to_string(),
            read: false,
            created_at: Utc::now(),
        }]
    }
}

/// Write the demo rows of every collection once.
pub fn ensure_seed_data(storage: &Storage) -> StoreResult<()> {
    storage.ensure_seed::<Tenant>()?;
    storage.ensure_seed::<AppUser>()?;
    storage.ensure_seed::<Transaction>()?;
    storage.ensure_seed::<ZisTransaction>()?;
    storage.ensure_seed::<InventoryItem>()?;
    storage.ensure_seed::<Event>()?;
    storage.ensure_seed::<EventRegistration>()?;
    storage.ensure_seed::<ForumPost>()?;
    storage.ensure_seed::<PrayerSchedule>()?;
    storage.ensure_seed::<Notification>()?;
    Ok(())
}
