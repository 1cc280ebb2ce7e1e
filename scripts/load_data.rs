//! Load data script for Masjid SaaS
//!
//! Populates the store:
//! - Demo tenants, users and rows (same seed the server writes on first start)
//! - Optional generated cash-book entries for a tenant, to exercise summaries
//! Run: cargo run --bin load_data -- --sample-transactions 200

use std::path::PathBuf;

use chrono::{Duration, Utc};
use clap::Parser;
use uuid::Uuid;

use masjid_saas::models::{demo, ensure_seed_data, Tenant, Transaction, TransactionType};
use masjid_saas::reports::finance_summary;
use masjid_saas::storage::Storage;
use masjid_saas::tenancy::resolve_tenant;

const INCOME_CATEGORIES: &[&str] = &["Kotak Jumat", "Donasi", "Infaq Pembangunan", "Sewa Aula"];
const EXPENSE_CATEGORIES: &[&str] = &["Listrik & Air", "Kebersihan", "Honor Imam", "Renovasi"];

#[derive(Parser)]
#[command(name = "load_data", about = "Populate the Masjid SaaS store with demo data")]
struct Args {
    /// Sled data directory (same as the server's MASJID_DATA_DIR)
    #[arg(short, long, env = "MASJID_DATA_DIR", default_value = "masjid_data")]
    data_dir: PathBuf,

    /// Number of generated finance rows to add
    #[arg(short = 'n', long, default_value_t = 0)]
    sample_transactions: usize,

    /// Tenant slug receiving the generated rows
    #[arg(short, long, default_value = demo::TENANT_SLUG)]
    tenant: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let storage = Storage::open(&args.data_dir)?;

    if storage.is_seeded::<Tenant>()? {
        println!("ℹ️  Demo data already loaded, existing rows are kept");
    } else {
        println!("🌱 Seeding demo data...");
    }
    ensure_seed_data(&storage)?;
    println!(
        "✅ Demo data present: {} tenants, login {} / {}",
        storage.list::<Tenant>()?.len(),
        demo::SUPERADMIN_EMAIL,
        demo::SUPERADMIN_PASSWORD
    );

    if args.sample_transactions > 0 {
        let Some(tenant) = resolve_tenant(&storage, &args.tenant)? else {
            return Err(format!("tenant '{}' not found", args.tenant).into());
        };

        let now = Utc::now();
        for i in 0..args.sample_transactions {
            // Roughly two income rows per expense row
            let (kind, categories) = if i % 3 == 2 {
                (TransactionType::Expense, EXPENSE_CATEGORIES)
            } else {
                (TransactionType::Income, INCOME_CATEGORIES)
            };
            let category = categories[i % categories.len()];
            let tx = Transaction {
                id: Uuid::new_v4().to_string(),
                tenant_id: tenant.id.clone(),
                kind,
                amount: 50_000 + (i as u64 % 20) * 25_000,
                category: category.to_string(),
                description: format!("Sample entry #{}", i + 1),
                date: (now - Duration::days((i % 90) as i64)).date_naive(),
                created_by: demo::DKM_ADMIN_ID.to_string(),
                created_at: now,
            };
            storage.create(&tx)?;
        }
        println!(
            "✅ Added {} sample transactions to {}",
            args.sample_transactions, tenant.slug
        );

        let summary = finance_summary(&storage.list_for_tenant::<Transaction>(&tenant.id)?.items);
        println!(
            "📊 {}: income {} | expense {} | balance {}",
            tenant.name, summary.total_income, summary.total_expense, summary.balance
        );
    }

    storage.flush()?;
    Ok(())
}
