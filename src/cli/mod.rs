use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{
    AdjustmentInput, FacilityAdmin, GridQuery, LedgerItemInput, RentInput, ResidentInput,
    SpaceInput,
};
use crate::config::Settings;
use crate::domain::{
    format_cents, parse_cents, AdjustmentKind, LedgerItemKind, RentPeriod, TenantContext,
};

/// Facility back office: residents, rents, ledgers and adjustments
#[derive(Parser)]
#[command(name = "facility")]
#[command(about = "Back-office tool for residential and assisted-living facilities")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Space (tenant) management commands
    #[command(subcommand)]
    Space(SpaceCommands),

    /// Resident management commands
    #[command(subcommand)]
    Resident(ResidentCommands),

    /// Room rent commands
    #[command(subcommand)]
    Rent(RentCommands),

    /// Monthly resident ledger commands
    #[command(subcommand)]
    Ledger(LedgerCommands),

    /// Resident credit and discount commands
    #[command(subcommand)]
    Adjustment(AdjustmentCommands),

    /// Ledger line item commands
    #[command(subcommand)]
    Item(ItemCommands),
}

#[derive(Subcommand)]
pub enum SpaceCommands {
    /// Create a new space
    Create {
        /// Space name
        name: String,
    },

    /// List all spaces
    List,
}

#[derive(Subcommand)]
pub enum ResidentCommands {
    /// Admit a resident
    Add {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// Admission date (YYYY-MM-DD)
        #[arg(long)]
        admitted: String,

        /// Attending physician ID
        #[arg(long)]
        physician: Option<String>,
    },

    /// List residents
    List {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "20")]
        per_page: u32,
    },
}

#[derive(Subcommand)]
pub enum RentCommands {
    /// Add a rent to a resident
    Add {
        /// Resident ID
        resident: String,

        /// Amount per period (e.g., "1000.00")
        amount: String,

        /// Rent period: monthly, weekly, daily
        #[arg(short, long, default_value = "monthly")]
        period: String,

        /// First day of the rent (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day of the rent (YYYY-MM-DD, omit for open-ended)
        #[arg(long)]
        end: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum LedgerCommands {
    /// Create the ledger of a month
    Add {
        /// Resident ID
        resident: String,

        /// Any date in the ledger month (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List the ledgers of a resident
    List {
        /// Resident ID
        resident: String,
    },

    /// Show a ledger with its items
    Show {
        /// Ledger ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum AdjustmentCommands {
    /// Add a credit or discount
    Add {
        /// Resident ID
        resident: String,

        /// Kind: credit or discount
        kind: String,

        /// Amount per month (e.g., "50.00")
        amount: String,

        /// First month (any date in it, YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last month (any date in it, YYYY-MM-DD)
        #[arg(long)]
        end: String,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Remove a credit or discount
    Remove {
        /// Adjustment ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ItemCommands {
    /// Add a line item to a ledger
    Add {
        /// Ledger ID
        ledger: String,

        /// Kind: expense, credit_discount, payment_received, not_private_pay_payment_received
        kind: String,

        /// Amount (e.g., "25.50")
        amount: String,

        /// Effective date inside the ledger month (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        #[arg(short, long)]
        notes: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let admin = FacilityAdmin::init(&self.settings).await?;

        match self.command {
            Commands::Init => {
                println!("Database initialized: {}", self.settings.database.display());
            }

            Commands::Space(cmd) => run_space_command(&admin, cmd).await?,

            Commands::Resident(cmd) => {
                let ctx = tenant(&admin, &self.settings).await?;
                run_resident_command(&admin, &ctx, cmd).await?;
            }

            Commands::Rent(RentCommands::Add {
                resident,
                amount,
                period,
                start,
                end,
            }) => {
                let ctx = tenant(&admin, &self.settings).await?;
                let period = RentPeriod::from_str(&period).ok_or_else(|| {
                    anyhow!("Invalid rent period '{}'. Valid: monthly, weekly, daily", period)
                })?;
                let input = RentInput {
                    period,
                    amount: parse_amount(&amount)?,
                    start: parse_date(&start)?,
                    end: end.as_deref().map(parse_date).transpose()?,
                    notes: None,
                };
                let rent = admin.rents.add(&ctx, parse_id(&resident)?, input).await?;
                println!("Added rent: {} {} ({})", format_cents(rent.amount), rent.period, rent.id);
            }

            Commands::Ledger(cmd) => {
                let ctx = tenant(&admin, &self.settings).await?;
                run_ledger_command(&admin, &ctx, cmd).await?;
            }

            Commands::Adjustment(cmd) => {
                let ctx = tenant(&admin, &self.settings).await?;
                run_adjustment_command(&admin, &ctx, cmd).await?;
            }

            Commands::Item(ItemCommands::Add {
                ledger,
                kind,
                amount,
                date,
                notes,
            }) => {
                let ctx = tenant(&admin, &self.settings).await?;
                let kind = LedgerItemKind::from_str(&kind)
                    .ok_or_else(|| anyhow!("Invalid item kind '{}'", kind))?;
                let mut input =
                    LedgerItemInput::new(kind, parse_amount(&amount)?, parse_date(&date)?);
                input.notes = notes;
                let item = admin.ledger_items.add(&ctx, parse_id(&ledger)?, input).await?;
                let ledger = admin.ledgers.get(&ctx, item.ledger_id).await?;
                println!("Added {} of {} ({})", item.kind, format_cents(item.amount), item.id);
                println!("Balance due: {}", format_cents(ledger.balance_due));
            }
        }

        Ok(())
    }
}

/// Full-access context for the space named by `--space`.
async fn tenant(admin: &FacilityAdmin, settings: &Settings) -> Result<TenantContext> {
    let name = settings
        .space
        .as_deref()
        .context("No space selected. Use --space or FACILITY_SPACE")?;
    let space = admin
        .spaces
        .get_by_name(name)
        .await?
        .with_context(|| format!("Space not found: {}", name))?;
    Ok(TenantContext::full_access(space.id))
}

async fn run_space_command(admin: &FacilityAdmin, cmd: SpaceCommands) -> Result<()> {
    let ctx = TenantContext::full_access(Uuid::nil());
    match cmd {
        SpaceCommands::Create { name } => {
            let space = admin.spaces.add(&ctx, SpaceInput { name }).await?;
            println!("Created space: {} ({})", space.name, space.id);
        }

        SpaceCommands::List => {
            let spaces = admin.spaces.list(&ctx).await?;
            if spaces.is_empty() {
                println!("No spaces found.");
            } else {
                println!("{:<30} {:<36}", "NAME", "ID");
                println!("{}", "-".repeat(67));
                for space in spaces {
                    println!("{:<30} {:<36}", space.name, space.id);
                }
            }
        }
    }
    Ok(())
}

async fn run_resident_command(
    admin: &FacilityAdmin,
    ctx: &TenantContext,
    cmd: ResidentCommands,
) -> Result<()> {
    match cmd {
        ResidentCommands::Add {
            first_name,
            last_name,
            admitted,
            physician,
        } => {
            let mut input = ResidentInput::new(first_name, last_name, parse_date(&admitted)?);
            input.physician_id = physician.as_deref().map(parse_id).transpose()?;
            let resident = admin.residents.add(ctx, input).await?;
            println!("Admitted resident: {} ({})", resident.full_name(), resident.id);
        }

        ResidentCommands::List { search, page, per_page } => {
            let mut query = GridQuery::page(page, per_page);
            query.search = search;
            let result = admin.residents.grid_select(ctx, &query).await?;
            if result.items.is_empty() {
                println!("No residents found.");
            } else {
                println!("{:<30} {:<12} {:<12} {:<36}", "NAME", "ADMITTED", "DISCHARGED", "ID");
                println!("{}", "-".repeat(93));
                for resident in &result.items {
                    let discharged = resident
                        .discharged_on
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<30} {:<12} {:<12} {:<36}",
                        truncate(&resident.full_name(), 30),
                        resident.admitted_on,
                        discharged,
                        resident.id
                    );
                }
                println!("Page {} of {} ({} residents)", result.page, result.pages(), result.total);
            }
        }
    }
    Ok(())
}

async fn run_ledger_command(
    admin: &FacilityAdmin,
    ctx: &TenantContext,
    cmd: LedgerCommands,
) -> Result<()> {
    match cmd {
        LedgerCommands::Add { resident, date } => {
            let created_at = match date {
                Some(date) => parse_date(&date)?
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| anyhow!("Invalid date"))?
                    .and_utc(),
                None => Utc::now(),
            };
            let ledger = admin
                .ledgers
                .add(ctx, parse_id(&resident)?, created_at, Vec::new())
                .await?;
            println!("Created ledger {} for {}", ledger.id, ledger.month);
            println!("  Amount:                  {}", format_cents(ledger.amount));
            println!("  Balance due:             {}", format_cents(ledger.balance_due));
            println!("  Private pay balance due: {}", format_cents(ledger.private_pay_balance_due));
        }

        LedgerCommands::List { resident } => {
            let ledgers = admin.ledgers.list(ctx, parse_id(&resident)?).await?;
            if ledgers.is_empty() {
                println!("No ledgers found.");
            } else {
                println!(
                    "{:<8} {:>12} {:>12} {:>12} {:<36}",
                    "MONTH", "AMOUNT", "DUE", "PRIVATE", "ID"
                );
                println!("{}", "-".repeat(84));
                for ledger in ledgers {
                    println!(
                        "{:<8} {:>12} {:>12} {:>12} {:<36}",
                        ledger.month,
                        format_cents(ledger.amount),
                        format_cents(ledger.balance_due),
                        format_cents(ledger.private_pay_balance_due),
                        ledger.id
                    );
                }
            }
        }

        LedgerCommands::Show { id } => {
            let ledger = admin.ledgers.get(ctx, parse_id(&id)?).await?;
            let items = admin.ledger_items.list(ctx, ledger.id, None).await?;

            println!("Ledger: {}", ledger.id);
            println!("  Month:                   {}", ledger.month);
            println!(
                "  Created:                 {}",
                ledger.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("  Amount:                  {}", format_cents(ledger.amount));
            println!("  Balance due:             {}", format_cents(ledger.balance_due));
            println!("  Private pay balance due: {}", format_cents(ledger.private_pay_balance_due));
            for source in &ledger.sources {
                println!(
                    "  Source:                  {} {}",
                    source.name,
                    format_cents(source.amount)
                );
            }
            if !items.is_empty() {
                println!();
                println!("{:<12} {:<34} {:>12} {:<20}", "DATE", "KIND", "AMOUNT", "NOTES");
                println!("{}", "-".repeat(80));
                for item in items {
                    println!(
                        "{:<12} {:<34} {:>12} {:<20}",
                        item.date,
                        item.kind,
                        format_cents(item.amount),
                        truncate(item.notes.as_deref().unwrap_or(""), 20)
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_adjustment_command(
    admin: &FacilityAdmin,
    ctx: &TenantContext,
    cmd: AdjustmentCommands,
) -> Result<()> {
    match cmd {
        AdjustmentCommands::Add {
            resident,
            kind,
            amount,
            start,
            end,
            notes,
        } => {
            let kind = AdjustmentKind::from_str(&kind).ok_or_else(|| {
                anyhow!("Invalid adjustment kind '{}'. Valid: credit, discount", kind)
            })?;
            let mut input = AdjustmentInput::new(
                kind,
                parse_amount(&amount)?,
                parse_date(&start)?,
                parse_date(&end)?,
            );
            input.notes = notes;
            let item = admin.adjustments.add(ctx, parse_id(&resident)?, input).await?;
            println!(
                "Added {} of {} from {} to {} ({})",
                item.kind,
                format_cents(item.amount),
                item.start,
                item.end,
                item.id
            );
        }

        AdjustmentCommands::Remove { id } => {
            let id = parse_id(&id)?;
            admin.adjustments.remove(ctx, id).await?;
            println!("Removed adjustment: {}", id);
        }
    }
    Ok(())
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("Invalid ID '{}' (expected UUID)", id))
}

fn parse_amount(amount: &str) -> Result<i64> {
    parse_cents(amount).with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", amount))
}

fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_ledger_add() {
        let cli = Cli::try_parse_from([
            "facility",
            "--space",
            "north",
            "ledger",
            "add",
            "6f1c2d9e-8c9b-4a4e-9a53-1d1f3f1e2a10",
            "--date",
            "2024-03-05",
        ])
        .unwrap();
        assert_eq!(cli.settings.space.as_deref(), Some("north"));
        assert!(matches!(cli.command, Commands::Ledger(LedgerCommands::Add { .. })));
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("Ada", 10), "Ada");
        assert_eq!(truncate("Augusta Ada King", 10), "Augusta...");
    }

    #[test]
    fn test_parse_helpers_reject_garbage() {
        assert!(parse_id("nope").is_err());
        assert!(parse_date("2024-13-01").is_err());
        assert_eq!(parse_amount("12.50").unwrap(), 1250);
    }
}
