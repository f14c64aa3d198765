use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require_ordered, require_positive, require_text, Validate, ValidationError};
use super::{month_bounds, Cents, MonthKey, ResidentId};

pub type LedgerId = Uuid;
pub type LedgerItemId = Uuid;
pub type AdjustmentId = Uuid;

/// Share of a ledger paid by one payment source (private pay, insurer, agency...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSource {
    pub name: String,
    pub amount: Cents,
}

/// A resident's statement for one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentLedger {
    pub id: LedgerId,
    pub resident_id: ResidentId,
    /// Accounting month, derived from `created_at`
    pub month: MonthKey,
    pub created_at: DateTime<Utc>,
    /// Prorated rent charged for the month
    pub amount: Cents,
    /// What is owed after every ledger item
    pub balance_due: Cents,
    /// Private-pay portion, adjusted by credit and discount items
    pub private_pay_balance_due: Cents,
    pub sources: Vec<PaymentSource>,
}

impl ResidentLedger {
    /// Build a ledger for the month of `created_at`.
    ///
    /// `previous_amount` is the previous month's charge when no ledger exists for that
    /// month yet; it is carried forward once.
    pub fn new(
        resident_id: ResidentId,
        created_at: DateTime<Utc>,
        amount: Cents,
        previous_amount: Option<Cents>,
    ) -> Self {
        let balance_due = amount + previous_amount.unwrap_or(0);
        Self {
            id: Uuid::new_v4(),
            resident_id,
            month: MonthKey::of(created_at.date_naive()),
            created_at,
            amount,
            balance_due,
            private_pay_balance_due: balance_due,
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<PaymentSource>) -> Self {
        self.sources = sources;
        self
    }

    /// Apply an amount change of a ledger-scoped item. Creation is `old = 0`, removal
    /// is `new = 0`. Returns the applied delta.
    pub fn apply_item_change(&mut self, kind: LedgerItemKind, old: Cents, new: Cents) -> Cents {
        let delta = kind.balance_delta(old, new);
        self.balance_due += delta;
        delta
    }

    /// Apply an amount change of a credit or discount item covering this month.
    pub fn apply_adjustment_change(&mut self, old: Cents, new: Cents) -> Cents {
        let delta = old - new;
        self.private_pay_balance_due += delta;
        delta
    }

    /// An item's effective date must fall inside the ledger's month.
    pub fn check_effective_date(&self, date: NaiveDate) -> Result<(), EffectiveDateError> {
        if self.month.contains(date) {
            Ok(())
        } else {
            Err(EffectiveDateError {
                date,
                month: self.month,
            })
        }
    }
}

impl Validate for ResidentLedger {
    fn validate(&self) -> Result<(), ValidationError> {
        for source in &self.sources {
            require_text("sources.name", &source.name, 60)?;
            if source.amount < 0 {
                return Err(ValidationError::Field {
                    field: "sources.amount",
                    message: "must not be negative".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveDateError {
    pub date: NaiveDate,
    pub month: MonthKey,
}

/// One-off line items attached to a single ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerItemKind {
    Expense,
    CreditDiscount,
    PaymentReceived,
    NotPrivatePayPaymentReceived,
}

impl LedgerItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerItemKind::Expense => "expense",
            LedgerItemKind::CreditDiscount => "credit_discount",
            LedgerItemKind::PaymentReceived => "payment_received",
            LedgerItemKind::NotPrivatePayPaymentReceived => "not_private_pay_payment_received",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "expense" => Some(LedgerItemKind::Expense),
            "credit_discount" => Some(LedgerItemKind::CreditDiscount),
            "payment_received" => Some(LedgerItemKind::PaymentReceived),
            "not_private_pay_payment_received" => {
                Some(LedgerItemKind::NotPrivatePayPaymentReceived)
            }
            _ => None,
        }
    }

    /// Expenses and credit/discount items add to the balance due, payments subtract.
    pub fn balance_delta(&self, old: Cents, new: Cents) -> Cents {
        match self {
            LedgerItemKind::Expense | LedgerItemKind::CreditDiscount => new - old,
            LedgerItemKind::PaymentReceived | LedgerItemKind::NotPrivatePayPaymentReceived => {
                old - new
            }
        }
    }
}

impl std::fmt::Display for LedgerItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerItem {
    pub id: LedgerItemId,
    pub ledger_id: LedgerId,
    pub kind: LedgerItemKind,
    pub amount: Cents,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl LedgerItem {
    pub fn new(ledger_id: LedgerId, kind: LedgerItemKind, amount: Cents, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            ledger_id,
            kind,
            amount,
            date,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

impl Validate for LedgerItem {
    fn validate(&self) -> Result<(), ValidationError> {
        require_positive("amount", self.amount)
    }
}

/// Recurring resident-level adjustments that apply to every ledger in their range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    Credit,
    Discount,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Credit => "credit",
            AdjustmentKind::Discount => "discount",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "credit" => Some(AdjustmentKind::Credit),
            "discount" => Some(AdjustmentKind::Discount),
            _ => None,
        }
    }
}

impl std::fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A credit or discount in effect from the first day of `start`'s month through the
/// last day of `end`'s month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentItem {
    pub id: AdjustmentId,
    pub resident_id: ResidentId,
    pub kind: AdjustmentKind,
    pub amount: Cents,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub notes: Option<String>,
}

impl AdjustmentItem {
    pub fn new(
        resident_id: ResidentId,
        kind: AdjustmentKind,
        amount: Cents,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        let (start, end) = month_bounds(start, end);
        Self {
            id: Uuid::new_v4(),
            resident_id,
            kind,
            amount,
            start,
            end,
            notes: None,
        }
    }

    /// Reassign the range, snapping it to whole months.
    pub fn set_range(&mut self, start: NaiveDate, end: NaiveDate) {
        let (start, end) = month_bounds(start, end);
        self.start = start;
        self.end = end;
    }

    pub fn months(&self) -> (MonthKey, MonthKey) {
        (MonthKey::of(self.start), MonthKey::of(self.end))
    }
}

impl Validate for AdjustmentItem {
    fn validate(&self) -> Result<(), ValidationError> {
        require_positive("amount", self.amount)?;
        require_ordered(self.start, Some(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn march_ledger() -> ResidentLedger {
        let created_at = date("2024-03-05").and_hms_opt(9, 0, 0).unwrap().and_utc();
        ResidentLedger::new(Uuid::new_v4(), created_at, 100000, None)
    }

    #[test]
    fn test_new_ledger_carries_previous_amount_once() {
        let created_at = date("2024-03-05").and_hms_opt(9, 0, 0).unwrap().and_utc();
        let ledger = ResidentLedger::new(Uuid::new_v4(), created_at, 100000, Some(45000));
        assert_eq!(ledger.month, MonthKey::new(2024, 3).unwrap());
        assert_eq!(ledger.balance_due, 145000);
        assert_eq!(ledger.private_pay_balance_due, 145000);
    }

    #[test]
    fn test_item_signs() {
        let mut ledger = march_ledger();

        assert_eq!(ledger.apply_item_change(LedgerItemKind::Expense, 0, 2000), 2000);
        assert_eq!(ledger.apply_item_change(LedgerItemKind::CreditDiscount, 0, 500), 500);
        assert_eq!(ledger.apply_item_change(LedgerItemKind::PaymentReceived, 0, 30000), -30000);
        assert_eq!(ledger.balance_due, 100000 + 2000 + 500 - 30000);

        // Editing a payment from 300.00 to 250.00 raises what is owed by 50.00
        ledger.apply_item_change(LedgerItemKind::PaymentReceived, 30000, 25000);
        assert_eq!(ledger.balance_due, 100000 + 2000 + 500 - 25000);

        // Removing the expense takes it back out
        ledger.apply_item_change(LedgerItemKind::Expense, 2000, 0);
        assert_eq!(ledger.balance_due, 100000 + 500 - 25000);
    }

    #[test]
    fn test_adjustment_delta_affects_private_pay_only() {
        let mut ledger = march_ledger();
        ledger.apply_adjustment_change(0, 5000);
        assert_eq!(ledger.private_pay_balance_due, 95000);
        ledger.apply_adjustment_change(5000, 7500);
        assert_eq!(ledger.private_pay_balance_due, 92500);
        ledger.apply_adjustment_change(7500, 0);
        assert_eq!(ledger.private_pay_balance_due, 100000);
        assert_eq!(ledger.balance_due, 100000);
    }

    #[test]
    fn test_effective_date_must_be_in_ledger_month() {
        let ledger = march_ledger();
        assert!(ledger.check_effective_date(date("2024-03-31")).is_ok());
        let err = ledger.check_effective_date(date("2024-04-01")).unwrap_err();
        assert_eq!(err.month, MonthKey::new(2024, 3).unwrap());
    }

    #[test]
    fn test_adjustment_range_snaps_to_months() {
        let item = AdjustmentItem::new(
            Uuid::new_v4(),
            AdjustmentKind::Discount,
            5000,
            date("2024-03-14"),
            date("2024-04-02"),
        );
        assert_eq!(item.start, date("2024-03-01"));
        assert_eq!(item.end, date("2024-04-30"));

        let reversed = AdjustmentItem::new(
            Uuid::new_v4(),
            AdjustmentKind::Credit,
            5000,
            date("2024-05-01"),
            date("2024-04-30"),
        );
        assert_eq!(reversed.validate(), Err(ValidationError::StartGreaterEndDate));
    }
}
