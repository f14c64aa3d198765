use serde::{Deserialize, Serialize};

use super::{prorate, Cents, DateInterval, MonthKey};

/// Billing period a rent amount is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentPeriod {
    Monthly,
    Weekly,
    Daily,
}

impl RentPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentPeriod::Monthly => "monthly",
            RentPeriod::Weekly => "weekly",
            RentPeriod::Daily => "daily",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monthly" => Some(RentPeriod::Monthly),
            "weekly" => Some(RentPeriod::Weekly),
            "daily" => Some(RentPeriod::Daily),
            _ => None,
        }
    }
}

impl std::fmt::Display for RentPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rent attributable to one billing month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RentCharge {
    pub days: i64,
    pub amount: Cents,
}

/// Computes how much of a rent falls into a billing month.
pub trait RentProration: Send + Sync {
    /// `interval` is the occupied range (already clipped to the rent's own validity);
    /// `amount` is quoted per `period`.
    fn calculate(
        &self,
        interval: DateInterval,
        period: RentPeriod,
        amount: Cents,
        month: MonthKey,
    ) -> RentCharge;
}

/// Day-based proration: a stay covering the whole month is charged the full monthly
/// amount, a partial stay is charged per occupied day.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyProration;

impl RentProration for DailyProration {
    fn calculate(
        &self,
        interval: DateInterval,
        period: RentPeriod,
        amount: Cents,
        month: MonthKey,
    ) -> RentCharge {
        let Some(occupied) = interval.within_month(month) else {
            return RentCharge::default();
        };
        let days = occupied.days().unwrap_or(0);
        let month_days = month.days();

        let amount = match period {
            RentPeriod::Monthly if interval.covers_month(month) => amount,
            RentPeriod::Monthly => prorate(amount, days, month_days),
            RentPeriod::Weekly => prorate(amount, days, 7),
            RentPeriod::Daily => amount * days,
        };

        RentCharge { days, amount }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn march() -> MonthKey {
        MonthKey::new(2024, 3).unwrap()
    }

    #[test]
    fn test_full_month_short_circuits() {
        let stay = DateInterval::new(date("2024-01-15"), None);
        let charge = DailyProration.calculate(stay, RentPeriod::Monthly, 100000, march());
        assert_eq!(charge, RentCharge { days: 31, amount: 100000 });
    }

    #[test]
    fn test_partial_month_is_prorated_by_day() {
        let stay = DateInterval::new(date("2024-03-22"), None);
        let charge = DailyProration.calculate(stay, RentPeriod::Monthly, 310000, march());
        assert_eq!(charge.days, 10);
        assert_eq!(charge.amount, 100000);
    }

    #[test]
    fn test_discharge_mid_month() {
        let stay = DateInterval::new(date("2024-01-01"), Some(date("2024-03-10")));
        let charge = DailyProration.calculate(stay, RentPeriod::Monthly, 100000, march());
        assert_eq!(charge.days, 10);
        assert_eq!(charge.amount, 32258);
    }

    #[test]
    fn test_weekly_and_daily_periods() {
        let stay = DateInterval::new(date("2024-03-01"), Some(date("2024-03-14")));
        let weekly = DailyProration.calculate(stay, RentPeriod::Weekly, 70000, march());
        assert_eq!(weekly.amount, 140000);

        let daily = DailyProration.calculate(stay, RentPeriod::Daily, 5000, march());
        assert_eq!(daily, RentCharge { days: 14, amount: 70000 });
    }

    #[test]
    fn test_stay_outside_month_is_free() {
        let stay = DateInterval::new(date("2024-04-01"), None);
        let charge = DailyProration.calculate(stay, RentPeriod::Monthly, 100000, march());
        assert_eq!(charge, RentCharge::default());
    }
}
