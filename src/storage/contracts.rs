use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{Contract, ContractId, ContractType, ResidentId};

use super::rows::{date_col, enum_col, fmt_date, fmt_opt_date, opt_date_col, uuid_col};

pub async fn insert(conn: &mut SqliteConnection, contract: &Contract) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO contracts (id, resident_id, contract_type, start_date, end_date, options)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(contract.id.to_string())
    .bind(contract.resident_id.to_string())
    .bind(contract.contract_type.as_str())
    .bind(fmt_date(contract.start))
    .bind(fmt_opt_date(contract.end))
    .bind(serde_json::to_string(&contract.options)?)
    .execute(&mut *conn)
    .await
    .context("Failed to save contract")?;
    Ok(())
}

pub async fn update(conn: &mut SqliteConnection, contract: &Contract) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE contracts
        SET contract_type = ?, start_date = ?, end_date = ?, options = ?
        WHERE id = ?
        "#,
    )
    .bind(contract.contract_type.as_str())
    .bind(fmt_date(contract.start))
    .bind(fmt_opt_date(contract.end))
    .bind(serde_json::to_string(&contract.options)?)
    .bind(contract.id.to_string())
    .execute(&mut *conn)
    .await
    .context("Failed to update contract")?;
    Ok(())
}

pub async fn get(conn: &mut SqliteConnection, id: ContractId) -> Result<Option<Contract>> {
    let row = sqlx::query(
        "SELECT id, resident_id, contract_type, start_date, end_date, options FROM contracts \
         WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch contract")?;

    row.as_ref().map(row_to_contract).transpose()
}

pub async fn list_for_resident(
    conn: &mut SqliteConnection,
    resident_id: ResidentId,
) -> Result<Vec<Contract>> {
    let rows = sqlx::query(
        r#"
        SELECT id, resident_id, contract_type, start_date, end_date, options
        FROM contracts
        WHERE resident_id = ?
        ORDER BY start_date DESC
        "#,
    )
    .bind(resident_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list contracts")?;

    rows.iter().map(row_to_contract).collect()
}

/// The resident's contract without an end date, if any.
pub async fn get_active(
    conn: &mut SqliteConnection,
    resident_id: ResidentId,
) -> Result<Option<Contract>> {
    let row = sqlx::query(
        r#"
        SELECT id, resident_id, contract_type, start_date, end_date, options
        FROM contracts
        WHERE resident_id = ? AND end_date IS NULL
        LIMIT 1
        "#,
    )
    .bind(resident_id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch active contract")?;

    row.as_ref().map(row_to_contract).transpose()
}

pub async fn delete(conn: &mut SqliteConnection, id: ContractId) -> Result<()> {
    sqlx::query("DELETE FROM contracts WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete contract")?;
    Ok(())
}

fn row_to_contract(row: &SqliteRow) -> Result<Contract> {
    let options: String = row.get("options");
    Ok(Contract {
        id: uuid_col(row, "id")?,
        resident_id: uuid_col(row, "resident_id")?,
        contract_type: enum_col(row, "contract_type", ContractType::from_str)?,
        start: date_col(row, "start_date")?,
        end: opt_date_col(row, "end_date")?,
        options: serde_json::from_str(&options).context("Invalid contract options")?,
    })
}
