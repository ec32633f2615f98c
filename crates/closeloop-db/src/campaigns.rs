//! Campaign CRUD.

use crate::StoreError;
use closeloop_types::{Campaign, CampaignStatus, NewCampaign};
use rusqlite::{params, Connection, OptionalExtension, Row};

fn map_row_to_campaign(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    let status_str: String = row.get(5)?;
    Ok(Campaign {
        id: row.get(0)?,
        name: row.get(1)?,
        company: row.get(2)?,
        product_description: row.get(3)?,
        target_audience: row.get(4)?,
        status: status_str.parse().unwrap_or(CampaignStatus::Draft),
        created_at: row.get(6)?,
    })
}

const CAMPAIGN_COLUMNS: &str =
    "id, name, company, product_description, target_audience, status, created_at";

/// Creates a campaign in `draft` status and returns it.
pub fn create_campaign(conn: &Connection, params: &NewCampaign) -> Result<Campaign, StoreError> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO campaigns (id, name, company, product_description, target_audience, status)
         VALUES (?1, ?2, ?3, ?4, ?5, 'draft')",
        params![
            id,
            params.name,
            params.company,
            params.product_description,
            params.target_audience,
        ],
    )?;
    get_campaign(conn, &id)
}

/// Retrieves a campaign by id.
pub fn get_campaign(conn: &Connection, id: &str) -> Result<Campaign, StoreError> {
    conn.query_row(
        &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"),
        [id],
        map_row_to_campaign,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

/// Lists all campaigns, newest first.
pub fn list_campaigns(conn: &Connection) -> Result<Vec<Campaign>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map([], map_row_to_campaign)?;
    let mut campaigns = Vec::new();
    for row in rows {
        campaigns.push(row?);
    }
    Ok(campaigns)
}

/// Updates a campaign's status.
pub fn update_campaign_status(
    conn: &Connection,
    id: &str,
    status: CampaignStatus,
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE campaigns SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound(id.to_string()));
    }
    Ok(())
}
