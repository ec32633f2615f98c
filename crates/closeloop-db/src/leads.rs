//! Lead CRUD.

use crate::StoreError;
use closeloop_types::{Lead, LeadStatus, NewLead};
use rusqlite::{params, Connection, OptionalExtension, Row};

fn map_row_to_lead(row: &Row<'_>) -> rusqlite::Result<Lead> {
    let status_str: String = row.get(8)?;
    let score: i64 = row.get(7)?;
    Ok(Lead {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        company: row.get(5)?,
        title: row.get(6)?,
        score: score.clamp(0, 100) as u8,
        score_reason: row.get(10)?,
        status: status_str.parse().unwrap_or(LeadStatus::New),
        created_at: row.get(9)?,
    })
}

const LEAD_COLUMNS: &str =
    "id, campaign_id, name, email, phone, company, title, score, status, created_at, score_reason";

/// Creates a lead in `new` status and returns it.
pub fn create_lead(conn: &Connection, params: &NewLead) -> Result<Lead, StoreError> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO leads (id, campaign_id, name, email, phone, company, title, score, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'new')",
        params![
            id,
            params.campaign_id,
            params.name,
            params.email,
            params.phone,
            params.company,
            params.title,
            params.score.min(100),
        ],
    )?;
    get_lead(conn, &id)
}

/// Retrieves a lead by id.
pub fn get_lead(conn: &Connection, id: &str) -> Result<Lead, StoreError> {
    conn.query_row(
        &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
        [id],
        map_row_to_lead,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

/// Lists leads, optionally filtered to one campaign, highest score first.
pub fn list_leads(conn: &Connection, campaign_id: Option<&str>) -> Result<Vec<Lead>, StoreError> {
    let mut leads = Vec::new();
    match campaign_id {
        Some(campaign) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads WHERE campaign_id = ?1 ORDER BY score DESC"
            ))?;
            let rows = stmt.query_map([campaign], map_row_to_lead)?;
            for row in rows {
                leads.push(row?);
            }
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads ORDER BY score DESC"
            ))?;
            let rows = stmt.query_map([], map_row_to_lead)?;
            for row in rows {
                leads.push(row?);
            }
        }
    }
    Ok(leads)
}

/// Stores the fit score and its justification on a lead.
pub fn update_lead_score(
    conn: &Connection,
    id: &str,
    score: u8,
    reason: &str,
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE leads SET score = ?1, score_reason = ?2 WHERE id = ?3",
        params![score.min(100), reason, id],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound(id.to_string()));
    }
    Ok(())
}

/// Updates a lead's outreach status.
pub fn update_lead_status(
    conn: &Connection,
    id: &str,
    status: LeadStatus,
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE leads SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound(id.to_string()));
    }
    Ok(())
}
